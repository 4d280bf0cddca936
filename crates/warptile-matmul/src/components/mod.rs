pub mod batch;
pub mod descriptor;
pub mod global;
pub mod stage;
pub mod tile;

mod error;
mod ident;
mod line_size;
mod problem;
mod selection;
mod spec;
mod tiling_scheme;

pub use error::*;
pub use ident::*;
pub use line_size::*;
pub use problem::*;
pub use selection::*;
pub use spec::*;
pub use tiling_scheme::*;

use serde::{Deserialize, Serialize};

/// Memory ordering of a matrix operand.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixLayout {
    RowMajor,
    ColMajor,
}
