mod matmul;
mod schedule;

pub use matmul::*;
pub use schedule::*;
