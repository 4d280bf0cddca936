//! Execution model and numeric primitives shared by the warptile kernel crates.
//!
//! The engine is written against an accelerator-style hierarchy: a launch
//! covers a *grid* of execution-unit *groups*, each group owning a fast
//! scratch memory and a fixed number of lock-step *units*. On the host this
//! model is walked with a rayon task per group; units are iterated in program
//! order and barriers become logical phase boundaries on the group context.

pub mod grid;
pub mod memory;
pub mod precision;

pub use grid::{GroupContext, GroupCount, GroupDim, launch_groups, max_group_count};
pub use memory::GlobalMut;
pub use precision::Numeric;
