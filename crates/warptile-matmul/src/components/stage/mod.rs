mod matmul;
mod stage_memory;

pub use matmul::*;
pub use stage_memory::*;

/// Which of the two fast-memory stages a pipeline step targets.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum StageBuffer {
    A,
    B,
}

impl StageBuffer {
    pub fn index(&self) -> usize {
        match self {
            StageBuffer::A => 0,
            StageBuffer::B => 1,
        }
    }

    pub fn other(&self) -> StageBuffer {
        match self {
            StageBuffer::A => StageBuffer::B,
            StageBuffer::B => StageBuffer::A,
        }
    }
}
