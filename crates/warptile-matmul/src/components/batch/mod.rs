mod hypercube;
mod matmul;

pub use hypercube::*;
pub use matmul::*;

use crate::components::{InvalidConfigError, global::GlobalConfig};

/// Configuration of the whole grid: the per-group global matmul plus the
/// group-to-tile mapping.
#[derive(Copy, Clone, Debug)]
pub struct BatchConfig {
    pub global: GlobalConfig,
    pub hypercube: HypercubeConfig,
}

impl BatchConfig {
    pub fn global_config(&self) -> GlobalConfig {
        self.global
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        self.global.validate()
    }
}
