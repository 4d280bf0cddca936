pub mod memory;
pub mod multi_stage;
pub mod read;
pub mod write;

mod args;

pub use args::*;

use crate::components::{
    FormattedConfigError, GemmSpecialization, InvalidConfigError, MatmulLineSizes,
    stage::StageConfig,
};
use read::CyclicLoading;
use write::{WritePath, WriteStrategy};

/// Configuration of one group's full global-level matmul: staging geometry,
/// padding specialization, vector widths and the write-back behavior.
#[derive(Copy, Clone, Debug)]
pub struct GlobalConfig {
    pub stage: StageConfig,
    pub specialization: GemmSpecialization,
    pub line_sizes: MatmulLineSizes,
    pub write_path: WritePath,
    pub write_strategy: WriteStrategy,
}

impl GlobalConfig {
    pub fn stage_config(&self) -> StageConfig {
        self.stage
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        self.stage.validate()?;
        CyclicLoading::check(self.stage.lhs_stage_memory(), self.line_sizes.lhs)?;
        CyclicLoading::check(self.stage.rhs_stage_memory(), self.line_sizes.rhs)?;

        let out_line = self.line_sizes.out as u32;
        let stage_n = self.stage.tiling.elements_in_stage_n();
        if stage_n % out_line != 0 {
            return Err(FormattedConfigError::new(move || {
                format!("Output line size {out_line} must divide the group tile width {stage_n}")
            }));
        }
        Ok(())
    }
}
