use num_traits::Zero;
use warptile_core::Numeric;

use crate::components::descriptor::TensorDescriptor;
use crate::components::global::ElementwiseOp;
use crate::components::global::memory::TensorWindow;
use crate::components::stage::{StageBuffer, StageMemory, StageMemoryConfig};
use crate::components::{FormattedConfigError, InvalidConfigError, spec::cast};

/// Validation for the cyclic loading distribution, run once at setup.
///
/// Inside the launch the loader assumes a valid configuration and performs no
/// defensive checks.
pub struct CyclicLoading;

impl CyclicLoading {
    pub fn check(stage: StageMemoryConfig, line_size: u8) -> Result<(), InvalidConfigError> {
        let line = line_size as u32;
        if stage.cols % line != 0 {
            return Err(FormattedConfigError::new(move || {
                format!(
                    "Line size {line} must divide the stage row length {}",
                    stage.cols
                )
            }));
        }
        Ok(())
    }
}

/// Moves one operand's stage slice from global memory into fast memory.
///
/// `read` pulls the window contents into a register staging buffer, applying
/// the source-side elementwise transform in flight; `commit` publishes the
/// staging buffer into one of the two fast-memory stages. Work is split
/// line-wise across units in a cyclic pattern.
///
/// The operand descriptor is in canonical `(k0, row, k1)` form, `row` being m
/// for lhs and n for rhs; the staged tile is row-major `row × k`.
pub struct StageLoader<'a, EG: Numeric, ES: Numeric, Op: ElementwiseOp<EG>> {
    window: TensorWindow<'a, EG>,
    staging: Vec<ES>,
    op: &'a Op,
    stage_memory: StageMemoryConfig,
    line_size: u8,
    num_units: u32,
    k1: u32,
    k0_per_stage: u32,
}

impl<'a, EG: Numeric, ES: Numeric, Op: ElementwiseOp<EG>> StageLoader<'a, EG, ES, Op> {
    pub fn new(
        data: &'a [EG],
        descriptor: &'a TensorDescriptor,
        row_origin: u32,
        k_start: u32,
        op: &'a Op,
        stage_memory: StageMemoryConfig,
        line_size: u8,
        num_units: u32,
    ) -> Self {
        let k1 = descriptor.length(2);
        debug_assert_eq!(k_start % k1, 0);
        debug_assert_eq!(stage_memory.cols % k1, 0);

        let window = TensorWindow::new(data, descriptor, vec![k_start / k1, row_origin, 0]);
        Self {
            window,
            staging: vec![ES::zero(); stage_memory.elements_per_stage() as usize],
            op,
            stage_memory,
            line_size,
            num_units,
            k1,
            k0_per_stage: stage_memory.cols / k1,
        }
    }

    /// Stages the current window contents into registers.
    pub fn read(&mut self) {
        let cols = self.stage_memory.cols;
        let total = self.stage_memory.elements_per_stage();
        let line = self.line_size as u32;
        let total_lines = total / line;
        let tasks_per_unit = total_lines.div_ceil(self.num_units);
        let jump = self.num_units * line;

        for unit in 0..self.num_units {
            for task in 0..tasks_per_unit {
                let position = unit * line + task * jump;
                if position >= total {
                    break;
                }
                for i in 0..line {
                    let index = position + i;
                    let row = index / cols;
                    let col = index % cols;
                    let value = self
                        .window
                        .read(&[col / self.k1, row, col % self.k1]);
                    self.staging[index as usize] = cast(self.op.apply(value));
                }
            }
        }
    }

    /// Publishes the staged slice into the given fast-memory stage.
    pub fn commit(&self, stage: &mut StageMemory<ES>, buffer: StageBuffer) {
        stage.stage_mut(buffer).copy_from_slice(&self.staging);
    }

    /// Advances the source window one stage along the reduction dimension.
    pub fn move_window(&mut self) {
        self.window.move_window(&[self.k0_per_stage, 0, 0]);
    }
}
