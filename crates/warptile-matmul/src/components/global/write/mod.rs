use std::marker::PhantomData;

use num_traits::Zero;
use warptile_core::{GlobalMut, GroupContext, Numeric};

use crate::components::descriptor::{TensorDescriptor, TensorElement};
use crate::components::global::ElementwiseOp;
use crate::components::stage::{Accumulators, StageConfig};
use crate::components::spec::cast;

/// How the accumulator reaches the output tensor.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum WritePath {
    /// Each unit stores its register tiles straight to global memory.
    Direct,
    /// Accumulators are first shuffled through a fast-memory staging tile to
    /// turn the thread-scattered layout into contiguous line writes.
    ShuffleStage,
}

/// How an element lands in the output tensor.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Plain store; the group owns its output tile exclusively.
    Overwrite,
    /// Atomic accumulate; several groups fold partial sums into the same
    /// tile (split-K).
    AtomicAccumulate,
}

/// Flushes a group's accumulators to the output tensor, exactly once per
/// reduction loop. Positions resolving to descriptor padding are skipped.
pub struct GlobalWriter<'a, EA: Numeric, EO: Numeric, Op: ElementwiseOp<EO>> {
    out: &'a GlobalMut<'a, EO>,
    descriptor: &'a TensorDescriptor,
    tile_origin: (u32, u32),
    op: &'a Op,
    path: WritePath,
    strategy: WriteStrategy,
    line_size: u8,
    _acc: PhantomData<EA>,
}

impl<'a, EA: Numeric, EO: Numeric, Op: ElementwiseOp<EO>> GlobalWriter<'a, EA, EO, Op> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        out: &'a GlobalMut<'a, EO>,
        descriptor: &'a TensorDescriptor,
        tile_origin: (u32, u32),
        op: &'a Op,
        path: WritePath,
        strategy: WriteStrategy,
        line_size: u8,
    ) -> Self {
        Self {
            out,
            descriptor,
            tile_origin,
            op,
            path,
            strategy,
            line_size,
            _acc: PhantomData,
        }
    }

    pub fn flush(&self, ctx: &GroupContext, acc: &Accumulators<EA>, config: StageConfig) {
        match self.path {
            WritePath::Direct => self.flush_direct(acc, config),
            WritePath::ShuffleStage => self.flush_shuffled(ctx, acc, config),
        }
    }

    fn store(&self, row: u32, col: u32, value: EA) {
        match self.descriptor.element(&[row, col]) {
            Ok(TensorElement::Linear(offset)) => {
                let value = self.op.apply(cast(value));
                match self.strategy {
                    WriteStrategy::Overwrite => self.out.store(offset, value),
                    WriteStrategy::AtomicAccumulate => self.out.accumulate(offset, value),
                }
            }
            // Padded rows/columns are never written back.
            Ok(TensorElement::Pad) => {}
            Err(err) => panic!("write escaped validated bounds: {err}"),
        }
    }

    fn flush_direct(&self, acc: &Accumulators<EA>, config: StageConfig) {
        let tile = config.register.tile_size();
        let partition = config.tiling.partition_size;
        let (origin_m, origin_n) = self.tile_origin;

        for unit in 0..config.num_units() {
            let (part_m, part_n) = config.partition_coords(unit);
            for pm in 0..partition.m {
                for pn in 0..partition.n {
                    let acc_tile = acc.tile(unit, pm, pn);
                    for tm in 0..tile.m {
                        for tn in 0..tile.n {
                            let row = origin_m + (part_m * partition.m + pm) * tile.m + tm;
                            let col = origin_n + (part_n * partition.n + pn) * tile.n + tn;
                            self.store(row, col, acc_tile[(tm * tile.n + tn) as usize]);
                        }
                    }
                }
            }
        }
    }

    /// Stages the scattered accumulator tiles into one contiguous group tile,
    /// then writes it out line by line, lines distributed cyclically across
    /// units. The staging region reuses fast memory already freed from
    /// operand staging.
    fn flush_shuffled(&self, ctx: &GroupContext, acc: &Accumulators<EA>, config: StageConfig) {
        let tile = config.register.tile_size();
        let partition = config.tiling.partition_size;
        let stage_n = config.tiling.elements_in_stage_n();
        let stage_m = config.tiling.elements_in_stage_m();

        let mut staged = vec![EA::zero(); (stage_m * stage_n) as usize];
        for unit in 0..config.num_units() {
            let (part_m, part_n) = config.partition_coords(unit);
            for pm in 0..partition.m {
                for pn in 0..partition.n {
                    let acc_tile = acc.tile(unit, pm, pn);
                    for tm in 0..tile.m {
                        for tn in 0..tile.n {
                            let row = (part_m * partition.m + pm) * tile.m + tm;
                            let col = (part_n * partition.n + pn) * tile.n + tn;
                            staged[(row * stage_n + col) as usize] =
                                acc_tile[(tm * tile.n + tn) as usize];
                        }
                    }
                }
            }
        }

        // The staged tile must be complete before any unit streams it out.
        ctx.sync_group();

        let (origin_m, origin_n) = self.tile_origin;
        let line = self.line_size as u32;
        let total = stage_m * stage_n;
        let total_lines = total / line;
        let num_units = config.num_units();
        let tasks_per_unit = total_lines.div_ceil(num_units);
        let jump = num_units * line;

        for unit in 0..num_units {
            for task in 0..tasks_per_unit {
                let position = unit * line + task * jump;
                if position >= total {
                    break;
                }
                for i in 0..line {
                    let index = position + i;
                    let row = index / stage_n;
                    let col = index % stage_n;
                    self.store(origin_m + row, origin_n + col, staged[index as usize]);
                }
            }
        }
    }
}
