use warptile_core::{GlobalMut, GroupDim, launch_groups};

use super::{BatchConfig, TileGridMapper};
use crate::components::descriptor::TensorDescriptor;
use crate::components::global::ElementwiseOp;
use crate::components::global::multi_stage::{DoubleBufferingMatmul, PipelineSchedule};
use crate::components::global::read::StageLoader;
use crate::components::global::write::GlobalWriter;
use crate::components::{AccG, AccR, LhsG, MatmulPrecision, RhsG};

/// How the reduction dimension is cut into independent slices.
///
/// All slices share the same descriptors; a slice only selects its window
/// start and its schedule. When the reduction does not split evenly, the last
/// slice runs the distinct tail schedule, selected here at dispatch and never
/// recomputed per unit.
#[derive(Copy, Clone, Debug)]
pub struct SplitKPlan {
    pub k_per_slice: u32,
    pub num_slices: u32,
    pub main: PipelineSchedule,
    pub tail: Option<PipelineSchedule>,
}

impl SplitKPlan {
    pub fn has_tail(&self) -> bool {
        self.tail.is_some()
    }

    pub fn schedule_for(&self, k_slice: u32) -> PipelineSchedule {
        if k_slice + 1 == self.num_slices {
            self.tail.unwrap_or(self.main)
        } else {
            self.main
        }
    }

    pub fn k_start(&self, k_slice: u32) -> u32 {
        k_slice * self.k_per_slice
    }
}

/// Walks the grid: every group runs the double-buffered global matmul on its
/// own output tile and reduction slice.
pub struct PartitionedBatchMatmul;

impl PartitionedBatchMatmul {
    #[allow(clippy::too_many_arguments)]
    pub fn execute<MP, LOp, ROp, COp>(
        lhs: &[LhsG<MP>],
        rhs: &[RhsG<MP>],
        out: &GlobalMut<'_, AccG<MP>>,
        lhs_descriptor: &TensorDescriptor,
        rhs_descriptor: &TensorDescriptor,
        out_descriptor: &TensorDescriptor,
        mapper: &TileGridMapper,
        split_k: &SplitKPlan,
        lhs_op: &LOp,
        rhs_op: &ROp,
        out_op: &COp,
        config: BatchConfig,
    ) where
        MP: MatmulPrecision,
        LOp: ElementwiseOp<LhsG<MP>>,
        ROp: ElementwiseOp<RhsG<MP>>,
        COp: ElementwiseOp<AccG<MP>>,
    {
        let global = config.global_config();
        let stage = global.stage_config();
        let stage_m = stage.tiling.elements_in_stage_m();
        let stage_n = stage.tiling.elements_in_stage_n();
        let dim = GroupDim::new(stage.num_units());

        launch_groups(mapper.group_count(), dim, |ctx| {
            let tile = mapper.tile_of(ctx.linear_id());
            let schedule = split_k.schedule_for(tile.k_slice);
            let k_start = split_k.k_start(tile.k_slice);

            let lhs_loader = StageLoader::<LhsG<MP>, _, _>::new(
                lhs,
                lhs_descriptor,
                tile.row * stage_m,
                k_start,
                lhs_op,
                stage.lhs_stage_memory(),
                global.line_sizes.lhs,
                stage.num_units(),
            );
            let rhs_loader = StageLoader::<RhsG<MP>, _, _>::new(
                rhs,
                rhs_descriptor,
                tile.col * stage_n,
                k_start,
                rhs_op,
                stage.rhs_stage_memory(),
                global.line_sizes.rhs,
                stage.num_units(),
            );
            let writer = GlobalWriter::<AccR<MP>, AccG<MP>, COp>::new(
                out,
                out_descriptor,
                (tile.row * stage_m, tile.col * stage_n),
                out_op,
                global.write_path,
                global.write_strategy,
                global.line_sizes.out,
            );

            DoubleBufferingMatmul::execute::<MP, LOp, ROp, COp>(
                &ctx, lhs_loader, rhs_loader, writer, schedule, global,
            );
        });
    }
}
