use warptile_core::GroupContext;

use super::PipelineSchedule;
use crate::components::global::read::StageLoader;
use crate::components::global::write::GlobalWriter;
use crate::components::global::{ElementwiseOp, GlobalConfig};
use crate::components::stage::{
    PartitionedStageMatmul, StageBuffer, StageMemory,
};
use crate::components::{AccG, AccR, LhsG, LhsS, MatmulPrecision, RhsG, RhsS};

/// Global-level matmul with a two-deep software pipeline: while the stage
/// matmul consumes the stable buffer, the loaders already hold the next
/// stage in registers and fetch the one after.
///
/// The state sequence is prime, steady (repeated), drain, flush. Every
/// compute pass is bracketed by two barriers: the first publishes the stage
/// commit it consumes, the second keeps the buffer alive until every unit is
/// done with it. That bracket is the data-race-avoidance invariant of the
/// whole pipeline.
pub struct DoubleBufferingMatmul;

impl DoubleBufferingMatmul {
    pub fn execute<MP, LOp, ROp, COp>(
        ctx: &GroupContext,
        mut lhs_loader: StageLoader<'_, LhsG<MP>, LhsS<MP>, LOp>,
        mut rhs_loader: StageLoader<'_, RhsG<MP>, RhsS<MP>, ROp>,
        writer: GlobalWriter<'_, AccR<MP>, AccG<MP>, COp>,
        schedule: PipelineSchedule,
        config: GlobalConfig,
    ) where
        MP: MatmulPrecision,
        LOp: ElementwiseOp<LhsG<MP>>,
        ROp: ElementwiseOp<RhsG<MP>>,
        COp: ElementwiseOp<AccG<MP>>,
    {
        let stage_config = config.stage_config();
        let mut lhs_stage = StageMemory::<LhsS<MP>>::new(stage_config.lhs_stage_memory());
        let mut rhs_stage = StageMemory::<RhsS<MP>>::new(stage_config.rhs_stage_memory());

        let mut fragments = PartitionedStageMatmul::init_tile_fragments::<MP>(stage_config);
        let mut acc = PartitionedStageMatmul::init_accumulators::<MP>(stage_config);

        // Prime: fetch stage 0, publish it, and already fetch stage 1.
        lhs_loader.read();
        rhs_loader.read();
        lhs_loader.move_window();
        rhs_loader.move_window();
        lhs_loader.commit(&mut lhs_stage, StageBuffer::A);
        rhs_loader.commit(&mut rhs_stage, StageBuffer::A);
        lhs_loader.read();
        rhs_loader.read();

        let mut current = StageBuffer::A;

        // Steady state: compute stage i while fetching stage i + 2.
        for _ in 0..schedule.num_steady() {
            ctx.sync_group();
            PartitionedStageMatmul::execute::<MP>(
                &lhs_stage,
                &rhs_stage,
                current,
                &mut fragments,
                &mut acc,
                stage_config,
            );
            ctx.sync_group();

            lhs_loader.move_window();
            rhs_loader.move_window();
            lhs_loader.commit(&mut lhs_stage, current.other());
            rhs_loader.commit(&mut rhs_stage, current.other());
            lhs_loader.read();
            rhs_loader.read();

            current = current.other();
        }

        // Drain: two final compute passes on the prefetched stages, no
        // further reads.
        ctx.sync_group();
        PartitionedStageMatmul::execute::<MP>(
            &lhs_stage,
            &rhs_stage,
            current,
            &mut fragments,
            &mut acc,
            stage_config,
        );
        ctx.sync_group();

        lhs_loader.commit(&mut lhs_stage, current.other());
        rhs_loader.commit(&mut rhs_stage, current.other());
        ctx.sync_group();

        PartitionedStageMatmul::execute::<MP>(
            &lhs_stage,
            &rhs_stage,
            current.other(),
            &mut fragments,
            &mut acc,
            stage_config,
        );

        // Done: the accumulator leaves the registers exactly once.
        writer.flush(ctx, &acc, stage_config);
    }
}
