use std::marker::PhantomData;
use std::time::{Duration, Instant};

use num_traits::Zero;
use warptile_core::GlobalMut;

use super::{Algorithm, DoubleBufferingAlgorithm};
use crate::components::batch::{BatchConfig, PartitionedBatchMatmul, SplitKPlan, TileGridMapper};
use crate::components::descriptor::{AxisTransform, TensorDescriptor, TransformStage};
use crate::components::global::multi_stage::PipelineSchedule;
use crate::components::global::write::WriteStrategy;
use crate::components::global::ElementwiseOp;
use crate::components::{
    AccG, AvailableLineSizes, FormattedConfigError, LhsG, MatmulLineSizes, MatmulPrecision,
    MatmulProblem, MatmulSelection, MatmulSetupError, MatrixLayout, RhsG, padded_length,
};

/// Device operation façade for one kernel variant.
///
/// The uniform contract consumed by selection/profiling harnesses:
/// `is_supported` pre-flights a problem without side effects, `make_argument`
/// binds data and builds descriptors, and the invoker runs the launch and
/// reports its wall time.
pub struct DeviceGemm<MP: MatmulPrecision> {
    selection: MatmulSelection,
    _precision: PhantomData<MP>,
}

/// Everything derived from (problem, split_k) before data is bound.
struct ArgumentPlan {
    config: BatchConfig,
    line_sizes: MatmulLineSizes,
    m_padded: u32,
    n_padded: u32,
    k_padded: u32,
    m_tiles: u32,
    n_tiles: u32,
    split_k: SplitKPlan,
}

impl<MP: MatmulPrecision> DeviceGemm<MP> {
    pub fn new(selection: MatmulSelection) -> Self {
        Self {
            selection,
            _precision: PhantomData,
        }
    }

    /// Pre-flight check: whether this variant can service the problem. No
    /// side effects; a rejected candidate leaves everything untouched.
    pub fn is_supported(&self, problem: &MatmulProblem, split_k: u32) -> bool {
        self.plan(problem, split_k).is_ok()
    }

    pub fn make_invoker(&self) -> GemmInvoker {
        GemmInvoker
    }

    fn plan(&self, problem: &MatmulProblem, split_k: u32) -> Result<ArgumentPlan, MatmulSetupError> {
        let line_sizes = AvailableLineSizes::from_supported()
            .filter_lhs_with_shape(problem.m, problem.k, problem.lhs_layout)
            .filter_rhs_with_shape(problem.k, problem.n, problem.rhs_layout)
            .filter_out_with_shape(problem.n)
            .pick_max()?;

        let config = DoubleBufferingAlgorithm::setup(&self.selection, &line_sizes)?;
        let scheme = config.global.stage.tiling;
        let specialization = config.global.specialization;

        let m = problem.m as u32;
        let n = problem.n as u32;
        let k = problem.k as u32;

        let stage_m = scheme.elements_in_stage_m();
        let stage_n = scheme.elements_in_stage_n();
        let stage_k = scheme.elements_in_stage_k();

        let m_padded = Self::pad_axis(m, stage_m, specialization.pads_m(), "m")?;
        let n_padded = Self::pad_axis(n, stage_n, specialization.pads_n(), "n")?;
        let k_padded = Self::pad_axis(k, stage_k, specialization.pads_k(), "k")?;

        let split_k = Self::plan_split_k(k_padded / stage_k, stage_k, split_k)?;

        Ok(ArgumentPlan {
            config,
            line_sizes,
            m_padded,
            n_padded,
            k_padded,
            m_tiles: m_padded / stage_m,
            n_tiles: n_padded / stage_n,
            split_k,
        })
    }

    fn pad_axis(
        len: u32,
        stage: u32,
        may_pad: bool,
        axis: &'static str,
    ) -> Result<u32, MatmulSetupError> {
        if len % stage == 0 {
            Ok(len)
        } else if may_pad {
            Ok(padded_length(len, stage))
        } else {
            Err(MatmulSetupError::InvalidConfig(FormattedConfigError::new(
                move || {
                    format!(
                        "Axis {axis} of length {len} is not divisible by the {stage}-wide group tile and its padding specialization is off"
                    )
                },
            )))
        }
    }

    /// Cuts `total_tiles` reduction stages into slices of at least two stages
    /// each. A short remainder is folded into the last slice, which then runs
    /// the distinct tail schedule.
    fn plan_split_k(
        total_tiles: u32,
        stage_k: u32,
        split_k: u32,
    ) -> Result<SplitKPlan, MatmulSetupError> {
        if total_tiles < 2 {
            return Err(MatmulSetupError::InvalidConfig(FormattedConfigError::new(
                move || {
                    format!(
                        "Reduction holds {total_tiles} stage(s); the pipeline needs at least two"
                    )
                },
            )));
        }

        let split_k = split_k.max(1);
        let tiles_per_slice = total_tiles.div_ceil(split_k).max(2);

        let mut num_slices = total_tiles.div_ceil(tiles_per_slice);
        let mut tail_tiles = total_tiles - tiles_per_slice * (num_slices - 1);
        if tail_tiles < 2 && num_slices > 1 {
            num_slices -= 1;
            tail_tiles += tiles_per_slice;
        }

        if num_slices == 1 {
            return Ok(SplitKPlan {
                k_per_slice: total_tiles * stage_k,
                num_slices: 1,
                main: PipelineSchedule::new(total_tiles * stage_k, stage_k)?,
                tail: None,
            });
        }

        let main = PipelineSchedule::new(tiles_per_slice * stage_k, stage_k)?;
        let tail = if tail_tiles == tiles_per_slice {
            None
        } else {
            Some(PipelineSchedule::new(tail_tiles * stage_k, stage_k)?)
        };

        Ok(SplitKPlan {
            k_per_slice: tiles_per_slice * stage_k,
            num_slices,
            main,
            tail,
        })
    }

    /// Binds data to a validated plan. Fails exactly where [`Self::is_supported`]
    /// would, plus on undersized buffers and on output transforms that cannot
    /// be folded atomically under split-K.
    #[allow(clippy::too_many_arguments)]
    pub fn make_argument<'a, LOp, ROp, COp>(
        &self,
        lhs: &'a [LhsG<MP>],
        rhs: &'a [RhsG<MP>],
        out: &'a mut [AccG<MP>],
        problem: &MatmulProblem,
        split_k: u32,
        lhs_op: LOp,
        rhs_op: ROp,
        out_op: COp,
    ) -> Result<GemmArgument<'a, MP, LOp, ROp, COp>, MatmulSetupError>
    where
        LOp: ElementwiseOp<LhsG<MP>>,
        ROp: ElementwiseOp<RhsG<MP>>,
        COp: ElementwiseOp<AccG<MP>>,
    {
        let mut plan = self.plan(problem, split_k)?;

        Self::check_len("lhs", lhs.len(), problem.m * problem.k)?;
        Self::check_len("rhs", rhs.len(), problem.k * problem.n)?;
        Self::check_len("out", out.len(), problem.m * problem.n)?;

        if plan.split_k.num_slices > 1 {
            if !COp::IS_IDENTITY {
                return Err(MatmulSetupError::InvalidConfig(FormattedConfigError::new(
                    || {
                        "Split-K folds partial sums atomically; the output transform must be the identity"
                            .to_string()
                    },
                )));
            }
            plan.config.global.write_strategy = WriteStrategy::AtomicAccumulate;
        }

        let m = problem.m as u32;
        let n = problem.n as u32;
        let k = problem.k as u32;
        let k1 = plan.config.global.stage.tiling.tile_size.k;

        let (lhs_row_stride, lhs_k_stride) = match problem.lhs_layout {
            MatrixLayout::RowMajor => (k, 1),
            MatrixLayout::ColMajor => (1, m),
        };
        let (rhs_row_stride, rhs_k_stride) = match problem.rhs_layout {
            MatrixLayout::RowMajor => (1, n),
            MatrixLayout::ColMajor => (k, 1),
        };

        let lhs_descriptor = Self::make_operand_descriptor(
            m,
            k,
            (lhs_row_stride, lhs_k_stride),
            plan.m_padded,
            plan.k_padded,
            k1,
        )?;
        let rhs_descriptor = Self::make_operand_descriptor(
            n,
            k,
            (rhs_row_stride, rhs_k_stride),
            plan.n_padded,
            plan.k_padded,
            k1,
        )?;
        let out_descriptor = Self::make_output_descriptor(m, n, plan.m_padded, plan.n_padded)?;

        let mapper = TileGridMapper::new(
            plan.config.hypercube,
            plan.m_tiles,
            plan.n_tiles,
            plan.split_k.num_slices,
        )?;

        log::debug!(
            "gemm argument: {}x{}x{} -> {} tiles ({} slices), line sizes {:?}",
            problem.m,
            problem.n,
            problem.k,
            mapper.tile_count(),
            plan.split_k.num_slices,
            plan.line_sizes,
        );

        Ok(GemmArgument {
            lhs,
            rhs,
            out,
            lhs_descriptor,
            rhs_descriptor,
            out_descriptor,
            mapper,
            split_k: plan.split_k,
            config: plan.config,
            lhs_op,
            rhs_op,
            out_op,
        })
    }

    fn check_len(name: &'static str, got: usize, need: usize) -> Result<(), MatmulSetupError> {
        if got < need {
            return Err(MatmulSetupError::InvalidConfig(FormattedConfigError::new(
                move || format!("{name} buffer holds {got} elements, problem needs {need}"),
            )));
        }
        Ok(())
    }

    /// Canonical `(k0, row, k1)` operand descriptor: pad first, then split
    /// the reduction axis so the innermost run is the packing unit.
    fn make_operand_descriptor(
        rows: u32,
        k: u32,
        (row_stride, k_stride): (u32, u32),
        rows_padded: u32,
        k_padded: u32,
        k1: u32,
    ) -> Result<TensorDescriptor, MatmulSetupError> {
        let mut descriptor = TensorDescriptor::new(vec![rows, k], vec![row_stride, k_stride])?;

        if rows_padded != rows || k_padded != k {
            let pad_rows = if rows_padded != rows {
                AxisTransform::RightPad {
                    axis: 0,
                    padded: rows_padded,
                }
            } else {
                AxisTransform::PassThrough { axis: 0 }
            };
            let pad_k = if k_padded != k {
                AxisTransform::RightPad {
                    axis: 1,
                    padded: k_padded,
                }
            } else {
                AxisTransform::PassThrough { axis: 1 }
            };
            descriptor = descriptor.transform(TransformStage::new(vec![pad_rows, pad_k]))?;
        }

        Ok(descriptor.transform(
            TransformStage::new(vec![
                AxisTransform::Unmerge {
                    axis: 1,
                    lengths: vec![k_padded / k1, k1],
                },
                AxisTransform::PassThrough { axis: 0 },
            ])
            .with_order(vec![0, 2, 1]),
        )?)
    }

    fn make_output_descriptor(
        m: u32,
        n: u32,
        m_padded: u32,
        n_padded: u32,
    ) -> Result<TensorDescriptor, MatmulSetupError> {
        let mut descriptor = TensorDescriptor::new(vec![m, n], vec![n, 1])?;

        if m_padded != m || n_padded != n {
            let pad_m = if m_padded != m {
                AxisTransform::RightPad {
                    axis: 0,
                    padded: m_padded,
                }
            } else {
                AxisTransform::PassThrough { axis: 0 }
            };
            let pad_n = if n_padded != n {
                AxisTransform::RightPad {
                    axis: 1,
                    padded: n_padded,
                }
            } else {
                AxisTransform::PassThrough { axis: 1 }
            };
            descriptor = descriptor.transform(TransformStage::new(vec![pad_m, pad_n]))?;
        }

        Ok(descriptor)
    }
}

/// Per-invocation bundle: borrowed data, derived descriptors, the split-K
/// plan and the tile mapper, valid for the lifetime of the launch.
pub struct GemmArgument<'a, MP, LOp, ROp, COp>
where
    MP: MatmulPrecision,
    LOp: ElementwiseOp<LhsG<MP>>,
    ROp: ElementwiseOp<RhsG<MP>>,
    COp: ElementwiseOp<AccG<MP>>,
{
    lhs: &'a [LhsG<MP>],
    rhs: &'a [RhsG<MP>],
    out: &'a mut [AccG<MP>],
    lhs_descriptor: TensorDescriptor,
    rhs_descriptor: TensorDescriptor,
    out_descriptor: TensorDescriptor,
    mapper: TileGridMapper,
    split_k: SplitKPlan,
    config: BatchConfig,
    lhs_op: LOp,
    rhs_op: ROp,
    out_op: COp,
}

impl<'a, MP, LOp, ROp, COp> GemmArgument<'a, MP, LOp, ROp, COp>
where
    MP: MatmulPrecision,
    LOp: ElementwiseOp<LhsG<MP>>,
    ROp: ElementwiseOp<RhsG<MP>>,
    COp: ElementwiseOp<AccG<MP>>,
{
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn mapper(&self) -> &TileGridMapper {
        &self.mapper
    }

    pub fn split_k_plan(&self) -> &SplitKPlan {
        &self.split_k
    }
}

/// Runs a bound argument and reports the elapsed wall time.
pub struct GemmInvoker;

impl GemmInvoker {
    pub fn run<MP, LOp, ROp, COp>(
        &self,
        argument: &mut GemmArgument<'_, MP, LOp, ROp, COp>,
    ) -> Duration
    where
        MP: MatmulPrecision,
        LOp: ElementwiseOp<LhsG<MP>>,
        ROp: ElementwiseOp<RhsG<MP>>,
        COp: ElementwiseOp<AccG<MP>>,
    {
        let start = Instant::now();

        // Atomic accumulation folds into the destination, so it must start
        // from zero.
        if argument.config.global.write_strategy == WriteStrategy::AtomicAccumulate {
            argument.out.fill(Zero::zero());
        }

        let out_view = GlobalMut::new(argument.out);
        PartitionedBatchMatmul::execute::<MP, LOp, ROp, COp>(
            argument.lhs,
            argument.rhs,
            &out_view,
            &argument.lhs_descriptor,
            &argument.rhs_descriptor,
            &argument.out_descriptor,
            &argument.mapper,
            &argument.split_k,
            &argument.lhs_op,
            &argument.rhs_op,
            &argument.out_op,
            argument.config,
        );

        start.elapsed()
    }
}
