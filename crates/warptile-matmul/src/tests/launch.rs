use half::f16;
use pretty_assertions::assert_eq;

use super::{MatmulTestCase, assert_relative, sample};
use crate::components::{
    GemmSpecialization, MatmulProblem, MatmulSelection, MatrixLayout, PartitionSize, StageSize,
    TileSize, TilingScheme,
    global::{PassThrough, Scale},
};
use crate::kernels::{DeviceGemm, instances};

/// 128x128 group tile, 32-deep reduction stages.
fn large_scheme() -> TilingScheme {
    TilingScheme::builder()
        .with_tile_size(TileSize::new(4, 4, 8))
        .with_partition_size(PartitionSize::new(4, 4, 4))
        .with_stage_size(StageSize::new(8, 8))
        .build()
        .map_err(|e| e.to_string())
        .unwrap()
}

/// 64x64 group tile, 16-deep reduction stages.
fn medium_scheme() -> TilingScheme {
    TilingScheme::builder()
        .with_tile_size(TileSize::new(4, 4, 8))
        .with_partition_size(PartitionSize::new(2, 2, 2))
        .with_stage_size(StageSize::new(8, 8))
        .build()
        .map_err(|e| e.to_string())
        .unwrap()
}

fn run_f32(
    selection: MatmulSelection,
    case: &MatmulTestCase,
    lhs_layout: MatrixLayout,
    rhs_layout: MatrixLayout,
    split_k: u32,
) -> Vec<f32> {
    let device = DeviceGemm::<f32>::new(selection);
    let problem = MatmulProblem::new(case.m, case.n, case.k, lhs_layout, rhs_layout);
    assert!(device.is_supported(&problem, split_k));

    let lhs = case.random_lhs::<f32>(999);
    let rhs = case.random_rhs::<f32>(1000);
    let mut out = vec![0.0f32; case.m * case.n];

    let invoker = device.make_invoker();
    let mut argument = device
        .make_argument(
            &lhs,
            &rhs,
            &mut out,
            &problem,
            split_k,
            PassThrough,
            PassThrough,
            PassThrough,
        )
        .unwrap();
    invoker.run(&mut argument);
    drop(argument);
    out
}

#[test]
fn f32_round_trip_matches_reference() {
    let case = MatmulTestCase {
        m: 128,
        k: 64,
        n: 128,
    };
    let out = run_f32(
        MatmulSelection::builder(medium_scheme()).build(),
        &case,
        MatrixLayout::RowMajor,
        MatrixLayout::RowMajor,
        1,
    );

    let lhs = case.random_lhs::<f32>(999);
    let rhs = case.random_rhs::<f32>(1000);
    let expected =
        case.matmul_cpu_algorithm(&lhs, &rhs, MatrixLayout::RowMajor, MatrixLayout::RowMajor);
    assert_relative(&out, &expected, 1e-6);
}

#[test]
fn concrete_half_precision_scenario() {
    // 256x256x64 over 128x128 tiles: 4 output tiles, the reduction holds
    // exactly two stages, so the pipeline degenerates straight to drain.
    let case = MatmulTestCase {
        m: 256,
        k: 64,
        n: 256,
    };
    let device = DeviceGemm::<f16>::new(MatmulSelection::builder(large_scheme()).build());
    let problem = MatmulProblem::new(
        case.m,
        case.n,
        case.k,
        MatrixLayout::RowMajor,
        MatrixLayout::RowMajor,
    );
    assert!(device.is_supported(&problem, 1));

    let lhs = case.random_lhs::<f16>(999);
    let rhs = case.random_rhs::<f16>(1000);
    let mut out = vec![f16::from_f32(0.0); case.m * case.n];

    let invoker = device.make_invoker();
    let mut argument = device
        .make_argument(
            &lhs,
            &rhs,
            &mut out,
            &problem,
            1,
            PassThrough,
            PassThrough,
            PassThrough,
        )
        .unwrap();

    assert_eq!(argument.mapper().tile_count(), 4);
    assert_eq!(argument.split_k_plan().main.num_steady(), 0);
    assert_eq!(argument.split_k_plan().main.num_k_tiles(), 2);

    invoker.run(&mut argument);
    drop(argument);

    let expected =
        case.matmul_cpu_algorithm(&lhs, &rhs, MatrixLayout::RowMajor, MatrixLayout::RowMajor);
    assert_relative(&out, &expected, 1e-3);
}

#[test]
fn padded_axes_match_reference_without_touching_outside() {
    let case = MatmulTestCase {
        m: 100,
        k: 40,
        n: 50,
    };
    let selection = MatmulSelection::builder(medium_scheme())
        .specialization(GemmSpecialization::MNKPadding)
        .build();
    let out = run_f32(
        selection,
        &case,
        MatrixLayout::RowMajor,
        MatrixLayout::RowMajor,
        1,
    );

    // The output buffer is exactly m*n: any write to a padded row or column
    // would have tripped the bounds-checked store.
    let lhs = case.random_lhs::<f32>(999);
    let rhs = case.random_rhs::<f32>(1000);
    let expected =
        case.matmul_cpu_algorithm(&lhs, &rhs, MatrixLayout::RowMajor, MatrixLayout::RowMajor);
    assert_relative(&out, &expected, 1e-6);
}

#[test]
fn unpadded_specialization_rejects_ragged_problem() {
    let device = DeviceGemm::<f32>::new(MatmulSelection::builder(medium_scheme()).build());
    let problem = MatmulProblem::new(100, 50, 40, MatrixLayout::RowMajor, MatrixLayout::RowMajor);
    assert!(!device.is_supported(&problem, 1));

    // A rejected candidate must leave the caller free to try the next one:
    // no partial writes happen.
    let lhs = sample::<f32>(100 * 40, 1);
    let rhs = sample::<f32>(40 * 50, 2);
    let mut out = vec![7.5f32; 100 * 50];
    let result = device.make_argument(
        &lhs,
        &rhs,
        &mut out,
        &problem,
        1,
        PassThrough,
        PassThrough,
        PassThrough,
    );
    assert!(result.is_err());
    assert!(out.iter().all(|&v| v == 7.5));
}

#[test]
fn split_k_matches_single_batch() {
    let case = MatmulTestCase {
        m: 64,
        k: 128,
        n: 64,
    };
    let single = run_f32(
        MatmulSelection::builder(medium_scheme()).build(),
        &case,
        MatrixLayout::RowMajor,
        MatrixLayout::RowMajor,
        1,
    );
    for split_k in [2, 4] {
        let split = run_f32(
            MatmulSelection::builder(medium_scheme()).build(),
            &case,
            MatrixLayout::RowMajor,
            MatrixLayout::RowMajor,
            split_k,
        );
        // Atomic folding reorders the partial sums, so exact equality is not
        // guaranteed, only closeness.
        assert_relative(&split, &single, 1e-5);
    }
}

#[test]
fn split_k_tail_slice_covers_remainder() {
    let case = MatmulTestCase {
        m: 64,
        k: 160,
        n: 64,
    };
    let device = DeviceGemm::<f32>::new(MatmulSelection::builder(medium_scheme()).build());
    let problem = MatmulProblem::new(
        case.m,
        case.n,
        case.k,
        MatrixLayout::RowMajor,
        MatrixLayout::RowMajor,
    );

    let lhs = case.random_lhs::<f32>(999);
    let rhs = case.random_rhs::<f32>(1000);
    let mut out = vec![0.0f32; case.m * case.n];
    let mut argument = device
        .make_argument(
            &lhs,
            &rhs,
            &mut out,
            &problem,
            3,
            PassThrough,
            PassThrough,
            PassThrough,
        )
        .unwrap();

    // 160 = 10 stages of 16: three slices of 4 + 4 + 2, the last running the
    // distinct tail schedule.
    let plan = argument.split_k_plan();
    assert_eq!(plan.num_slices, 3);
    assert!(plan.has_tail());
    assert_eq!(plan.main.num_k_tiles(), 4);
    assert_eq!(plan.schedule_for(2).num_k_tiles(), 2);

    device.make_invoker().run(&mut argument);
    drop(argument);

    let expected =
        case.matmul_cpu_algorithm(&lhs, &rhs, MatrixLayout::RowMajor, MatrixLayout::RowMajor);
    assert_relative(&out, &expected, 1e-5);
}

#[test]
fn col_major_operands_match_reference() {
    let case = MatmulTestCase {
        m: 64,
        k: 32,
        n: 64,
    };
    let out = run_f32(
        MatmulSelection::builder(medium_scheme()).build(),
        &case,
        MatrixLayout::ColMajor,
        MatrixLayout::ColMajor,
        1,
    );

    let lhs = case.random_lhs::<f32>(999);
    let rhs = case.random_rhs::<f32>(1000);
    let expected =
        case.matmul_cpu_algorithm(&lhs, &rhs, MatrixLayout::ColMajor, MatrixLayout::ColMajor);
    assert_relative(&out, &expected, 1e-6);
}

#[test]
fn elementwise_transforms_apply_in_flight_and_at_flush() {
    let case = MatmulTestCase {
        m: 64,
        k: 32,
        n: 64,
    };
    let device = DeviceGemm::<f32>::new(MatmulSelection::builder(medium_scheme()).build());
    let problem = MatmulProblem::new(
        case.m,
        case.n,
        case.k,
        MatrixLayout::RowMajor,
        MatrixLayout::RowMajor,
    );

    let lhs = case.random_lhs::<f32>(999);
    let rhs = case.random_rhs::<f32>(1000);
    let mut out = vec![0.0f32; case.m * case.n];
    let mut argument = device
        .make_argument(
            &lhs,
            &rhs,
            &mut out,
            &problem,
            1,
            Scale { factor: 2.0 },
            PassThrough,
            Scale { factor: 0.5 },
        )
        .unwrap();
    device.make_invoker().run(&mut argument);
    drop(argument);

    // 0.5 * ((2 * A) · B) == A · B.
    let expected =
        case.matmul_cpu_algorithm(&lhs, &rhs, MatrixLayout::RowMajor, MatrixLayout::RowMajor);
    assert_relative(&out, &expected, 1e-6);
}

#[test]
fn split_k_refuses_non_identity_output_transform() {
    let device = DeviceGemm::<f32>::new(MatmulSelection::builder(medium_scheme()).build());
    let problem = MatmulProblem::new(64, 64, 128, MatrixLayout::RowMajor, MatrixLayout::RowMajor);

    let lhs = sample::<f32>(64 * 128, 1);
    let rhs = sample::<f32>(128 * 64, 2);
    let mut out = vec![0.0f32; 64 * 64];
    let result = device.make_argument(
        &lhs,
        &rhs,
        &mut out,
        &problem,
        2,
        PassThrough,
        PassThrough,
        Scale { factor: 0.5 },
    );
    assert!(result.is_err());
}

#[test]
fn some_registry_instance_accepts_the_concrete_scenario() {
    let problem = MatmulProblem::new(256, 256, 64, MatrixLayout::RowMajor, MatrixLayout::RowMajor);
    let supported = instances()
        .into_iter()
        .filter(|selection| DeviceGemm::<f32>::new(selection.clone()).is_supported(&problem, 1))
        .count();
    assert!(supported >= 1);
}
