use crate::components::{
    GemmSpecialization, MatmulSelection, PartitionSize, StageSize, TileSize, TilingScheme,
    batch::{GlobalOrder, HypercubeSelection},
    global::write::WritePath,
};

fn scheme(tile: TileSize, partition: PartitionSize, stage: StageSize) -> TilingScheme {
    TilingScheme::builder()
        .with_tile_size(tile)
        .with_partition_size(partition)
        .with_stage_size(stage)
        .build()
        .unwrap_or_else(|e| panic!("registry tiling schemes are valid by construction: {e}"))
}

/// Declarative table of kernel variants.
///
/// Selection/profiling harnesses iterate this list, pre-flight each entry
/// with `is_supported` and keep the candidates that accept the problem.
pub fn instances() -> Vec<MatmulSelection> {
    let mut selections = Vec::new();

    // 128x128 group tile, 32-deep stages.
    let large = scheme(
        TileSize::new(4, 4, 8),
        PartitionSize::new(4, 4, 4),
        StageSize::new(8, 8),
    );
    selections.push(MatmulSelection::builder(large).build());
    selections.push(
        MatmulSelection::builder(large)
            .specialization(GemmSpecialization::MNKPadding)
            .build(),
    );
    selections.push(
        MatmulSelection::builder(large)
            .hypercube_selection(
                HypercubeSelection::builder(&large)
                    .global_order(GlobalOrder::SwizzleRowMajor(2))
                    .build(),
            )
            .specialization(GemmSpecialization::KPadding)
            .build(),
    );

    // 64x64 group tile, 16-deep stages.
    let medium = scheme(
        TileSize::new(4, 4, 8),
        PartitionSize::new(2, 2, 2),
        StageSize::new(8, 8),
    );
    selections.push(MatmulSelection::builder(medium).build());
    selections.push(
        MatmulSelection::builder(medium)
            .specialization(GemmSpecialization::MNPadding)
            .write_path(WritePath::Direct)
            .build(),
    );

    // 32x32 group tile, 8-deep stages, for skinny problems.
    let small = scheme(
        TileSize::new(4, 4, 4),
        PartitionSize::new(2, 2, 2),
        StageSize::new(4, 4),
    );
    selections.push(
        MatmulSelection::builder(small)
            .specialization(GemmSpecialization::MNKPadding)
            .build(),
    );

    selections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_not_empty_and_schemes_are_valid() {
        let instances = instances();
        assert!(instances.len() >= 4);
        for selection in &instances {
            assert!(selection.tiling_scheme.validate().is_ok());
        }
    }
}
