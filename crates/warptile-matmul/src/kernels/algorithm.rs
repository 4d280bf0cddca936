use crate::components::{
    MatmulLineSizes, MatmulSelection, MatmulSetupError,
    batch::BatchConfig,
    global::GlobalConfig,
    global::write::WriteStrategy,
    stage::StageConfig,
    tile::register::RegisterConfig,
};

/// Specifications for a matmul algorithm: how a selection becomes a validated
/// batch config.
pub trait Algorithm {
    fn setup(
        selection: &MatmulSelection,
        line_sizes: &MatmulLineSizes,
    ) -> Result<BatchConfig, MatmulSetupError>;
}

/// The double-buffered pipeline assembled from the register tile matmul, the
/// unit-partitioned stage matmul and the cyclic stage loaders.
pub struct DoubleBufferingAlgorithm;

impl Algorithm for DoubleBufferingAlgorithm {
    fn setup(
        selection: &MatmulSelection,
        line_sizes: &MatmulLineSizes,
    ) -> Result<BatchConfig, MatmulSetupError> {
        let register = RegisterConfig::new(selection.tiling_scheme.tile_size, selection.product_type);
        let stage = StageConfig::new(selection.tiling_scheme, register);

        let config = BatchConfig {
            global: GlobalConfig {
                stage,
                specialization: selection.specialization,
                line_sizes: *line_sizes,
                write_path: selection.write_path,
                // Arguments flip this to atomic accumulation when split-K > 1.
                write_strategy: WriteStrategy::Overwrite,
            },
            hypercube: selection.hypercube_selection.to_hypercube_config(),
        };
        config.validate()?;

        Ok(config)
    }
}
