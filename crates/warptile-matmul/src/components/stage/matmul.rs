use num_traits::Zero;
use warptile_core::Numeric;

use super::{StageBuffer, StageMemory, StageMemoryConfig};
use crate::components::{
    AccR, InvalidConfigError, LhsR, LhsS, MatmulPrecision, RhsR, RhsS, TilingScheme,
    tile::register::{RegisterConfig, RegisterMatmul},
};

/// Configuration of one group's stage-level matmul.
#[derive(Copy, Clone, Debug)]
pub struct StageConfig {
    pub tiling: TilingScheme,
    pub register: RegisterConfig,
}

impl StageConfig {
    pub fn new(tiling: TilingScheme, register: RegisterConfig) -> Self {
        Self { tiling, register }
    }

    pub fn num_units(&self) -> u32 {
        self.tiling.units_per_group()
    }

    /// Stage partition owned by one unit, as (row, col) in partition grid
    /// coordinates.
    pub fn partition_coords(&self, unit: u32) -> (u32, u32) {
        let stage_n = self.tiling.stage_size.n;
        (unit / stage_n, unit % stage_n)
    }

    pub fn lhs_stage_memory(&self) -> StageMemoryConfig {
        StageMemoryConfig {
            rows: self.tiling.elements_in_stage_m(),
            cols: self.tiling.elements_in_stage_k(),
            tile_rows: self.tiling.tile_size.m,
            tile_cols: self.tiling.tile_size.k,
        }
    }

    /// Rhs is staged transposed (n-major, k-minor) so register fragments read
    /// both operands along contiguous k runs.
    pub fn rhs_stage_memory(&self) -> StageMemoryConfig {
        StageMemoryConfig {
            rows: self.tiling.elements_in_stage_n(),
            cols: self.tiling.elements_in_stage_k(),
            tile_rows: self.tiling.tile_size.n,
            tile_cols: self.tiling.tile_size.k,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        self.tiling.validate()?;
        self.register.validate()?;
        Ok(())
    }
}

/// Register fragments reused across every tile matmul of the k loop.
pub struct TileFragments<EL: Numeric, ER: Numeric> {
    pub lhs: Vec<EL>,
    pub rhs: Vec<ER>,
}

/// Accumulator register tiles, one per (unit, partition row, partition col).
///
/// Owned exclusively by their unit, zeroed at reduction-loop entry, add-only
/// until flushed.
pub struct Accumulators<EA: Numeric> {
    frags: Vec<EA>,
    tile_len: usize,
    partition_m: usize,
    partition_n: usize,
}

impl<EA: Numeric> Accumulators<EA> {
    pub fn new(config: StageConfig) -> Self {
        let tile_len = config.register.tile_size().mn() as usize;
        let partition_m = config.tiling.partition_size.m as usize;
        let partition_n = config.tiling.partition_size.n as usize;
        let units = config.num_units() as usize;
        Self {
            frags: vec![EA::zero(); units * partition_m * partition_n * tile_len],
            tile_len,
            partition_m,
            partition_n,
        }
    }

    fn tile_start(&self, unit: u32, pm: u32, pn: u32) -> usize {
        let tiles_per_unit = self.partition_m * self.partition_n;
        let tile_index =
            unit as usize * tiles_per_unit + pm as usize * self.partition_n + pn as usize;
        tile_index * self.tile_len
    }

    pub fn tile(&self, unit: u32, pm: u32, pn: u32) -> &[EA] {
        let start = self.tile_start(unit, pm, pn);
        &self.frags[start..start + self.tile_len]
    }

    pub fn tile_mut(&mut self, unit: u32, pm: u32, pn: u32) -> &mut [EA] {
        let start = self.tile_start(unit, pm, pn);
        &mut self.frags[start..start + self.tile_len]
    }
}

/// Stage-level matmul: every unit multiplies its partition of the stable
/// stage into its accumulator tiles.
pub struct PartitionedStageMatmul;

impl PartitionedStageMatmul {
    pub fn init_tile_fragments<MP: MatmulPrecision>(
        config: StageConfig,
    ) -> TileFragments<LhsR<MP>, RhsR<MP>> {
        TileFragments {
            lhs: RegisterMatmul::allocate_lhs(config.register),
            rhs: RegisterMatmul::allocate_rhs(config.register),
        }
    }

    pub fn init_accumulators<MP: MatmulPrecision>(config: StageConfig) -> Accumulators<AccR<MP>> {
        Accumulators::new(config)
    }

    /// One compute pass over the stable stage: both operand stages must be
    /// fully populated and synchronized by the caller.
    pub fn execute<MP: MatmulPrecision>(
        lhs_stage: &StageMemory<LhsS<MP>>,
        rhs_stage: &StageMemory<RhsS<MP>>,
        buffer: StageBuffer,
        fragments: &mut TileFragments<LhsR<MP>, RhsR<MP>>,
        acc: &mut Accumulators<AccR<MP>>,
        config: StageConfig,
    ) {
        let partition = config.tiling.partition_size;

        for unit in 0..config.num_units() {
            let (part_m, part_n) = config.partition_coords(unit);

            for k_tile in 0..partition.k {
                for pm in 0..partition.m {
                    let tile_row = part_m * partition.m + pm;
                    let lhs_tile = lhs_stage.tile(buffer, tile_row, k_tile);
                    RegisterMatmul::fill_lhs(&lhs_tile, &mut fragments.lhs, config.register);

                    for pn in 0..partition.n {
                        let tile_col = part_n * partition.n + pn;
                        let rhs_tile = rhs_stage.tile(buffer, tile_col, k_tile);
                        RegisterMatmul::fill_rhs(&rhs_tile, &mut fragments.rhs, config.register);

                        RegisterMatmul::execute(
                            &fragments.lhs,
                            &fragments.rhs,
                            acc.tile_mut(unit, pm, pn),
                            config.register,
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        PartitionSize, StageSize, TileSize, tile::register::ProductType,
    };

    fn config() -> StageConfig {
        let tiling = TilingScheme::builder()
            .with_tile_size(TileSize::new(2, 2, 4))
            .with_partition_size(PartitionSize::new(2, 1, 2))
            .with_stage_size(StageSize::new(2, 2))
            .build()
            .map_err(|e| e.to_string())
            .unwrap();
        StageConfig::new(
            tiling,
            RegisterConfig::new(tiling.tile_size, ProductType::Inner),
        )
    }

    #[test]
    fn one_pass_equals_reference_product() {
        let config = config();
        let k = config.tiling.elements_in_stage_k() as usize;

        let mut lhs_stage = StageMemory::<f32>::new(config.lhs_stage_memory());
        let mut rhs_stage = StageMemory::<f32>::new(config.rhs_stage_memory());

        // lhs stage m x k, rhs stage n x k (transposed).
        for (i, slot) in lhs_stage.stage_mut(StageBuffer::A).iter_mut().enumerate() {
            *slot = (i % 7) as f32;
        }
        for (i, slot) in rhs_stage.stage_mut(StageBuffer::A).iter_mut().enumerate() {
            *slot = (i % 5) as f32;
        }

        let lhs: Vec<f32> = lhs_stage.stage(StageBuffer::A).to_vec();
        let rhs: Vec<f32> = rhs_stage.stage(StageBuffer::A).to_vec();

        let mut fragments = PartitionedStageMatmul::init_tile_fragments::<f32>(config);
        let mut acc = PartitionedStageMatmul::init_accumulators::<f32>(config);
        PartitionedStageMatmul::execute::<f32>(
            &lhs_stage,
            &rhs_stage,
            StageBuffer::A,
            &mut fragments,
            &mut acc,
            config,
        );

        // Reassemble the group tile from accumulators and compare.
        let tile = config.register.tile_size();
        let partition = config.tiling.partition_size;
        for unit in 0..config.num_units() {
            let (part_m, part_n) = config.partition_coords(unit);
            for pm in 0..partition.m {
                for pn in 0..partition.n {
                    let acc_tile = acc.tile(unit, pm, pn);
                    for tm in 0..tile.m {
                        for tn in 0..tile.n {
                            let row = ((part_m * partition.m + pm) * tile.m + tm) as usize;
                            let col = ((part_n * partition.n + pn) * tile.n + tn) as usize;
                            let mut expected = 0.0;
                            for k_ in 0..k {
                                expected += lhs[row * k + k_] * rhs[col * k + k_];
                            }
                            assert_eq!(acc_tile[(tm * tile.n + tn) as usize], expected);
                        }
                    }
                }
            }
        }
    }
}
