use derive_new::new;
use serde::{Deserialize, Serialize};

use super::{FormattedConfigError, InvalidConfigError, MatmulIdent};

/// Shape of the innermost register matmul.
#[derive(new, Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub m: u32,
    pub n: u32,
    pub k: u32,
}

impl TileSize {
    pub fn mk(&self) -> u32 {
        self.m * self.k
    }

    pub fn nk(&self) -> u32 {
        self.n * self.k
    }

    pub fn mn(&self) -> u32 {
        self.m * self.n
    }
}

/// Tiles owned by one unit along each axis.
#[derive(new, Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSize {
    pub m: u32,
    pub n: u32,
    pub k: u32,
}

/// Unit partitions along each axis of one stage (one per unit).
#[derive(new, Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSize {
    pub m: u32,
    pub n: u32,
}

impl StageSize {
    pub fn num_partitions(&self) -> u32 {
        self.m * self.n
    }
}

/// The full tiling hierarchy of one group: register tile × unit partition ×
/// stage. One stage along k is the amount consumed per pipeline iteration.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilingScheme {
    pub tile_size: TileSize,
    pub partition_size: PartitionSize,
    pub stage_size: StageSize,
}

impl TilingScheme {
    pub fn builder() -> TilingSchemeBuilder {
        TilingSchemeBuilder::default()
    }

    pub fn elements_in_stage_m(&self) -> u32 {
        self.tile_size.m * self.partition_size.m * self.stage_size.m
    }

    pub fn elements_in_stage_n(&self) -> u32 {
        self.tile_size.n * self.partition_size.n * self.stage_size.n
    }

    pub fn elements_in_stage_k(&self) -> u32 {
        self.tile_size.k * self.partition_size.k
    }

    pub fn elements_in_stage_row(&self, ident: MatmulIdent) -> u32 {
        match ident {
            MatmulIdent::Lhs => self.elements_in_stage_m(),
            MatmulIdent::Rhs => self.elements_in_stage_n(),
            MatmulIdent::Out => self.elements_in_stage_m(),
        }
    }

    pub fn elements_in_stage_col(&self, ident: MatmulIdent) -> u32 {
        match ident {
            MatmulIdent::Lhs => self.elements_in_stage_k(),
            MatmulIdent::Rhs => self.elements_in_stage_k(),
            MatmulIdent::Out => self.elements_in_stage_n(),
        }
    }

    pub fn elements_in_stage(&self, ident: MatmulIdent) -> u32 {
        self.elements_in_stage_row(ident) * self.elements_in_stage_col(ident)
    }

    pub fn tiles_in_stage_m(&self) -> u32 {
        self.partition_size.m * self.stage_size.m
    }

    pub fn tiles_in_stage_n(&self) -> u32 {
        self.partition_size.n * self.stage_size.n
    }

    pub fn tiles_in_stage_k(&self) -> u32 {
        self.partition_size.k
    }

    /// One unit per stage partition.
    pub fn units_per_group(&self) -> u32 {
        self.stage_size.num_partitions()
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        let all = [
            self.tile_size.m,
            self.tile_size.n,
            self.tile_size.k,
            self.partition_size.m,
            self.partition_size.n,
            self.partition_size.k,
            self.stage_size.m,
            self.stage_size.n,
        ];
        if all.contains(&0) {
            let scheme = *self;
            return Err(FormattedConfigError::new(move || {
                format!("Tiling scheme has a zero-sized level: {scheme:?}")
            }));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct TilingSchemeBuilder {
    tile_size: Option<TileSize>,
    partition_size: Option<PartitionSize>,
    stage_size: Option<StageSize>,
}

impl TilingSchemeBuilder {
    pub fn with_tile_size(mut self, tile_size: TileSize) -> Self {
        self.tile_size = Some(tile_size);
        self
    }

    pub fn with_partition_size(mut self, partition_size: PartitionSize) -> Self {
        self.partition_size = Some(partition_size);
        self
    }

    pub fn with_stage_size(mut self, stage_size: StageSize) -> Self {
        self.stage_size = Some(stage_size);
        self
    }

    pub fn build(self) -> Result<TilingScheme, InvalidConfigError> {
        let scheme = TilingScheme {
            tile_size: self
                .tile_size
                .ok_or_else(|| FormattedConfigError::new(|| "Missing tile size".to_string()))?,
            partition_size: self.partition_size.ok_or_else(|| {
                FormattedConfigError::new(|| "Missing partition size".to_string())
            })?,
            stage_size: self
                .stage_size
                .ok_or_else(|| FormattedConfigError::new(|| "Missing stage size".to_string()))?,
        };
        scheme.validate()?;
        Ok(scheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> TilingScheme {
        TilingScheme::builder()
            .with_tile_size(TileSize::new(4, 4, 8))
            .with_partition_size(PartitionSize::new(2, 2, 2))
            .with_stage_size(StageSize::new(4, 2))
            .build()
            .map_err(|e| e.to_string())
            .unwrap()
    }

    #[test]
    fn stage_extents_multiply_through_the_hierarchy() {
        let scheme = scheme();
        assert_eq!(scheme.elements_in_stage_m(), 4 * 2 * 4);
        assert_eq!(scheme.elements_in_stage_n(), 4 * 2 * 2);
        assert_eq!(scheme.elements_in_stage_k(), 8 * 2);
        assert_eq!(scheme.units_per_group(), 8);
    }

    #[test]
    fn stage_extents_per_ident() {
        let scheme = scheme();
        assert_eq!(
            scheme.elements_in_stage(MatmulIdent::Lhs),
            scheme.elements_in_stage_m() * scheme.elements_in_stage_k()
        );
        assert_eq!(
            scheme.elements_in_stage(MatmulIdent::Rhs),
            scheme.elements_in_stage_n() * scheme.elements_in_stage_k()
        );
    }

    #[test]
    fn zero_sized_level_is_rejected() {
        let result = TilingScheme::builder()
            .with_tile_size(TileSize::new(4, 0, 8))
            .with_partition_size(PartitionSize::new(1, 1, 1))
            .with_stage_size(StageSize::new(1, 1))
            .build();
        assert!(result.is_err());
    }
}
