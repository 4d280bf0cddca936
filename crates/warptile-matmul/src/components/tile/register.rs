use num_traits::Zero;
use serde::{Deserialize, Serialize};
use warptile_core::Numeric;

use super::Tile;
use crate::components::{FormattedConfigError, InvalidConfigError, TileSize, spec::cast};

/// Loop order of the register matmul.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    /// m/n outer, k inner: fragments are stored k-minor.
    #[default]
    Inner,
    /// k outer, m/n inner: fragments are stored k-major.
    Outer,
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterConfig {
    pub tile_size: TileSize,
    pub product_type: ProductType,
}

impl RegisterConfig {
    pub fn new(tile_size: TileSize, product_type: ProductType) -> Self {
        Self {
            tile_size,
            product_type,
        }
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        let size = self.tile_size;
        if size.m == 0 || size.n == 0 || size.k == 0 {
            return Err(FormattedConfigError::new(move || {
                format!("Register tile has a zero axis: {size:?}")
            }));
        }
        Ok(())
    }
}

/// Uses one unit to perform a small matmul directly in registers
pub struct RegisterMatmul;

impl RegisterMatmul {
    pub fn allocate_lhs<ER: Numeric>(config: RegisterConfig) -> Vec<ER> {
        vec![ER::zero(); config.tile_size().mk() as usize]
    }

    pub fn allocate_rhs<ER: Numeric>(config: RegisterConfig) -> Vec<ER> {
        vec![ER::zero(); config.tile_size().nk() as usize]
    }

    pub fn allocate_acc<EA: Numeric>(config: RegisterConfig) -> Vec<EA> {
        vec![EA::zero(); config.tile_size().mn() as usize]
    }

    pub fn fill_lhs<ES: Numeric, ER: Numeric>(
        tile: &Tile<'_, ES>,
        lhs: &mut [ER],
        config: RegisterConfig,
    ) {
        let TileSize { m, k, .. } = config.tile_size();
        match config.product_type {
            ProductType::Inner => Self::fill_plain(tile, lhs, m, k),
            ProductType::Outer => Self::fill_transposed(tile, lhs, m, k),
        }
    }

    pub fn fill_rhs<ES: Numeric, ER: Numeric>(
        tile: &Tile<'_, ES>,
        rhs: &mut [ER],
        config: RegisterConfig,
    ) {
        let TileSize { n, k, .. } = config.tile_size();
        match config.product_type {
            ProductType::Inner => Self::fill_plain(tile, rhs, n, k),
            ProductType::Outer => Self::fill_transposed(tile, rhs, n, k),
        }
    }

    /// `acc += lhs^T · rhs` over one register tile.
    pub fn execute<EL: Numeric, ER: Numeric, EA: Numeric>(
        lhs: &[EL],
        rhs: &[ER],
        acc: &mut [EA],
        config: RegisterConfig,
    ) {
        match config.product_type {
            ProductType::Inner => Self::inner_product(lhs, rhs, acc, config),
            ProductType::Outer => Self::outer_product(lhs, rhs, acc, config),
        }
    }

    fn inner_product<EL: Numeric, ER: Numeric, EA: Numeric>(
        lhs: &[EL],
        rhs: &[ER],
        acc: &mut [EA],
        config: RegisterConfig,
    ) {
        let TileSize { m, n, k } = config.tile_size();

        for m_ in 0..m {
            for n_ in 0..n {
                for k_ in 0..k {
                    let lhs_elem: EA = cast(lhs[(m_ * k + k_) as usize]);
                    let rhs_elem: EA = cast(rhs[(n_ * k + k_) as usize]);
                    acc[(m_ * n + n_) as usize] += lhs_elem * rhs_elem;
                }
            }
        }
    }

    fn outer_product<EL: Numeric, ER: Numeric, EA: Numeric>(
        lhs: &[EL],
        rhs: &[ER],
        acc: &mut [EA],
        config: RegisterConfig,
    ) {
        let TileSize { m, n, k } = config.tile_size();

        for k_ in 0..k {
            for m_ in 0..m {
                let lhs_elem: EA = cast(lhs[(k_ * m + m_) as usize]);
                for n_ in 0..n {
                    let rhs_elem: EA = cast(rhs[(k_ * n + n_) as usize]);
                    acc[(m_ * n + n_) as usize] += lhs_elem * rhs_elem;
                }
            }
        }
    }

    fn fill_plain<ES: Numeric, ER: Numeric>(
        tile: &Tile<'_, ES>,
        fragment: &mut [ER],
        rows: u32,
        cols: u32,
    ) {
        for row in 0..rows {
            for col in 0..cols {
                fragment[(row * cols + col) as usize] = cast(tile.get(row, col));
            }
        }
    }

    fn fill_transposed<ES: Numeric, ER: Numeric>(
        tile: &Tile<'_, ES>,
        fragment: &mut [ER],
        rows: u32,
        cols: u32,
    ) {
        for row in 0..rows {
            for col in 0..cols {
                fragment[(col * rows + row) as usize] = cast(tile.get(row, col));
            }
        }
    }
}
