use serde::{Deserialize, Serialize};
use warptile_core::{GroupCount, max_group_count};

use crate::components::{
    FormattedConfigError, MatmulAvailabilityError, MatmulSetupError, TilingScheme,
};

/// Traversal order of the output tile grid.
///
/// Swizzled orders re-block the grid so that consecutive group ids touch
/// overlapping rows or columns, improving cache reuse. The remap is a fixed
/// bijection, not a scheduling decision.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlobalOrder {
    RowMajor,
    ColMajor,
    /// Column-major inside bands of the given height (in tile rows).
    SwizzleRowMajor(u32),
    /// Row-major inside bands of the given width (in tile columns).
    SwizzleColMajor(u32),
}

impl GlobalOrder {
    /// Maps a linear id within one reduction slice to a tile coordinate.
    pub fn tile_of(&self, linear: u32, m_tiles: u32, n_tiles: u32) -> (u32, u32) {
        match *self {
            GlobalOrder::RowMajor => (linear / n_tiles, linear % n_tiles),
            GlobalOrder::ColMajor => (linear % m_tiles, linear / m_tiles),
            GlobalOrder::SwizzleRowMajor(w) => {
                let band = linear / (w * n_tiles);
                let within = linear % (w * n_tiles);
                (band * w + within % w, within / w)
            }
            GlobalOrder::SwizzleColMajor(w) => {
                let band = linear / (w * m_tiles);
                let within = linear % (w * m_tiles);
                (within / w, band * w + within % w)
            }
        }
    }

    /// Returns an error if the swizzle band does not divide the tile grid.
    pub fn validate(&self, m_tiles: u32, n_tiles: u32) -> Result<(), MatmulSetupError> {
        match *self {
            GlobalOrder::RowMajor | GlobalOrder::ColMajor => Ok(()),

            GlobalOrder::SwizzleRowMajor(w) if !m_tiles.is_multiple_of(w) => {
                Err(MatmulSetupError::InvalidConfig(FormattedConfigError::new(
                    move || {
                        format!(
                            "In swizzle row major, number of tiles in m {m_tiles:?} must be divisible by swizzle band {w:?}."
                        )
                    },
                )))
            }

            GlobalOrder::SwizzleColMajor(w) if !n_tiles.is_multiple_of(w) => {
                Err(MatmulSetupError::InvalidConfig(FormattedConfigError::new(
                    move || {
                        format!(
                            "In swizzle col major, number of tiles in n {n_tiles:?} must be divisible by swizzle band {w:?}."
                        )
                    },
                )))
            }

            _ => Ok(()),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
/// Front-facing configuration when crafting a selection.
/// Allows choosing a grid shape strategy before knowing actual values.
pub enum GroupCountPlanSelection {
    /// X: tiles in m, Y: tiles in n, Z: reduction slices.
    #[default]
    FromProblem,

    /// X: total groups flattened.
    Flattened,
}

#[derive(Debug, Clone)]
/// Determines how to launch the hypercube: anything relevant to the group
/// count and to which tile a group at a given position works on.
pub struct HypercubeSelection {
    pub global_order: GlobalOrder,
    pub count_plan: GroupCountPlanSelection,
}

pub struct HypercubeSelectionBuilder {
    global_order: GlobalOrder,
    count_plan: GroupCountPlanSelection,
}

impl HypercubeSelection {
    pub fn builder(_tiling_scheme: &TilingScheme) -> HypercubeSelectionBuilder {
        HypercubeSelectionBuilder {
            global_order: GlobalOrder::RowMajor,
            count_plan: GroupCountPlanSelection::default(),
        }
    }

    pub fn to_hypercube_config(&self) -> HypercubeConfig {
        HypercubeConfig {
            global_order: self.global_order,
            count_plan: self.count_plan,
        }
    }
}

impl HypercubeSelectionBuilder {
    pub fn global_order(mut self, global_order: GlobalOrder) -> Self {
        self.global_order = global_order;
        self
    }

    pub fn count_plan(mut self, count_plan: GroupCountPlanSelection) -> Self {
        self.count_plan = count_plan;
        self
    }

    pub fn build(self) -> HypercubeSelection {
        HypercubeSelection {
            global_order: self.global_order,
            count_plan: self.count_plan,
        }
    }
}

/// Problem-independent part of the mapping, injected into the batch config.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct HypercubeConfig {
    pub global_order: GlobalOrder,
    pub count_plan: GroupCountPlanSelection,
}

/// Output tile owned by one group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupTile {
    pub row: u32,
    pub col: u32,
    pub k_slice: u32,
}

/// Maps linear group ids onto output tiles and reduction slices.
///
/// The reduction slice is derived first; the remainder maps onto the 2-D
/// tile grid through the configured global order.
#[derive(Clone, Debug)]
pub struct TileGridMapper {
    m_tiles: u32,
    n_tiles: u32,
    k_slices: u32,
    order: GlobalOrder,
    plan: GroupCountPlanSelection,
}

impl TileGridMapper {
    pub fn new(
        config: HypercubeConfig,
        m_tiles: u32,
        n_tiles: u32,
        k_slices: u32,
    ) -> Result<Self, MatmulSetupError> {
        config.global_order.validate(m_tiles, n_tiles)?;

        let mapper = Self {
            m_tiles,
            n_tiles,
            k_slices,
            order: config.global_order,
            plan: config.count_plan,
        };

        let count = mapper.group_count();
        let max = max_group_count();
        if count.x > max.x || count.y > max.y || count.z > max.z {
            return Err(MatmulAvailabilityError::GroupCountTooBig(count).into());
        }
        Ok(mapper)
    }

    /// How many groups the launch needs: one per output tile per slice.
    pub fn tile_count(&self) -> u32 {
        self.m_tiles * self.n_tiles * self.k_slices
    }

    pub fn group_count(&self) -> GroupCount {
        match self.plan {
            GroupCountPlanSelection::FromProblem => {
                GroupCount::new(self.m_tiles, self.n_tiles, self.k_slices)
            }
            GroupCountPlanSelection::Flattened => GroupCount::new(self.tile_count(), 1, 1),
        }
    }

    pub fn tile_of(&self, linear: u32) -> GroupTile {
        let tiles_per_slice = self.m_tiles * self.n_tiles;
        let k_slice = linear / tiles_per_slice;
        let (row, col) = self
            .order
            .tile_of(linear % tiles_per_slice, self.m_tiles, self.n_tiles);
        GroupTile { row, col, k_slice }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn mapper(order: GlobalOrder, m_tiles: u32, n_tiles: u32, k_slices: u32) -> TileGridMapper {
        TileGridMapper::new(
            HypercubeConfig {
                global_order: order,
                count_plan: GroupCountPlanSelection::FromProblem,
            },
            m_tiles,
            n_tiles,
            k_slices,
        )
        .unwrap()
    }

    #[test]
    fn row_major_walks_columns_first() {
        let mapper = mapper(GlobalOrder::RowMajor, 2, 3, 1);
        assert_eq!(mapper.tile_of(0), GroupTile { row: 0, col: 0, k_slice: 0 });
        assert_eq!(mapper.tile_of(1), GroupTile { row: 0, col: 1, k_slice: 0 });
        assert_eq!(mapper.tile_of(3), GroupTile { row: 1, col: 0, k_slice: 0 });
    }

    #[test]
    fn swizzle_fills_bands_column_major() {
        let mapper = mapper(GlobalOrder::SwizzleRowMajor(2), 4, 3, 1);
        assert_eq!(mapper.tile_of(0), GroupTile { row: 0, col: 0, k_slice: 0 });
        assert_eq!(mapper.tile_of(1), GroupTile { row: 1, col: 0, k_slice: 0 });
        assert_eq!(mapper.tile_of(2), GroupTile { row: 0, col: 1, k_slice: 0 });
        // Second band starts after 2 * 3 ids.
        assert_eq!(mapper.tile_of(6), GroupTile { row: 2, col: 0, k_slice: 0 });
    }

    #[test]
    fn every_order_is_a_bijection_onto_the_grid() {
        for order in [
            GlobalOrder::RowMajor,
            GlobalOrder::ColMajor,
            GlobalOrder::SwizzleRowMajor(2),
            GlobalOrder::SwizzleColMajor(3),
        ] {
            let mapper = mapper(order, 4, 6, 2);
            let mut seen = HashSet::new();
            for id in 0..mapper.tile_count() {
                let tile = mapper.tile_of(id);
                assert!(tile.row < 4 && tile.col < 6 && tile.k_slice < 2);
                assert!(seen.insert(tile), "{order:?} repeats {tile:?}");
            }
            assert_eq!(seen.len(), 4 * 6 * 2);
        }
    }

    #[test]
    fn swizzle_band_must_divide_grid() {
        let result = TileGridMapper::new(
            HypercubeConfig {
                global_order: GlobalOrder::SwizzleRowMajor(3),
                count_plan: GroupCountPlanSelection::FromProblem,
            },
            4,
            6,
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn slice_is_derived_before_the_tile() {
        let mapper = mapper(GlobalOrder::RowMajor, 2, 2, 3);
        assert_eq!(mapper.tile_of(5).k_slice, 1);
        assert_eq!(mapper.tile_of(5).row, 0);
        assert_eq!(mapper.tile_of(5).col, 1);
        assert_eq!(mapper.tile_of(11).k_slice, 2);
    }
}
