use derive_new::new;
use serde::{Deserialize, Serialize};

use super::MatrixLayout;

#[derive(new, Clone, Debug)]
/// Description of a matmul problem to solve, regardless of actual data
pub struct MatmulProblem {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub lhs_layout: MatrixLayout,
    pub rhs_layout: MatrixLayout,
}

/// Which problem axes the kernel is allowed to right-pad up to a tile
/// multiple. Chosen per problem-size combination; an axis not covered here
/// must divide its tile length exactly or the argument is rejected.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum GemmSpecialization {
    #[default]
    Default,
    MPadding,
    NPadding,
    KPadding,
    MNPadding,
    MKPadding,
    NKPadding,
    MNKPadding,
}

impl GemmSpecialization {
    pub fn pads_m(&self) -> bool {
        matches!(
            self,
            GemmSpecialization::MPadding
                | GemmSpecialization::MNPadding
                | GemmSpecialization::MKPadding
                | GemmSpecialization::MNKPadding
        )
    }

    pub fn pads_n(&self) -> bool {
        matches!(
            self,
            GemmSpecialization::NPadding
                | GemmSpecialization::MNPadding
                | GemmSpecialization::NKPadding
                | GemmSpecialization::MNKPadding
        )
    }

    pub fn pads_k(&self) -> bool {
        matches!(
            self,
            GemmSpecialization::KPadding
                | GemmSpecialization::MKPadding
                | GemmSpecialization::NKPadding
                | GemmSpecialization::MNKPadding
        )
    }
}

/// Right-pads `len` to the next multiple of `tile`.
pub fn padded_length(len: u32, tile: u32) -> u32 {
    len.div_ceil(tile) * tile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_length_rounds_up_to_tile_multiple() {
        assert_eq!(padded_length(256, 128), 256);
        assert_eq!(padded_length(250, 128), 256);
        assert_eq!(padded_length(1, 128), 128);
    }

    #[test]
    fn padding_never_reaches_a_full_tile() {
        for len in 1..512u32 {
            let padded = padded_length(len, 128);
            assert!(padded - len < 128);
            assert!(padded >= len);
        }
    }

    #[test]
    fn specialization_axis_coverage() {
        assert!(GemmSpecialization::MNKPadding.pads_m());
        assert!(GemmSpecialization::MNKPadding.pads_n());
        assert!(GemmSpecialization::MNKPadding.pads_k());
        assert!(!GemmSpecialization::Default.pads_m());
        assert!(GemmSpecialization::MKPadding.pads_k());
        assert!(!GemmSpecialization::MKPadding.pads_n());
    }
}
