use super::{LineSizeError, MatmulSetupError, MatrixLayout};

/// Widths the host's vector units handle well, widest first.
const SUPPORTED_LINE_SIZES: [u8; 4] = [8, 4, 2, 1];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Line size used for each tensor in global memory accesses.
/// Represents the number of elements processed per SIMD load/store.
pub struct MatmulLineSizes {
    pub lhs: u8,
    pub rhs: u8,
    pub out: u8,
}

#[derive(Clone, Debug)]
/// Candidate line sizes supported for each tensor.
///
/// These lists begin with target-supported sizes and are progressively
/// filtered based on problem shape divisibility constraints.
pub struct AvailableLineSizes {
    pub lhs: Vec<u8>,
    pub rhs: Vec<u8>,
    pub out: Vec<u8>,
}

impl AvailableLineSizes {
    pub fn from_supported() -> Self {
        AvailableLineSizes {
            lhs: SUPPORTED_LINE_SIZES.to_vec(),
            rhs: SUPPORTED_LINE_SIZES.to_vec(),
            out: SUPPORTED_LINE_SIZES.to_vec(),
        }
    }

    /// Filter Lhs candidates to those dividing the length of its contiguous
    /// axis (k for row-major, m for col-major).
    pub fn filter_lhs_with_shape(self, m: usize, k: usize, layout: MatrixLayout) -> Self {
        let contiguous = match layout {
            MatrixLayout::RowMajor => k,
            MatrixLayout::ColMajor => m,
        };
        self.filter_lhs(|size| contiguous % *size as usize == 0)
    }

    /// Filter Rhs candidates to those dividing the length of its contiguous
    /// axis (n for row-major, k for col-major).
    pub fn filter_rhs_with_shape(self, k: usize, n: usize, layout: MatrixLayout) -> Self {
        let contiguous = match layout {
            MatrixLayout::RowMajor => n,
            MatrixLayout::ColMajor => k,
        };
        self.filter_rhs(|size| contiguous % *size as usize == 0)
    }

    /// Filter output candidates to those dividing the row length.
    pub fn filter_out_with_shape(self, n: usize) -> Self {
        self.filter_out(|size| n % *size as usize == 0)
    }

    /// Filter available line sizes for Lhs
    pub fn filter_lhs<F>(self, pred: F) -> Self
    where
        F: FnMut(&u8) -> bool,
    {
        Self {
            lhs: self.lhs.iter().copied().filter(pred).collect(),
            rhs: self.rhs,
            out: self.out,
        }
    }

    /// Filter available line sizes for Rhs
    pub fn filter_rhs<F>(self, pred: F) -> Self
    where
        F: FnMut(&u8) -> bool,
    {
        Self {
            lhs: self.lhs,
            rhs: self.rhs.iter().copied().filter(pred).collect(),
            out: self.out,
        }
    }

    /// Filter available line sizes for output
    pub fn filter_out<F>(self, pred: F) -> Self
    where
        F: FnMut(&u8) -> bool,
    {
        Self {
            lhs: self.lhs,
            rhs: self.rhs,
            out: self.out.iter().copied().filter(pred).collect(),
        }
    }

    /// Pick the largest remaining line size for each tensor
    pub fn pick_max(self) -> Result<MatmulLineSizes, MatmulSetupError> {
        let pick = |candidates: Vec<u8>| {
            candidates
                .into_iter()
                .max()
                .ok_or(MatmulSetupError::LineSize(LineSizeError::NoValidLineSize))
        };

        Ok(MatmulLineSizes {
            lhs: pick(self.lhs)?,
            rhs: pick(self.rhs)?,
            out: pick(self.out)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_widest_dividing_line() {
        let sizes = AvailableLineSizes::from_supported()
            .filter_lhs_with_shape(64, 12, MatrixLayout::RowMajor)
            .filter_rhs_with_shape(12, 64, MatrixLayout::RowMajor)
            .filter_out_with_shape(64)
            .pick_max()
            .unwrap();
        assert_eq!(sizes.lhs, 4);
        assert_eq!(sizes.rhs, 8);
        assert_eq!(sizes.out, 8);
    }

    #[test]
    fn col_major_filters_on_the_other_axis() {
        let sizes = AvailableLineSizes::from_supported()
            .filter_lhs_with_shape(6, 128, MatrixLayout::ColMajor)
            .pick_max()
            .unwrap();
        assert_eq!(sizes.lhs, 2);
    }

    #[test]
    fn odd_length_still_finds_scalar_line() {
        let sizes = AvailableLineSizes::from_supported()
            .filter_out_with_shape(17)
            .pick_max()
            .unwrap();
        assert_eq!(sizes.out, 1);
    }
}
