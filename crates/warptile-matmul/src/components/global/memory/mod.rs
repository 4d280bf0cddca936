use num_traits::Zero;
use warptile_core::Numeric;

use crate::components::descriptor::{TensorDescriptor, TensorElement};

/// Read window over a global operand tensor.
///
/// The window's corner is a logical multi-index into the descriptor;
/// [`TensorWindow::move_window`] advances the corner by a fixed step without
/// re-deriving anything, since the reduction loop calls it once per iteration.
/// Reads resolve through the descriptor, so padded positions yield the fill
/// value (zero) without touching memory.
pub struct TensorWindow<'a, E: Numeric> {
    data: &'a [E],
    descriptor: &'a TensorDescriptor,
    origin: Vec<u32>,
    scratch: Vec<u32>,
}

impl<'a, E: Numeric> TensorWindow<'a, E> {
    pub fn new(data: &'a [E], descriptor: &'a TensorDescriptor, origin: Vec<u32>) -> Self {
        assert_eq!(
            origin.len(),
            descriptor.rank(),
            "window origin rank differs from descriptor rank"
        );
        let scratch = vec![0; origin.len()];
        Self {
            data,
            descriptor,
            origin,
            scratch,
        }
    }

    /// Reads the element at `local` coordinates relative to the window
    /// corner. Precondition (established at setup): the coordinates lie
    /// inside the descriptor's padded bounds.
    pub fn read(&mut self, local: &[u32]) -> E {
        for (slot, (origin, offset)) in self
            .scratch
            .iter_mut()
            .zip(self.origin.iter().zip(local.iter()))
        {
            *slot = origin + offset;
        }

        match self.descriptor.element(&self.scratch) {
            Ok(TensorElement::Linear(offset)) => self.data[offset],
            Ok(TensorElement::Pad) => E::zero(),
            Err(err) => panic!("window read escaped validated bounds: {err}"),
        }
    }

    /// Advances the window corner by `step`. O(1) offset arithmetic; no index
    /// recomputation happens here.
    pub fn move_window(&mut self, step: &[u32]) {
        for (origin, delta) in self.origin.iter_mut().zip(step.iter()) {
            *origin += delta;
        }
    }

    pub fn origin(&self) -> &[u32] {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::descriptor::{AxisTransform, TransformStage};

    #[test]
    fn reads_follow_the_window_corner() {
        let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
        let descriptor = TensorDescriptor::new(vec![4, 6], vec![6, 1])
            .map_err(|e| e.to_string())
            .unwrap();
        let mut window = TensorWindow::new(&data, &descriptor, vec![0, 0]);

        assert_eq!(window.read(&[1, 2]), 8.0);
        window.move_window(&[2, 3]);
        assert_eq!(window.read(&[1, 2]), 23.0);
    }

    #[test]
    fn padded_positions_read_zero() {
        let data: Vec<f32> = vec![1.0; 12];
        let descriptor = TensorDescriptor::new(vec![3, 4], vec![4, 1])
            .map_err(|e| e.to_string())
            .unwrap()
            .transform(TransformStage::new(vec![
                AxisTransform::RightPad { axis: 0, padded: 4 },
                AxisTransform::PassThrough { axis: 1 },
            ]))
            .map_err(|e| e.to_string())
            .unwrap();
        let mut window = TensorWindow::new(&data, &descriptor, vec![0, 0]);

        assert_eq!(window.read(&[2, 0]), 1.0);
        assert_eq!(window.read(&[3, 0]), 0.0);
    }
}
