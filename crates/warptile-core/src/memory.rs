use std::marker::PhantomData;

use crate::precision::Numeric;

/// Mutable view over an output tensor, shareable across group tasks.
///
/// Groups write disjoint tiles (guaranteed by the tile mapper), except under
/// split-K where several groups target the same tile and must go through
/// [`GlobalMut::accumulate`]. Non-overlapping plain stores and bit-CAS
/// accumulates are never mixed on the same element within one launch.
pub struct GlobalMut<'a, E: Numeric> {
    ptr: *mut E,
    len: usize,
    _lifetime: PhantomData<&'a mut [E]>,
}

// SAFETY: the mapper assigns disjoint element ranges to plain stores, and all
// overlapping writes use atomic accumulate. The pointer outlives the launch
// through the captured lifetime.
unsafe impl<E: Numeric> Send for GlobalMut<'_, E> {}
unsafe impl<E: Numeric> Sync for GlobalMut<'_, E> {}

impl<'a, E: Numeric> GlobalMut<'a, E> {
    pub fn new(data: &'a mut [E]) -> Self {
        Self {
            ptr: data.as_mut_ptr(),
            len: data.len(),
            _lifetime: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Plain store. The caller owns `index` exclusively for this launch.
    pub fn store(&self, index: usize, value: E) {
        assert!(index < self.len, "store out of bounds: {index} >= {}", self.len);
        // SAFETY: bounds checked above; exclusivity per the type contract.
        unsafe { self.ptr.add(index).write(value) };
    }

    /// Atomic accumulate, used when several groups fold partial sums into the
    /// same output tile (split-K).
    pub fn accumulate(&self, index: usize, value: E) {
        assert!(
            index < self.len,
            "accumulate out of bounds: {index} >= {}",
            self.len
        );
        // SAFETY: bounds checked above; all overlapping accesses are atomic.
        unsafe { E::atomic_add(self.ptr.add(index), value) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GroupCount, GroupDim, launch_groups};

    #[test]
    fn disjoint_stores_from_parallel_groups() {
        let mut data = vec![0.0f32; 16];
        let view = GlobalMut::new(&mut data);
        launch_groups(GroupCount::new(16, 1, 1), GroupDim::new(1), |ctx| {
            view.store(ctx.linear_id() as usize, ctx.linear_id() as f32);
        });
        for (i, value) in data.iter().enumerate() {
            assert_eq!(*value, i as f32);
        }
    }

    #[test]
    fn overlapping_accumulates_sum_exactly() {
        let mut data = vec![0.0f32; 1];
        let view = GlobalMut::new(&mut data);
        launch_groups(GroupCount::new(64, 1, 1), GroupDim::new(1), |_| {
            view.accumulate(0, 1.0);
        });
        assert_eq!(data[0], 64.0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn store_past_end_panics() {
        let mut data = vec![0.0f32; 2];
        let view = GlobalMut::new(&mut data);
        view.store(2, 1.0);
    }
}
