use std::cell::Cell;

use rayon::prelude::*;

/// Number of execution-unit groups launched along each grid axis.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct GroupCount {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GroupCount {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn num_groups(&self) -> u32 {
        self.x * self.y * self.z
    }
}

/// Largest grid the engine accepts on any target.
///
/// Matches the per-axis limit of the accelerator model the engine is written
/// against; setup validation compares planned grids against it.
pub fn max_group_count() -> GroupCount {
    GroupCount::new(u16::MAX as u32, u16::MAX as u32, u16::MAX as u32)
}

/// Number of cooperating units inside one group.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct GroupDim {
    pub units: u32,
}

impl GroupDim {
    pub fn new(units: u32) -> Self {
        Self { units }
    }

    pub fn num_units(&self) -> u32 {
        self.units
    }
}

/// Per-group execution state handed to the kernel body.
///
/// One context exists per group task. Units inside the group are iterated in
/// program order, so a group barrier reduces to a phase boundary; the context
/// counts the boundaries so schedules can assert their synchronization
/// discipline.
#[derive(Debug)]
pub struct GroupContext {
    linear_id: u32,
    dim: GroupDim,
    syncs: Cell<u32>,
}

impl GroupContext {
    pub fn new(linear_id: u32, dim: GroupDim) -> Self {
        Self {
            linear_id,
            dim,
            syncs: Cell::new(0),
        }
    }

    pub fn linear_id(&self) -> u32 {
        self.linear_id
    }

    pub fn num_units(&self) -> u32 {
        self.dim.num_units()
    }

    /// Group-wide barrier: everything written before this call is visible to
    /// every unit of the group after it.
    pub fn sync_group(&self) {
        self.syncs.set(self.syncs.get() + 1);
    }

    /// Number of barriers executed so far.
    pub fn sync_count(&self) -> u32 {
        self.syncs.get()
    }
}

/// Walks the grid, one task per group, on the rayon pool.
///
/// Groups are independent by construction; any cross-group accumulation goes
/// through atomic stores (see [`crate::memory::GlobalMut`]).
pub fn launch_groups<F>(count: GroupCount, dim: GroupDim, kernel: F)
where
    F: Fn(GroupContext) + Send + Sync,
{
    let total = count.num_groups();
    log::debug!(
        "launching grid ({}, {}, {}) with {} units per group",
        count.x,
        count.y,
        count.z,
        dim.num_units()
    );

    (0..total)
        .into_par_iter()
        .for_each(|id| kernel(GroupContext::new(id, dim)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn every_group_runs_exactly_once() {
        let count = GroupCount::new(4, 3, 2);
        let seen = AtomicU32::new(0);
        launch_groups(count, GroupDim::new(1), |ctx| {
            assert!(ctx.linear_id() < count.num_groups());
            seen.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(seen.load(Ordering::Relaxed), 24);
    }

    #[test]
    fn sync_count_tracks_barriers() {
        let ctx = GroupContext::new(0, GroupDim::new(8));
        ctx.sync_group();
        ctx.sync_group();
        assert_eq!(ctx.sync_count(), 2);
    }
}
