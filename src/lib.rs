use std::sync::Mutex;

use device::DeviceError;
use log::{debug, info};

pub mod address_space;
pub mod diagnostics;
pub mod dispatch;
pub mod fifo;
pub mod page_table;
pub mod process;

mod paging;

pub use address_space::{AddressSpace, Region};
pub use dispatch::{DeviceDispatch, DispatchError, SystemDispatch};
pub use page_table::PageTableEntry;
pub use process::Process;

#[derive(Debug, PartialEq)]
pub enum AccessError {
    InvalidRegionId,
    NotAllocated,
    AlreadyAllocated,
    InvalidAddress,
    OutOfAddressSpace,
    OutOfMemory,
    OutOfSwapSpace,
    Device(DeviceError),
}

impl From<DispatchError> for AccessError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::OutOfAddressSpace => AccessError::OutOfAddressSpace,
            DispatchError::Device(d) => AccessError::Device(d),
        }
    }
}

/// The virtual-memory core. One instance serves every simulated process;
/// a single global lock serializes all memory operations across all callers.
/// That trades throughput for simplicity and is the documented concurrency
/// model of this subsystem.
pub struct MemoryManager<D: DeviceDispatch = SystemDispatch> {
    dispatch: D,
    lock: Mutex<()>,
}

impl MemoryManager<SystemDispatch> {
    pub fn new() -> Self {
        Self::with_dispatch(SystemDispatch)
    }
}

impl Default for MemoryManager<SystemDispatch> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DeviceDispatch> MemoryManager<D> {
    pub fn with_dispatch(dispatch: D) -> Self {
        Self {
            dispatch,
            lock: Mutex::new(()),
        }
    }

    pub fn dispatch(&self) -> &D {
        &self.dispatch
    }

    /// Allocates `size` bytes inside an area and binds the region to
    /// `region_id`. If no free region fits, the area is grown through the
    /// dispatch collaborator and the allocation retried exactly once.
    pub fn alloc(
        &self,
        proc: &Process,
        area_id: usize,
        region_id: usize,
        size: u64,
    ) -> Result<u64, AccessError> {
        let _guard = self.lock.lock().unwrap();
        let mut mm = proc.mm();

        if mm.regions.get(region_id)?.is_some() {
            // Rebinding a live id would strand its current range: the old
            // region is neither reachable nor on any free list afterwards.
            return Err(AccessError::AlreadyAllocated);
        }
        if size == 0 {
            return Err(AccessError::InvalidAddress);
        }

        if let Some(region) = mm.area_mut(area_id)?.allocate(size) {
            mm.regions.put(region_id, region)?;
            info!(
                "pid {}: region {} allocated at [{}, {})",
                proc.pid(),
                region_id,
                region.start,
                region.end
            );
            return Ok(region.start);
        }

        // No fit: grow the area, map the new pages into RAM, retry once.
        let old_end = mm.area(area_id)?.end();
        let grown = self.dispatch.grow_area(&mut mm, area_id, size)?;
        if let Err(e) = self.map_page_range(&mut mm, proc, grown) {
            mm.area_mut(area_id)?.shrink_to(old_end);
            return Err(e);
        }
        mm.area_mut(area_id)?.release(grown);

        match mm.area_mut(area_id)?.allocate(size) {
            Some(region) => {
                mm.regions.put(region_id, region)?;
                info!(
                    "pid {}: region {} allocated at [{}, {}) after growth",
                    proc.pid(),
                    region_id,
                    region.start,
                    region.end
                );
                Ok(region.start)
            }
            None => Err(AccessError::OutOfAddressSpace),
        }
    }

    /// Releases a region back to its owning area's free list and clears the
    /// region-table slot. Pages stay mapped; only the address range is
    /// reusable afterwards.
    pub fn free(&self, proc: &Process, region_id: usize) -> Result<(), AccessError> {
        let _guard = self.lock.lock().unwrap();
        let mut mm = proc.mm();

        let region = mm
            .regions
            .get(region_id)?
            .ok_or(AccessError::NotAllocated)?;
        if region.start >= region.end {
            return Err(AccessError::InvalidAddress);
        }
        mm.regions.take(region_id)?;
        let area = mm
            .owning_area_mut(&region)
            .ok_or(AccessError::InvalidAddress)?;
        area.release(region);
        info!(
            "pid {}: region {} freed, [{}, {}) back on area {}",
            proc.pid(),
            region_id,
            region.start,
            region.end,
            area.id()
        );
        Ok(())
    }

    /// Reads one byte at `offset` inside a region, paging the backing frame
    /// in if necessary.
    pub fn read_byte(
        &self,
        proc: &Process,
        region_id: usize,
        offset: u64,
    ) -> Result<u8, AccessError> {
        let _guard = self.lock.lock().unwrap();
        let mut mm = proc.mm();

        let region = mm
            .regions
            .get(region_id)?
            .ok_or(AccessError::NotAllocated)?;
        let (pgn, page_off) = mm.decompose(region.start + offset);
        let fpn = self.page_in(&mut mm, proc, pgn)?;
        let phys = fpn as u64 * mm.page_size() as u64 + page_off;
        Ok(self.dispatch.read_physical(proc.ram(), phys)?)
    }

    /// Writes one byte at `offset` inside a region, paging the backing frame
    /// in if necessary.
    pub fn write_byte(
        &self,
        proc: &Process,
        region_id: usize,
        offset: u64,
        value: u8,
    ) -> Result<(), AccessError> {
        let _guard = self.lock.lock().unwrap();
        let mut mm = proc.mm();

        let region = mm
            .regions
            .get(region_id)?
            .ok_or(AccessError::NotAllocated)?;
        let (pgn, page_off) = mm.decompose(region.start + offset);
        let fpn = self.page_in(&mut mm, proc, pgn)?;
        let phys = fpn as u64 * mm.page_size() as u64 + page_off;
        Ok(self.dispatch.write_physical(proc.ram(), phys, value)?)
    }

    /// Reclaims every frame the process holds, on RAM and swap alike.
    /// Called at process exit.
    pub fn release_process(&self, proc: &Process) {
        let _guard = self.lock.lock().unwrap();
        let mut mm = proc.mm();

        let entries: Vec<_> = mm.page_table.iter().collect();
        for (pgn, entry) in entries {
            match entry {
                PageTableEntry::Resident { frame } => proc.ram().release_frame(frame),
                PageTableEntry::Swapped { frame, .. } => proc.swap().release_frame(frame),
                PageTableEntry::Unmapped => continue,
            }
            mm.page_table.clear(pgn);
        }
        mm.fifo.clear();
        debug!("pid {}: address space released", proc.pid());
    }
}
