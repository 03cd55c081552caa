mod region_table;
mod vm_area;

pub use region_table::RegionTable;
pub use vm_area::{Region, VirtualArea};

use crate::fifo::FifoTracker;
use crate::page_table::PageTable;
use crate::AccessError;

/// Per-process memory descriptor: the page table, the virtual areas, the
/// region (symbol) table and the FIFO load tracker. Created at process start
/// and torn down, with all frames reclaimed, at process exit.
pub struct AddressSpace {
    page_size: usize,
    pub(crate) page_table: PageTable,
    areas: Vec<VirtualArea>,
    pub(crate) regions: RegionTable,
    pub(crate) fifo: FifoTracker,
}

impl AddressSpace {
    /// Area 0 always exists; it starts empty and grows on demand.
    pub fn new(page_size: usize, max_pages: usize, region_capacity: usize) -> Self {
        assert!(page_size > 0, "Page size must be nonzero");
        Self {
            page_size,
            page_table: PageTable::new(max_pages),
            areas: vec![VirtualArea::new(0, 0, 0)],
            regions: RegionTable::new(region_capacity),
            fifo: FifoTracker::new(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn max_pages(&self) -> usize {
        self.page_table.len()
    }

    /// Total addressable bytes across all pages.
    pub fn address_span(&self) -> u64 {
        (self.max_pages() * self.page_size) as u64
    }

    pub fn decompose(&self, addr: u64) -> (u64, u64) {
        (
            addr / self.page_size as u64,
            addr % self.page_size as u64,
        )
    }

    /// Registers an additional area. Areas never overlap.
    pub fn add_area(&mut self, id: usize, start: u64, end: u64) -> Result<(), AccessError> {
        if start >= end || end > self.address_span() {
            return Err(AccessError::InvalidAddress);
        }
        let overlaps = self
            .areas
            .iter()
            .any(|a| a.id() == id || (start < a.end() && a.start() < end));
        if overlaps {
            return Err(AccessError::InvalidAddress);
        }
        self.areas.push(VirtualArea::new(id, start, end));
        Ok(())
    }

    pub fn area(&self, id: usize) -> Result<&VirtualArea, AccessError> {
        self.areas
            .iter()
            .find(|a| a.id() == id)
            .ok_or(AccessError::InvalidAddress)
    }

    pub fn area_mut(&mut self, id: usize) -> Result<&mut VirtualArea, AccessError> {
        self.areas
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or(AccessError::InvalidAddress)
    }

    /// The area whose range contains the given region.
    pub fn owning_area_mut(&mut self, region: &Region) -> Option<&mut VirtualArea> {
        self.areas.iter_mut().find(|a| a.contains(region))
    }

    /// How far an area may grow before it would run into the next area or
    /// the end of the page table.
    pub fn growth_limit(&self, id: usize) -> Result<u64, AccessError> {
        let end = self.area(id)?.end();
        let limit = self
            .areas
            .iter()
            .filter(|a| a.id() != id && a.start() >= end)
            .map(|a| a.start())
            .min()
            .unwrap_or(self.address_span());
        Ok(limit)
    }

    pub fn region(&self, id: usize) -> Result<Option<Region>, AccessError> {
        self.regions.get(id)
    }

    pub fn page_entry(&self, pgn: usize) -> Result<crate::page_table::PageTableEntry, AccessError> {
        self.page_table.entry(pgn)
    }

    pub fn fifo_snapshot(&self) -> Vec<u64> {
        self.fifo.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_zero_exists_and_is_empty() {
        let mm = AddressSpace::new(4, 16, 8);
        let area = mm.area(0).unwrap();
        assert_eq!(area.start(), 0);
        assert_eq!(area.end(), 0);
        assert_eq!(mm.area(1).unwrap_err(), AccessError::InvalidAddress);
    }

    #[test]
    fn decompose_splits_page_and_offset() {
        let mm = AddressSpace::new(4, 16, 8);
        assert_eq!(mm.decompose(0), (0, 0));
        assert_eq!(mm.decompose(7), (1, 3));
        assert_eq!(mm.decompose(12), (3, 0));
    }

    #[test]
    fn overlapping_area_is_rejected() {
        let mut mm = AddressSpace::new(4, 16, 8);
        mm.add_area(1, 16, 32).unwrap();
        assert_eq!(mm.add_area(2, 24, 40), Err(AccessError::InvalidAddress));
        assert_eq!(mm.add_area(1, 40, 48), Err(AccessError::InvalidAddress));
        assert_eq!(mm.add_area(2, 8, 8), Err(AccessError::InvalidAddress));
        mm.add_area(2, 40, 48).unwrap();
    }

    #[test]
    fn growth_limit_stops_at_the_next_area() {
        let mut mm = AddressSpace::new(4, 16, 8);
        mm.add_area(1, 32, 40).unwrap();
        assert_eq!(mm.growth_limit(0).unwrap(), 32);
        assert_eq!(mm.growth_limit(1).unwrap(), 64);
    }
}
