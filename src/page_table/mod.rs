mod entry;

pub use entry::PageTableEntry;

use crate::AccessError;

/// Per-process translation table, one entry per virtual page number. The
/// entry array is the single canonical structure; the two-level view used by
/// the mapping dump is derived from it on demand.
pub struct PageTable {
    entries: Vec<PageTableEntry>,
}

impl PageTable {
    pub fn new(max_pages: usize) -> Self {
        Self {
            entries: vec![PageTableEntry::Unmapped; max_pages],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, pgn: usize) -> Result<PageTableEntry, AccessError> {
        self.entries
            .get(pgn)
            .copied()
            .ok_or(AccessError::InvalidAddress)
    }

    /// Marks a page as backed by a RAM frame, clearing any swap location.
    pub fn set_resident(&mut self, pgn: usize, frame: u32) -> Result<(), AccessError> {
        let slot = self
            .entries
            .get_mut(pgn)
            .ok_or(AccessError::InvalidAddress)?;
        *slot = PageTableEntry::Resident { frame };
        Ok(())
    }

    /// Marks a page as backed by a frame on a swap device.
    pub fn set_swapped(&mut self, pgn: usize, device: u32, frame: u32) -> Result<(), AccessError> {
        let slot = self
            .entries
            .get_mut(pgn)
            .ok_or(AccessError::InvalidAddress)?;
        *slot = PageTableEntry::Swapped { device, frame };
        Ok(())
    }

    pub fn clear(&mut self, pgn: usize) {
        if let Some(slot) = self.entries.get_mut(pgn) {
            *slot = PageTableEntry::Unmapped;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, PageTableEntry)> + '_ {
        self.entries.iter().copied().enumerate()
    }
}
