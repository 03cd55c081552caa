use crate::AccessError;

use super::vm_area::Region;

/// Fixed-capacity table mapping small integer region ids to allocated
/// regions. A vacant slot means the id is currently unassigned.
pub struct RegionTable {
    slots: Vec<Option<Region>>,
}

impl RegionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn check_id(&self, id: usize) -> Result<(), AccessError> {
        if id >= self.slots.len() {
            return Err(AccessError::InvalidRegionId);
        }
        Ok(())
    }

    pub fn get(&self, id: usize) -> Result<Option<Region>, AccessError> {
        self.check_id(id)?;
        Ok(self.slots[id])
    }

    pub fn put(&mut self, id: usize, region: Region) -> Result<(), AccessError> {
        self.check_id(id)?;
        self.slots[id] = Some(region);
        Ok(())
    }

    /// Clears the slot and hands the region back. An already-vacant slot is
    /// a rejected double free, never a silent success.
    pub fn take(&mut self, id: usize) -> Result<Region, AccessError> {
        self.check_id(id)?;
        self.slots[id].take().ok_or(AccessError::NotAllocated)
    }
}
