use device::{DeviceError, FramePool};

use crate::address_space::{AddressSpace, Region};

#[derive(Debug, PartialEq)]
pub enum DispatchError {
    OutOfAddressSpace,
    Device(DeviceError),
}

impl From<DeviceError> for DispatchError {
    fn from(e: DeviceError) -> Self {
        DispatchError::Device(e)
    }
}

/// Device-dispatch collaborator: address-space growth and raw physical I/O.
/// This is the seam the instruction interpreter (and tests) plug into.
///
/// Implementations are leaves with respect to the memory subsystem: the
/// manager's global lock is held across every call, so they must never call
/// back into it.
pub trait DeviceDispatch {
    /// Extends an area's addressable range by at least `size` bytes, rounded
    /// up to whole pages, and returns the newly addressable range. Growth is
    /// clamped so areas never overlap and never pass the end of the page
    /// table.
    fn grow_area(
        &self,
        mm: &mut AddressSpace,
        area_id: usize,
        size: u64,
    ) -> Result<Region, DispatchError>;

    /// Byte-for-byte frame transfer between two devices.
    fn copy_frame(
        &self,
        src: &FramePool,
        src_fpn: u32,
        dst: &FramePool,
        dst_fpn: u32,
    ) -> Result<(), DispatchError>;

    fn read_physical(&self, pool: &FramePool, address: u64) -> Result<u8, DispatchError>;

    fn write_physical(&self, pool: &FramePool, address: u64, byte: u8)
        -> Result<(), DispatchError>;
}

/// Stock dispatch backed directly by the `device` crate.
pub struct SystemDispatch;

impl DeviceDispatch for SystemDispatch {
    fn grow_area(
        &self,
        mm: &mut AddressSpace,
        area_id: usize,
        size: u64,
    ) -> Result<Region, DispatchError> {
        let page_size = mm.page_size() as u64;
        let aligned = (size + page_size - 1) / page_size * page_size;
        let limit = mm
            .growth_limit(area_id)
            .map_err(|_| DispatchError::OutOfAddressSpace)?;
        let area = mm
            .area_mut(area_id)
            .map_err(|_| DispatchError::OutOfAddressSpace)?;
        let old_end = area.end();
        let new_end = old_end + aligned;
        if aligned == 0 || new_end > limit {
            return Err(DispatchError::OutOfAddressSpace);
        }
        area.grow_to(new_end);
        log::debug!(
            "Area {} grown to [{}, {})",
            area_id,
            area.start(),
            new_end
        );
        Ok(Region::new(old_end, new_end))
    }

    fn copy_frame(
        &self,
        src: &FramePool,
        src_fpn: u32,
        dst: &FramePool,
        dst_fpn: u32,
    ) -> Result<(), DispatchError> {
        assert_eq!(src.frame_size(), dst.frame_size());
        let frame_size = src.frame_size() as u64;
        for cell in 0..frame_size {
            let byte = src.read_u8(src_fpn as u64 * frame_size + cell)?;
            dst.write_u8(dst_fpn as u64 * frame_size + cell, byte)?;
        }
        Ok(())
    }

    fn read_physical(&self, pool: &FramePool, address: u64) -> Result<u8, DispatchError> {
        Ok(pool.read_u8(address)?)
    }

    fn write_physical(
        &self,
        pool: &FramePool,
        address: u64,
        byte: u8,
    ) -> Result<(), DispatchError> {
        Ok(pool.write_u8(address, byte)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_rounds_up_to_whole_pages() {
        let mut mm = AddressSpace::new(4, 16, 4);
        let grown = SystemDispatch.grow_area(&mut mm, 0, 6).unwrap();
        assert_eq!(grown, Region::new(0, 8));
        assert_eq!(mm.area(0).unwrap().end(), 8);
        assert_eq!(mm.area(0).unwrap().sbrk(), 8);
    }

    #[test]
    fn grow_is_clamped_by_the_page_table() {
        let mut mm = AddressSpace::new(4, 4, 4);
        SystemDispatch.grow_area(&mut mm, 0, 16).unwrap();
        assert_eq!(
            SystemDispatch.grow_area(&mut mm, 0, 1),
            Err(DispatchError::OutOfAddressSpace)
        );
    }

    #[test]
    fn grow_is_clamped_by_the_next_area() {
        let mut mm = AddressSpace::new(4, 16, 4);
        mm.add_area(1, 8, 16).unwrap();
        assert!(SystemDispatch.grow_area(&mut mm, 0, 8).is_ok());
        assert_eq!(
            SystemDispatch.grow_area(&mut mm, 0, 4),
            Err(DispatchError::OutOfAddressSpace)
        );
    }

    #[test]
    fn copy_frame_moves_every_byte() {
        let ram = FramePool::new("ram", 4, 8);
        let swap = FramePool::new("swap", 4, 8);
        for cell in 0..4 {
            ram.write_u8(4 + cell, cell as u8 + 1).unwrap();
        }
        SystemDispatch.copy_frame(&ram, 1, &swap, 0).unwrap();
        for cell in 0..4 {
            assert_eq!(swap.read_u8(cell), Ok(cell as u8 + 1));
        }
    }
}
