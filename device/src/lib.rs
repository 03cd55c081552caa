use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use log::{debug, info};

#[derive(Debug, PartialEq)]
pub enum DeviceError {
    DeviceFull,
    OverCapacity,
}

struct PoolState {
    buffer: Vec<u8>,
    free_list: Vec<u32>,
    used_list: Vec<UsedFrame>,
}

struct UsedFrame {
    fpn: u32,
    owner: u32,
}

/// A fixed-capacity byte storage device (RAM or a swap device) divided into
/// frames. Frames live on exactly one of the free list or the used list;
/// a used frame records the pid of the owning address space.
#[derive(Clone)]
pub struct FramePool {
    name: String,
    frame_size: usize,
    capacity: usize,
    state: Arc<Mutex<PoolState>>,
}

impl FramePool {
    pub fn new(name: &str, frame_size: usize, capacity: usize) -> Self {
        assert!(frame_size > 0, "Frame size must be nonzero");
        assert_eq!(
            capacity % frame_size,
            0,
            "Capacity must be a multiply of frame size"
        );
        let frame_count = capacity / frame_size;
        // Free-list head is the lowest-numbered frame.
        let free_list = (0..frame_count as u32).rev().collect();
        info!(
            "Device {}: {} frames of {} bytes",
            name, frame_count, frame_size
        );
        Self {
            name: String::from(name),
            frame_size,
            capacity,
            state: Arc::new(Mutex::new(PoolState {
                buffer: vec![0; capacity],
                free_list,
                used_list: Vec::new(),
            })),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn frame_count(&self) -> usize {
        self.capacity / self.frame_size
    }

    pub fn free_frames(&self) -> usize {
        self.state.lock().unwrap().free_list.len()
    }

    pub fn used_frames(&self) -> usize {
        self.state.lock().unwrap().used_list.len()
    }

    pub fn acquire_frame(&self, owner: u32) -> Result<u32, DeviceError> {
        let mut state = self.state.lock().unwrap();
        let fpn = state.free_list.pop().ok_or(DeviceError::DeviceFull)?;
        state.used_list.push(UsedFrame { fpn, owner });
        debug!("Device {}: frame[{}] acquired by pid {}", self.name, fpn, owner);
        Ok(fpn)
    }

    /// Returns a frame to the free-list head. The frame is zeroed so that
    /// reassignment is deterministic. Frames that are out of range or not on
    /// the used list are ignored; a frame lives on exactly one list.
    pub fn release_frame(&self, fpn: u32) {
        let start = fpn as usize * self.frame_size;
        if start + self.frame_size > self.capacity {
            debug!(
                "Device {}: release of out-of-range frame[{}] ignored",
                self.name, fpn
            );
            return;
        }
        let mut state = self.state.lock().unwrap();
        let used_before = state.used_list.len();
        state.used_list.retain(|f| f.fpn != fpn);
        if state.used_list.len() == used_before {
            debug!(
                "Device {}: release of free frame[{}] ignored",
                self.name, fpn
            );
            return;
        }
        state.buffer[start..start + self.frame_size].fill(0);
        state.free_list.push(fpn);
        debug!("Device {}: frame[{}] released", self.name, fpn);
    }

    /// Acquires `count` frames. If the pool runs out partway, every frame
    /// acquired by this call is released again and nothing stays outstanding.
    pub fn allocate_range(&self, count: usize, owner: u32) -> Result<Vec<u32>, DeviceError> {
        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            match self.acquire_frame(owner) {
                Ok(fpn) => frames.push(fpn),
                Err(e) => {
                    for fpn in frames {
                        self.release_frame(fpn);
                    }
                    debug!("Device {}: range of {} frames unavailable", self.name, count);
                    return Err(e);
                }
            }
        }
        Ok(frames)
    }

    pub fn owner_of(&self, fpn: u32) -> Option<u32> {
        let state = self.state.lock().unwrap();
        state.used_list.iter().find(|f| f.fpn == fpn).map(|f| f.owner)
    }

    fn check_address(&self, address: u64) -> Result<(), DeviceError> {
        if address as usize >= self.capacity {
            return Err(DeviceError::OverCapacity);
        }
        Ok(())
    }

    pub fn read_u8(&self, address: u64) -> Result<u8, DeviceError> {
        self.check_address(address)?;
        let state = self.state.lock().unwrap();
        Ok(state.buffer[address as usize])
    }

    pub fn write_u8(&self, address: u64, byte: u8) -> Result<(), DeviceError> {
        self.check_address(address)?;
        let mut state = self.state.lock().unwrap();
        state.buffer[address as usize] = byte;
        Ok(())
    }

    pub fn zero_frame(&self, fpn: u32) -> Result<(), DeviceError> {
        let start = fpn as usize * self.frame_size;
        if start + self.frame_size > self.capacity {
            return Err(DeviceError::OverCapacity);
        }
        let mut state = self.state.lock().unwrap();
        state.buffer[start..start + self.frame_size].fill(0);
        Ok(())
    }

    /// Raw device dump, one line per frame holding a non-zero byte.
    /// Presentation only.
    pub fn dump(&self) -> String {
        let state = self.state.lock().unwrap();
        let mut out = String::new();
        writeln!(out, "===== {} DUMP =====", self.name).unwrap();
        for (addr, byte) in state.buffer.iter().enumerate() {
            if *byte != 0 {
                writeln!(out, "BYTE {:08x}: {}", addr, byte).unwrap();
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_pops_lowest_frame_first() {
        let pool = FramePool::new("ram", 4, 16);
        assert_eq!(pool.acquire_frame(1), Ok(0));
        assert_eq!(pool.acquire_frame(1), Ok(1));
        assert_eq!(pool.free_frames(), 2);
        assert_eq!(pool.used_frames(), 2);
    }

    #[test]
    fn acquire_when_empty_fails() {
        let pool = FramePool::new("ram", 4, 8);
        pool.acquire_frame(1).unwrap();
        pool.acquire_frame(1).unwrap();
        assert_eq!(pool.acquire_frame(1), Err(DeviceError::DeviceFull));
    }

    #[test]
    fn release_returns_frame_to_head() {
        let pool = FramePool::new("ram", 4, 8);
        let fpn = pool.acquire_frame(1).unwrap();
        pool.acquire_frame(1).unwrap();
        pool.release_frame(fpn);
        assert_eq!(pool.acquire_frame(2), Ok(fpn));
        assert_eq!(pool.owner_of(fpn), Some(2));
    }

    #[test]
    fn release_zeroes_contents() {
        let pool = FramePool::new("ram", 4, 8);
        let fpn = pool.acquire_frame(1).unwrap();
        pool.write_u8(fpn as u64 * 4, 0xab).unwrap();
        pool.release_frame(fpn);
        assert_eq!(pool.read_u8(fpn as u64 * 4), Ok(0));
    }

    #[test]
    fn redundant_release_keeps_lists_consistent() {
        let pool = FramePool::new("ram", 4, 8);
        let fpn = pool.acquire_frame(1).unwrap();
        pool.release_frame(fpn);
        pool.release_frame(fpn);
        pool.release_frame(99);
        assert_eq!(pool.free_frames(), 2);
        assert_eq!(pool.used_frames(), 0);
        // Every frame can still be handed out exactly once.
        pool.acquire_frame(1).unwrap();
        pool.acquire_frame(2).unwrap();
        assert_eq!(pool.acquire_frame(3), Err(DeviceError::DeviceFull));
    }

    #[test]
    fn allocate_range_rolls_back_on_failure() {
        let pool = FramePool::new("ram", 4, 12);
        assert_eq!(
            pool.allocate_range(5, 1),
            Err(DeviceError::DeviceFull)
        );
        assert_eq!(pool.free_frames(), 3);
        assert_eq!(pool.used_frames(), 0);
        let mut frames = pool.allocate_range(3, 1).unwrap();
        frames.sort();
        assert_eq!(frames, vec![0, 1, 2]);
    }

    #[test]
    fn read_write_round_trip() {
        let pool = FramePool::new("ram", 4, 16);
        pool.write_u8(7, 0x12).unwrap();
        assert_eq!(pool.read_u8(7), Ok(0x12));
    }

    #[test]
    fn access_over_capacity_fails() {
        let pool = FramePool::new("ram", 4, 16);
        assert_eq!(pool.read_u8(16), Err(DeviceError::OverCapacity));
        assert_eq!(pool.write_u8(16, 1), Err(DeviceError::OverCapacity));
    }

    #[test]
    fn zero_frame_clears_only_that_frame() {
        let pool = FramePool::new("ram", 4, 16);
        pool.write_u8(3, 0xff).unwrap();
        pool.write_u8(4, 0xee).unwrap();
        pool.zero_frame(0).unwrap();
        assert_eq!(pool.read_u8(3), Ok(0));
        assert_eq!(pool.read_u8(4), Ok(0xee));
        assert_eq!(pool.zero_frame(4), Err(DeviceError::OverCapacity));
    }
}
