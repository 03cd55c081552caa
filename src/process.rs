use std::sync::{Mutex, MutexGuard};

use device::FramePool;

use crate::address_space::AddressSpace;

/// Handle to a simulated process as seen by the memory manager: its address
/// space, its RAM device and the currently active swap device. The manager
/// only reads these fields; creation and teardown belong to the simulator.
pub struct Process {
    pid: u32,
    mm: Mutex<AddressSpace>,
    ram: FramePool,
    swap: FramePool,
    swap_id: u32,
}

impl Process {
    pub fn new(pid: u32, mm: AddressSpace, ram: FramePool, swap: FramePool, swap_id: u32) -> Self {
        assert_eq!(
            ram.frame_size(),
            mm.page_size(),
            "RAM frame size must match the page size"
        );
        assert_eq!(
            swap.frame_size(),
            mm.page_size(),
            "Swap frame size must match the page size"
        );
        Self {
            pid,
            mm: Mutex::new(mm),
            ram,
            swap,
            swap_id,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// The inner mutex is only ever taken while the manager's global lock is
    /// held, so it is never contended; it exists to give shared `Process`
    /// handles interior mutability.
    pub fn mm(&self) -> MutexGuard<'_, AddressSpace> {
        self.mm.lock().unwrap()
    }

    pub fn ram(&self) -> &FramePool {
        &self.ram
    }

    pub fn swap(&self) -> &FramePool {
        &self.swap
    }

    pub fn swap_id(&self) -> u32 {
        self.swap_id
    }
}
