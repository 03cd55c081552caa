//! Fault handling and page mapping: the eviction engine behind the access
//! primitives.

use log::debug;

use crate::address_space::{AddressSpace, Region};
use crate::page_table::PageTableEntry;
use crate::process::Process;
use crate::{AccessError, DeviceDispatch, MemoryManager};

impl<D: DeviceDispatch> MemoryManager<D> {
    /// Resolves a page number to a RAM frame. A `Resident` entry is an
    /// immediate hit; anything else takes the fault path.
    pub(crate) fn page_in(
        &self,
        mm: &mut AddressSpace,
        proc: &Process,
        pgn: u64,
    ) -> Result<u32, AccessError> {
        match mm.page_table.entry(pgn as usize)? {
            PageTableEntry::Resident { frame } => Ok(frame),
            entry => self.handle_fault(mm, proc, pgn, entry),
        }
    }

    /// FIFO eviction plus frame rotation. Runs to completion (or fatal
    /// failure) under the global lock; the dispatch calls inside are leaves.
    fn handle_fault(
        &self,
        mm: &mut AddressSpace,
        proc: &Process,
        pgn: u64,
        entry: PageTableEntry,
    ) -> Result<u32, AccessError> {
        let victim = mm.fifo.select_victim().unwrap_or_else(|| {
            // At least one page must be resident to fault against; an empty
            // tracker means the accounting has drifted from reality.
            panic!("page fault on page {} with no resident page to evict", pgn)
        });

        let swap_slot = match proc.swap().acquire_frame(proc.pid()) {
            Ok(fpn) => fpn,
            Err(_) => {
                mm.fifo.restore_oldest(victim);
                return Err(AccessError::OutOfSwapSpace);
            }
        };

        let victim_frame = match mm.page_table.entry(victim as usize)? {
            PageTableEntry::Resident { frame } => frame,
            other => panic!(
                "FIFO victim page {} is not resident ({:?})",
                victim, other
            ),
        };

        // Rotate: victim moves out to the freshly acquired swap slot, the
        // faulting page moves into the frame the victim vacated.
        self.dispatch
            .copy_frame(proc.ram(), victim_frame, proc.swap(), swap_slot)?;
        match entry {
            PageTableEntry::Swapped { frame: old_slot, .. } => {
                self.dispatch
                    .copy_frame(proc.swap(), old_slot, proc.ram(), victim_frame)?;
                proc.swap().release_frame(old_slot);
            }
            PageTableEntry::Unmapped => {
                // First touch: nothing to copy in, hand over a clean frame.
                proc.ram()
                    .zero_frame(victim_frame)
                    .map_err(AccessError::Device)?;
            }
            PageTableEntry::Resident { .. } => unreachable!("hit handled by page_in"),
        }

        mm.page_table
            .set_swapped(victim as usize, proc.swap_id(), swap_slot)?;
        mm.page_table.set_resident(pgn as usize, victim_frame)?;
        mm.fifo.record_load(pgn);

        debug!(
            "pid {}: page {} in at frame {}, page {} out to swap[{}]",
            proc.pid(),
            pgn,
            victim_frame,
            victim,
            swap_slot
        );
        Ok(victim_frame)
    }

    /// Maps a page-aligned range of freshly grown address space onto RAM
    /// frames. Either every page in the range ends up resident and tracked,
    /// or nothing is left allocated.
    pub(crate) fn map_page_range(
        &self,
        mm: &mut AddressSpace,
        proc: &Process,
        range: Region,
    ) -> Result<(), AccessError> {
        let page_size = mm.page_size() as u64;
        debug_assert_eq!(range.start % page_size, 0);
        debug_assert_eq!(range.end % page_size, 0);

        let first_pgn = range.start / page_size;
        let count = (range.len() / page_size) as usize;
        let frames = proc
            .ram()
            .allocate_range(count, proc.pid())
            .map_err(|_| AccessError::OutOfMemory)?;
        for (i, frame) in frames.into_iter().enumerate() {
            let pgn = first_pgn + i as u64;
            mm.page_table.set_resident(pgn as usize, frame)?;
            mm.fifo.record_load(pgn);
        }
        debug!(
            "pid {}: pages [{}, {}) mapped resident",
            proc.pid(),
            first_pgn,
            first_pgn + count as u64
        );
        Ok(())
    }
}
