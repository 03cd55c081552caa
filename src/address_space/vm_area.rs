/// A `[start, end)` byte range inside a virtual area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: u64,
    pub end: u64,
}

impl Region {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A contiguous sub-range of a process's virtual address space with its own
/// free-region list. Sub-allocation is first-fit; released regions are never
/// merged with their neighbours, so the free list fragments over time. That
/// is an accepted limitation.
#[derive(Debug)]
pub struct VirtualArea {
    id: usize,
    start: u64,
    end: u64,
    sbrk: u64,
    free_list: Vec<Region>,
}

impl VirtualArea {
    pub fn new(id: usize, start: u64, end: u64) -> Self {
        let free_list = if start < end {
            vec![Region::new(start, end)]
        } else {
            Vec::new()
        };
        Self {
            id,
            start,
            end,
            sbrk: end,
            free_list,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn sbrk(&self) -> u64 {
        self.sbrk
    }

    /// First-fit scan of the free list. The returned region is the front
    /// `size` bytes of the first hole that is large enough; the remainder
    /// shrinks in place, or the hole is removed when consumed exactly.
    pub fn allocate(&mut self, size: u64) -> Option<Region> {
        let pos = self.free_list.iter().position(|r| r.len() >= size)?;
        let hole = &mut self.free_list[pos];
        let region = Region::new(hole.start, hole.start + size);
        hole.start += size;
        if hole.is_empty() {
            self.free_list.remove(pos);
        }
        Some(region)
    }

    /// Pushes a region back onto the free-list head. No coalescing.
    pub fn release(&mut self, region: Region) {
        debug_assert!(region.start < region.end);
        self.free_list.insert(0, region);
    }

    /// Extends the addressable range. The caller guarantees `new_end` keeps
    /// areas non-overlapping.
    pub fn grow_to(&mut self, new_end: u64) {
        debug_assert!(new_end >= self.end);
        self.end = new_end;
        self.sbrk = new_end;
    }

    /// Rolls a failed growth back to the previous bound.
    pub(crate) fn shrink_to(&mut self, old_end: u64) {
        debug_assert!(old_end <= self.end);
        self.end = old_end;
        self.sbrk = old_end;
    }

    pub fn contains(&self, region: &Region) -> bool {
        region.start >= self.start && region.end <= self.end
    }

    pub fn free_bytes(&self) -> u64 {
        self.free_list.iter().map(Region::len).sum()
    }

    pub fn free_list_len(&self) -> usize {
        self.free_list.len()
    }
}
