//! Presentation-only dumps of the translation structures. Nothing here is
//! part of the correctness contract.

use std::fmt::Write as _;

use crate::address_space::AddressSpace;
use crate::page_table::PageTableEntry;

// Width of the second-level index in the derived directory view.
const DIRECTORY_BITS: usize = 8;

/// Encoded page-table words for every mapped page, one per line.
pub fn page_table_dump(mm: &AddressSpace) -> String {
    let mut out = String::new();
    writeln!(out, "===== PAGE TABLE =====").unwrap();
    for (pgn, entry) in mm.page_table.iter() {
        if entry != PageTableEntry::Unmapped {
            writeln!(out, "{:08x}: {:08x}", pgn, entry.encode()).unwrap();
        }
    }
    out
}

/// Page-to-frame lines for resident pages, grouped through a two-level
/// directory view. The view is derived from the canonical entry array on
/// every call, so it can never diverge from it.
pub fn mapping_dump(mm: &AddressSpace) -> String {
    let mut out = String::new();
    writeln!(out, "===== PAGE -> FRAME =====").unwrap();
    for (first_lv, pages) in directory(mm) {
        for (second_lv, frame) in pages {
            let pgn = (first_lv << DIRECTORY_BITS) | second_lv;
            writeln!(out, "Page Number: {} -> Frame Number: {}", pgn, frame).unwrap();
        }
    }
    out
}

/// Two-level (directory index, table index) view of the resident mappings.
fn directory(mm: &AddressSpace) -> Vec<(usize, Vec<(usize, u32)>)> {
    let mut levels: Vec<(usize, Vec<(usize, u32)>)> = Vec::new();
    for (pgn, entry) in mm.page_table.iter() {
        let frame = match entry {
            PageTableEntry::Resident { frame } => frame,
            _ => continue,
        };
        let first_lv = pgn >> DIRECTORY_BITS;
        let second_lv = pgn & ((1 << DIRECTORY_BITS) - 1);
        match levels.iter_mut().find(|(lv, _)| *lv == first_lv) {
            Some((_, pages)) => pages.push((second_lv, frame)),
            None => levels.push((first_lv, vec![(second_lv, frame)])),
        }
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_follow_the_canonical_table() {
        let mut mm = AddressSpace::new(4, 16, 4);
        mm.page_table.set_resident(2, 1).unwrap();
        mm.page_table.set_swapped(3, 0, 5).unwrap();

        let mapping = mapping_dump(&mm);
        assert!(mapping.contains("Page Number: 2 -> Frame Number: 1"));
        // Swapped pages are not resident mappings.
        assert!(!mapping.contains("Page Number: 3"));

        let table = page_table_dump(&mm);
        assert_eq!(table.lines().count(), 3);

        // A mapping update is visible on the next dump with no second
        // structure to refresh.
        mm.page_table.set_resident(3, 0).unwrap();
        assert!(mapping_dump(&mm).contains("Page Number: 3 -> Frame Number: 0"));
    }
}
