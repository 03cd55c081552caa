/// Translation state of one virtual page. A page is backed either by a RAM
/// frame or by a frame on a swap device, never both at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTableEntry {
    Unmapped,
    Resident { frame: u32 },
    Swapped { device: u32, frame: u32 },
}

// Packed word layout:
// | resident: 1 | swapped: 1 | device: 5 | payload: 25 |
// Resident entries keep the RAM frame number in the payload, swapped entries
// the frame number on the swap device. An unmapped entry is the zero word.
const RESIDENT_BIT: u32 = 1 << 31;
const SWAPPED_BIT: u32 = 1 << 30;
const DEVICE_SHIFT: u32 = 25;
const DEVICE_MASK: u32 = 0x1f;
const PAYLOAD_MASK: u32 = (1 << 25) - 1;

impl PageTableEntry {
    /// Packs the entry into its on-table word. Everything outside this pair
    /// of functions works on the tagged state.
    pub fn encode(&self) -> u32 {
        match self {
            PageTableEntry::Unmapped => 0,
            PageTableEntry::Resident { frame } => RESIDENT_BIT | (frame & PAYLOAD_MASK),
            PageTableEntry::Swapped { device, frame } => {
                SWAPPED_BIT | ((device & DEVICE_MASK) << DEVICE_SHIFT) | (frame & PAYLOAD_MASK)
            }
        }
    }

    pub fn decode(word: u32) -> Self {
        if word & RESIDENT_BIT != 0 {
            PageTableEntry::Resident {
                frame: word & PAYLOAD_MASK,
            }
        } else if word & SWAPPED_BIT != 0 {
            PageTableEntry::Swapped {
                device: (word >> DEVICE_SHIFT) & DEVICE_MASK,
                frame: word & PAYLOAD_MASK,
            }
        } else {
            PageTableEntry::Unmapped
        }
    }

    pub fn is_resident(&self) -> bool {
        matches!(self, PageTableEntry::Resident { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_encodes_to_zero_word() {
        assert_eq!(PageTableEntry::Unmapped.encode(), 0);
        assert_eq!(PageTableEntry::decode(0), PageTableEntry::Unmapped);
    }

    #[test]
    fn resident_round_trip() {
        let entry = PageTableEntry::Resident { frame: 1337 };
        assert_eq!(PageTableEntry::decode(entry.encode()), entry);
        assert!(entry.encode() & RESIDENT_BIT != 0);
        assert!(entry.encode() & SWAPPED_BIT == 0);
    }

    #[test]
    fn swapped_round_trip() {
        let entry = PageTableEntry::Swapped {
            device: 3,
            frame: 42,
        };
        assert_eq!(PageTableEntry::decode(entry.encode()), entry);
        assert!(entry.encode() & RESIDENT_BIT == 0);
    }

    #[test]
    fn states_are_mutually_exclusive() {
        let resident = PageTableEntry::Resident { frame: 7 }.encode();
        let swapped = PageTableEntry::Swapped { device: 1, frame: 7 }.encode();
        assert_ne!(resident, swapped);
        assert!(PageTableEntry::decode(resident).is_resident());
        assert!(!PageTableEntry::decode(swapped).is_resident());
    }
}
