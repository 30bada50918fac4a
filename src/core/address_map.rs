//! Mapping between file offsets and 65xx addresses.
//!
//! A byte image is loaded into one or more address regions. Each region
//! covers a contiguous span of file offsets and starts at a base address.
//! Regions are stored in offset order and together cover the whole image, so
//! every offset has exactly one address. The reverse is not true: two regions
//! may load at the same address (overlays, bank switching), in which case the
//! region holding the referencing instruction is preferred.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Glaurung65Error, Result};

/// One address region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressMapEntry {
    /// First file offset covered by the region
    pub offset: usize,
    /// Number of bytes in the region
    pub length: usize,
    /// Address of the byte at `offset`
    pub address: u32,
}

impl AddressMapEntry {
    pub fn new(offset: usize, length: usize, address: u32) -> Self {
        AddressMapEntry {
            offset,
            length,
            address,
        }
    }

    fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.offset && offset < self.offset + self.length
    }

    fn contains_address(&self, address: u32) -> bool {
        address >= self.address && ((address - self.address) as usize) < self.length
    }
}

/// Ordered, contiguous set of address regions covering an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressMap {
    entries: Vec<AddressMapEntry>,
    total_length: usize,
}

impl AddressMap {
    /// Create a map from a list of regions.
    ///
    /// # Arguments
    /// * `total_length` - Length of the byte image
    /// * `entries` - Regions in offset order
    ///
    /// # Errors
    /// Returns an error if the list is empty, a region is empty, the regions
    /// leave a gap or overlap, or they do not end at `total_length`.
    pub fn new(total_length: usize, entries: Vec<AddressMapEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Glaurung65Error::InvalidAddressMap(
                "no regions defined".to_string(),
            ));
        }
        let mut expected = 0usize;
        for ent in &entries {
            if ent.length == 0 {
                return Err(Glaurung65Error::InvalidAddressMap(format!(
                    "empty region at +{:06x}",
                    ent.offset
                )));
            }
            if ent.offset != expected {
                return Err(Glaurung65Error::InvalidAddressMap(format!(
                    "region at +{:06x} should start at +{:06x}",
                    ent.offset, expected
                )));
            }
            if ent.address as u64 + ent.length as u64 > 0x0100_0000 {
                return Err(Glaurung65Error::InvalidAddressMap(format!(
                    "region at +{:06x} runs past the end of the 24-bit address space",
                    ent.offset
                )));
            }
            expected += ent.length;
        }
        if expected != total_length {
            return Err(Glaurung65Error::InvalidAddressMap(format!(
                "regions cover {} bytes, image is {}",
                expected, total_length
            )));
        }
        Ok(AddressMap {
            entries,
            total_length,
        })
    }

    /// Map the whole image at a single base address.
    pub fn single(total_length: usize, address: u32) -> Result<Self> {
        AddressMap::new(total_length, vec![AddressMapEntry::new(0, total_length, address)])
    }

    pub fn entries(&self) -> &[AddressMapEntry] {
        &self.entries
    }

    pub fn total_length(&self) -> usize {
        self.total_length
    }

    fn entry_for_offset(&self, offset: usize) -> Option<&AddressMapEntry> {
        if offset >= self.total_length {
            return None;
        }
        let idx = self.entries.partition_point(|e| e.offset + e.length <= offset);
        self.entries.get(idx)
    }

    /// Address of the byte at `offset`.
    pub fn offset_to_address(&self, offset: usize) -> Option<u32> {
        self.entry_for_offset(offset)
            .map(|e| e.address + (offset - e.offset) as u32)
    }

    /// File offset that holds `address`, as seen from the byte at `src_offset`.
    ///
    /// The region containing `src_offset` is checked first; after that the
    /// regions are checked in order and the first match wins.
    pub fn address_to_offset(&self, src_offset: usize, address: u32) -> Option<usize> {
        if let Some(ent) = self.entry_for_offset(src_offset) {
            if ent.contains_address(address) {
                return Some(ent.offset + (address - ent.address) as usize);
            }
        }
        self.entries
            .iter()
            .find(|e| e.contains_address(address))
            .map(|e| e.offset + (address - e.address) as usize)
    }

    /// True if `offset..offset+length` lies inside a single region.
    pub fn is_range_unbroken(&self, offset: usize, length: usize) -> bool {
        if length == 0 {
            return false;
        }
        match self.entry_for_offset(offset) {
            Some(ent) => ent.contains_offset(offset + length - 1),
            None => false,
        }
    }

    /// True if the addresses of `offset..offset+length` increase by one at
    /// every byte, even when the range spans regions.
    pub fn is_single_addr_range(&self, offset: usize, length: usize) -> bool {
        if length == 0 || offset + length > self.total_length {
            return false;
        }
        let Some(base) = self.offset_to_address(offset) else {
            return false;
        };
        let mut idx = self.entries.partition_point(|e| e.offset + e.length <= offset);
        while let Some(ent) = self.entries.get(idx) {
            if ent.offset >= offset + length {
                break;
            }
            if ent.offset > offset
                && ent.address != base.wrapping_add((ent.offset - offset) as u32)
            {
                return false;
            }
            idx += 1;
        }
        true
    }

    /// True if `offset` is the first byte of a region.
    pub fn is_region_start(&self, offset: usize) -> bool {
        self.entries
            .binary_search_by_key(&offset, |e| e.offset)
            .is_ok()
    }

    /// Offsets at which a region starts.
    pub fn region_starts(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|e| e.offset)
    }
}

impl fmt::Display for AddressMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddressMap[")?;
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "+{:06x}..+{:06x}=${:04x}", e.offset, e.offset + e.length, e.address)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_regions() -> AddressMap {
        // $1000-$10ff from +0, then $2000-$20ff from +0x100
        AddressMap::new(
            0x200,
            vec![
                AddressMapEntry::new(0, 0x100, 0x1000),
                AddressMapEntry::new(0x100, 0x100, 0x2000),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_validation() {
        assert!(AddressMap::new(0x10, vec![]).is_err());
        assert!(AddressMap::new(0x10, vec![AddressMapEntry::new(0, 0x08, 0x1000)]).is_err());
        assert!(AddressMap::new(
            0x10,
            vec![
                AddressMapEntry::new(0, 0x08, 0x1000),
                AddressMapEntry::new(0x09, 0x07, 0x2000),
            ]
        )
        .is_err());
        assert!(AddressMap::single(0x10, 0xfffff8).is_err());
        assert!(AddressMap::single(0x10, 0x1000).is_ok());
    }

    #[test]
    fn test_offset_to_address() {
        let map = two_regions();
        assert_eq!(map.offset_to_address(0), Some(0x1000));
        assert_eq!(map.offset_to_address(0xff), Some(0x10ff));
        assert_eq!(map.offset_to_address(0x100), Some(0x2000));
        assert_eq!(map.offset_to_address(0x200), None);
    }

    #[test]
    fn test_address_to_offset() {
        let map = two_regions();
        assert_eq!(map.address_to_offset(0, 0x2010), Some(0x110));
        assert_eq!(map.address_to_offset(0, 0x1010), Some(0x10));
        assert_eq!(map.address_to_offset(0, 0x3000), None);
    }

    #[test]
    fn test_address_to_offset_prefers_source_region() {
        // two overlays both loaded at $4000
        let map = AddressMap::new(
            0x20,
            vec![
                AddressMapEntry::new(0, 0x10, 0x4000),
                AddressMapEntry::new(0x10, 0x10, 0x4000),
            ],
        )
        .unwrap();
        assert_eq!(map.address_to_offset(0x02, 0x4004), Some(0x04));
        assert_eq!(map.address_to_offset(0x12, 0x4004), Some(0x14));
    }

    #[test]
    fn test_range_checks() {
        let map = two_regions();
        assert!(map.is_range_unbroken(0xfd, 3));
        assert!(!map.is_range_unbroken(0xfe, 3));
        assert!(!map.is_single_addr_range(0xfe, 3));

        let contiguous = AddressMap::new(
            0x20,
            vec![
                AddressMapEntry::new(0, 0x10, 0x1000),
                AddressMapEntry::new(0x10, 0x10, 0x1010),
            ],
        )
        .unwrap();
        assert!(!contiguous.is_range_unbroken(0x0e, 4));
        assert!(contiguous.is_single_addr_range(0x0e, 4));
        assert!(contiguous.is_region_start(0x10));
        assert!(!contiguous.is_region_start(0x11));
        assert_eq!(contiguous.region_starts().collect::<Vec<_>>(), vec![0, 0x10]);
    }
}
