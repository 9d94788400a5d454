//! # DOS 3.3 directory structures
//! These are fixed length structures, with the DiskStruct trait.

use binrw::{BinRead,BinWrite};

// Note on large volumes:
// We can extend VTOC.bitmap to 200 bytes, allowing for VTOC.tracks = 50.
// We can extend VTOC.sectors to 32, because the bitmap allocates 32 bits per track.
// This gives 50*32*256 = 409600, i.e., a 400K disk.
// Large DOS volumes were supported on 800K floppies and hard drives by a few third parties.

#[derive(BinRead,BinWrite,Clone)]
#[brw(little)]
pub struct VTOC {
    pub pad1: u8,
    pub track1: u8,
    pub sector1: u8,
    pub version: u8,
    pub pad2: [u8;2],
    pub vol: u8,
    pub pad3: [u8;32],
    pub max_pairs: u8,
    pub pad4: [u8;8],
    pub last_track: u8,
    pub last_direction: u8,
    pub pad5: [u8;2],
    pub tracks: u8,
    pub sectors: u8,
    pub bytes: [u8;2],
    /// 4 bytes per track, big endian, set bit is a free sector
    pub bitmap: [u8;200]
}
crate::disk_struct!(VTOC);

impl VTOC {
    pub fn new() -> Self {
        Self {
            pad1: 0,
            track1: 0,
            sector1: 0,
            version: 0,
            pad2: [0;2],
            vol: 0,
            pad3: [0;32],
            max_pairs: 0,
            pad4: [0;8],
            last_track: 0,
            last_direction: 0,
            pad5: [0;2],
            tracks: 0,
            sectors: 0,
            bytes: [0;2],
            bitmap: [0;200]
        }
    }
}

#[derive(BinRead,BinWrite,Clone)]
#[brw(little)]
pub struct TrackSectorList {
    pub pad1: u8,
    pub next_track: u8,
    pub next_sector: u8,
    pub pad2: [u8;2],
    pub sector_base: [u8;2],
    pub pad3: [u8;5],
    pub pairs: [u8;244]
}
crate::disk_struct!(TrackSectorList);

impl TrackSectorList {
    pub fn new() -> Self {
        Self {
            pad1: 0,
            next_track: 0,
            next_sector: 0,
            pad2: [0;2],
            sector_base: [0;2],
            pad3: [0;5],
            pairs: [0;244]
        }
    }
}

#[derive(BinRead,BinWrite,Clone)]
#[brw(little)]
pub struct DirectoryEntry {
    /// 0 if never used, 255 if deleted
    pub tsl_track: u8,
    pub tsl_sector: u8,
    pub file_type: u8,
    /// negative ASCII padded with negative spaces, for a deleted file the last byte holds the old `tsl_track`
    pub name: [u8;30],
    pub sectors: [u8;2]
}

impl DirectoryEntry {
    pub fn new() -> Self {
        Self {
            tsl_track: 0,
            tsl_sector: 0,
            file_type: 0,
            name: [0;30],
            sectors: [0;2]
        }
    }
    pub fn is_active(&self) -> bool {
        self.tsl_track>0 && self.tsl_track<255
    }
    pub fn is_deleted(&self) -> bool {
        self.tsl_track==255
    }
}

#[derive(BinRead,BinWrite,Clone)]
#[brw(little)]
pub struct DirectorySector {
    pub pad1: u8,
    pub next_track: u8,
    pub next_sector: u8,
    pub pad2: [u8;8],
    pub entries: [DirectoryEntry;7]
}
crate::disk_struct!(DirectorySector);

impl DirectorySector {
    pub fn new() -> Self {
        Self {
            pad1: 0,
            next_track: 0,
            next_sector: 0,
            pad2: [0;8],
            entries: [
                DirectoryEntry::new(),
                DirectoryEntry::new(),
                DirectoryEntry::new(),
                DirectoryEntry::new(),
                DirectoryEntry::new(),
                DirectoryEntry::new(),
                DirectoryEntry::new()
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiskStruct;

    #[test]
    fn structure_sizes() {
        assert_eq!(VTOC::new().to_bytes().len(),256);
        assert_eq!(TrackSectorList::new().to_bytes().len(),256);
        assert_eq!(DirectorySector::new().to_bytes().len(),256);
    }

    #[test]
    fn bitmap_offset() {
        let mut vtoc = VTOC::new();
        vtoc.bitmap[0] = 0xff;
        vtoc.vol = 254;
        let buf = vtoc.to_bytes();
        assert_eq!(buf[0x38],0xff);
        assert_eq!(buf[0x06],254);
        let back = VTOC::from_bytes(&buf).expect("could not parse");
        assert_eq!(back.vol,254);
    }
}
