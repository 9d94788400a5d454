//! # Submodule with Pascal directory elements
//! The header and the entries are fixed length structures with the DiskStruct trait.

use binrw::{BinRead,BinWrite};
use super::types::*;
use crate::DiskStruct;
use crate::DYNERR;

#[derive(BinRead,BinWrite,Clone)]
#[brw(little)]
pub struct VolDirHeader {
    /// points to the first boot block, not the header
    pub begin_block: [u8;2],
    pub end_block: [u8;2],
    pub file_type: [u8;2],
    /// LS 3 bits, max 7
    pub name_len: u8,
    pub name: [u8;7],
    pub total_blocks: [u8;2],
    pub num_files: [u8;2],
    pub last_access_date: [u8;2],
    pub last_set_date: [u8;2],
    pub pad: [u8;4]
}
crate::disk_struct!(VolDirHeader);

impl VolDirHeader {
    pub fn new() -> Self {
        Self {
            begin_block: [0;2],
            end_block: [0;2],
            file_type: [0;2],
            name_len: 0,
            name: [0;7],
            total_blocks: [0;2],
            num_files: [0;2],
            last_access_date: [0;2],
            last_set_date: [0;2],
            pad: [0;4]
        }
    }
    pub fn end_block(&self) -> usize {
        u16::from_le_bytes(self.end_block) as usize
    }
    pub fn total_blocks(&self) -> usize {
        u16::from_le_bytes(self.total_blocks) as usize
    }
    pub fn num_files(&self) -> usize {
        u16::from_le_bytes(self.num_files) as usize
    }
    pub fn set_num_files(&mut self,n: usize) {
        self.num_files = u16::to_le_bytes(n as u16);
    }
}

#[derive(BinRead,BinWrite,Clone,Copy)]
#[brw(little)]
pub struct DirectoryEntry {
    pub begin_block: [u8;2],
    /// first block after the file
    pub end_block: [u8;2],
    pub file_type: [u8;2],
    /// LS 4 bits, max 15
    pub name_len: u8,
    pub name: [u8;15],
    /// bytes used in the last block
    pub bytes_remaining: [u8;2],
    pub mod_date: [u8;2]
}
crate::disk_struct!(DirectoryEntry);

impl DirectoryEntry {
    pub fn new() -> Self {
        Self {
            begin_block: [0;2],
            end_block: [0;2],
            file_type: [0;2],
            name_len: 0,
            name: [0;15],
            bytes_remaining: [0;2],
            mod_date: [0;2]
        }
    }
    pub fn begin(&self) -> usize {
        u16::from_le_bytes(self.begin_block) as usize
    }
    pub fn end(&self) -> usize {
        u16::from_le_bytes(self.end_block) as usize
    }
    pub fn blocks(&self) -> usize {
        self.end().saturating_sub(self.begin())
    }
    pub fn eof(&self) -> usize {
        match self.blocks() {
            0 => 0,
            n => (n-1)*BLOCK_SIZE + usize::min(u16::from_le_bytes(self.bytes_remaining) as usize,BLOCK_SIZE)
        }
    }
    pub fn name(&self) -> String {
        name_to_string(&self.name,self.name_len & 0x0f)
    }
}

pub fn name_to_string(fname: &[u8],len: u8) -> String {
    let len = usize::min(len as usize,fname.len());
    crate::escaped_ascii_from_bytes(&fname[0..len],true,false).trim_end().to_string()
}

/// Put the name in upper case and pad with nulls, the caller checks validity first
pub fn string_to_name<const N: usize>(s: &str) -> (u8,[u8;N]) {
    let mut ans: [u8;N] = [0;N];
    let upper = s.to_uppercase();
    let bytes = upper.as_bytes();
    let len = usize::min(bytes.len(),N);
    ans[0..len].copy_from_slice(&bytes[0..len]);
    (len as u8,ans)
}

/// The directory is simply the header followed immediately by
/// packed entries.  The entries are allowed to cross block boundaries.
pub struct Directory {
    pub header: VolDirHeader,
    pub entries: Vec<DirectoryEntry>
}

impl Directory {
    pub fn new() -> Self {
        Self {
            header: VolDirHeader::new(),
            entries: vec![DirectoryEntry::new();MAX_FILES]
        }
    }
    /// Build from the contiguous directory blocks, every slot is created whether used or not
    pub fn from_bytes(buf: &[u8]) -> Result<Self,DYNERR> {
        let mut ans = Self::new();
        ans.header = VolDirHeader::from_bytes(&buf[0..ENTRY_SIZE])?;
        ans.entries = Vec::new();
        for i in 1..buf.len()/ENTRY_SIZE {
            ans.entries.push(DirectoryEntry::from_bytes(&buf[i*ENTRY_SIZE..(i+1)*ENTRY_SIZE])?);
        }
        Ok(ans)
    }
    /// Flatten to the length of the directory blocks
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ans = self.header.to_bytes();
        for entry in &self.entries {
            ans.append(&mut entry.to_bytes());
        }
        let blocks = self.header.end_block().saturating_sub(VOL_HEADER_BLOCK);
        ans.resize(blocks*BLOCK_SIZE,0);
        ans
    }
    /// The entries in use, these are kept in block order at the start of the list
    pub fn live(&self) -> &[DirectoryEntry] {
        let n = usize::min(self.header.num_files(),self.entries.len());
        &self.entries[0..n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_sizes() {
        assert_eq!(VolDirHeader::new().to_bytes().len(),ENTRY_SIZE);
        assert_eq!(DirectoryEntry::new().to_bytes().len(),ENTRY_SIZE);
        let mut dir = Directory::new();
        dir.header.end_block = [6,0];
        assert_eq!(dir.to_bytes().len(),4*BLOCK_SIZE);
        let back = Directory::from_bytes(&dir.to_bytes()).expect("could not parse");
        assert_eq!(back.entries.len(),MAX_FILES);
    }

    #[test]
    fn entry_eof() {
        let mut entry = DirectoryEntry::new();
        entry.begin_block = [10,0];
        entry.end_block = [13,0];
        entry.bytes_remaining = [0x10,0];
        assert_eq!(entry.blocks(),3);
        assert_eq!(entry.eof(),1024 + 16);
        let (len,name) = string_to_name::<15>("hello");
        assert_eq!(len,5);
        assert_eq!(&name[0..6],b"HELLO\0");
    }
}
