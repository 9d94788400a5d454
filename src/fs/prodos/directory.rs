//! # ProDOS directory structures
//! The volume directory is a chain of blocks starting at the key block.  Each entry,
//! including the header, is 39 bytes.  These are fixed length structures with the DiskStruct trait.

use binrw::{BinRead,BinWrite};
use regex::Regex;
use log::error;
use super::types::*;
use crate::{STDRESULT,DYNERR};

/// Test the string for validity as a ProDOS name.
/// This can be used to check names before passing to functions.
pub fn is_name_valid(s: &str) -> bool {
    match Regex::new(r"^[A-Z][A-Z0-9.]{0,14}$") {
        Ok(re) => re.is_match(&s.to_uppercase()),
        Err(_) => false
    }
}

/// Check a file or volume name, distinguishing a long name from a bad one.
pub fn check_name(s: &str) -> STDRESULT {
    if s.len() > NAME_LEN {
        error!("ProDOS names are limited to {} characters",NAME_LEN);
        return Err(Box::new(crate::fs::Error::NameTooLong));
    }
    if !is_name_valid(s) {
        error!("invalid ProDOS name {}",s);
        return Err(Box::new(Error::Syntax));
    }
    Ok(())
}

pub fn file_name_to_string(stor_len_nibs: u8, fname: [u8;15]) -> String {
    let name_len = stor_len_nibs & 0x0f;
    match std::str::from_utf8(&fname[0..name_len as usize]) {
        Ok(s) => s.to_string(),
        Err(_) => crate::escaped_ascii_from_bytes(&fname[0..name_len as usize],true,false)
    }
}

/// Returns (stor_len_nibs,name), the name is put in upper case
pub fn string_to_file_name(stype: &StorageType, s: &str) -> (u8,[u8;15]) {
    let mut ans: [u8;15] = [0;15];
    let fname = s.to_uppercase();
    let bytes = fname.as_bytes();
    let len = usize::min(bytes.len(),NAME_LEN);
    ans[0..len].copy_from_slice(&bytes[0..len]);
    (((*stype as u8) << 4) + len as u8,ans)
}

#[derive(BinRead,BinWrite,Clone)]
#[brw(little)]
pub struct VolDirHeader {
    pub stor_len_nibs: u8,
    pub name: [u8;15],
    pub pad1: [u8;8],
    pub create_time: [u8;4],
    pub vers: u8,
    pub min_vers: u8,
    pub access: u8,
    pub entry_len: u8,
    pub entries_per_block: u8,
    pub file_count: [u8;2],
    pub bitmap_ptr: [u8;2],
    pub total_blocks: [u8;2]
}

impl VolDirHeader {
    pub fn new() -> Self {
        Self {
            stor_len_nibs: 0,
            name: [0;15],
            pad1: [0;8],
            create_time: [0;4],
            vers: 0,
            min_vers: 0,
            access: 0,
            entry_len: 0,
            entries_per_block: 0,
            file_count: [0;2],
            bitmap_ptr: [0;2],
            total_blocks: [0;2]
        }
    }
    pub fn format(&mut self,blocks: u16,vol_name: &str,create_time: Option<chrono::NaiveDateTime>) {
        let (nibs,fname) = string_to_file_name(&StorageType::VolDirHeader,vol_name);
        self.stor_len_nibs = nibs;
        self.name = fname;
        self.create_time = pack_time(create_time);
        self.vers = 0;
        self.min_vers = 0;
        self.access = crate::fs::UNLOCKED_ACCESS;
        self.entry_len = ENTRY_SIZE as u8;
        self.entries_per_block = ENTRIES_PER_BLOCK as u8;
        self.file_count = [0,0];
        self.bitmap_ptr = u16::to_le_bytes(BITMAP_BLOCK);
        self.total_blocks = u16::to_le_bytes(blocks);
    }
    pub fn name(&self) -> String {
        file_name_to_string(self.stor_len_nibs,self.name)
    }
    pub fn rename(&mut self,new_name: &str) {
        let (nibs,fname) = string_to_file_name(&StorageType::VolDirHeader,new_name);
        self.stor_len_nibs = nibs;
        self.name = fname;
    }
    pub fn file_count(&self) -> u16 {
        u16::from_le_bytes(self.file_count)
    }
    pub fn inc_file_count(&mut self) {
        self.file_count = u16::to_le_bytes(self.file_count().saturating_add(1));
    }
    pub fn dec_file_count(&mut self) {
        self.file_count = u16::to_le_bytes(self.file_count().saturating_sub(1));
    }
    pub fn total_blocks(&self) -> u16 {
        u16::from_le_bytes(self.total_blocks)
    }
    pub fn bitmap_ptr(&self) -> u16 {
        u16::from_le_bytes(self.bitmap_ptr)
    }
}

#[derive(BinRead,BinWrite,Clone)]
#[brw(little)]
pub struct Entry {
    pub stor_len_nibs: u8,
    pub name: [u8;15],
    pub file_type: u8,
    pub key_ptr: [u8;2],
    pub blocks_used: [u8;2],
    pub eof: [u8;3],
    pub create_time: [u8;4],
    pub vers: u8,
    pub min_vers: u8,
    pub access: u8,
    pub aux_type: [u8;2],
    pub last_mod: [u8;4],
    pub header_ptr: [u8;2]
}

impl Entry {
    pub fn new() -> Self {
        Self {
            stor_len_nibs: 0,
            name: [0;15],
            file_type: 0,
            key_ptr: [0;2],
            blocks_used: [0;2],
            eof: [0;3],
            create_time: [0;4],
            vers: 0,
            min_vers: 0,
            access: 0,
            aux_type: [0;2],
            last_mod: [0;4],
            header_ptr: [0;2]
        }
    }
    /// Start a new entry, the storage details are filled in as the file is written
    pub fn create_file(name: &str,file_type: u8,aux: u16,access: u8,create_time: Option<chrono::NaiveDateTime>) -> Self {
        let mut ans = Self::new();
        let (nibs,fname) = string_to_file_name(&StorageType::Seedling,name);
        ans.stor_len_nibs = nibs;
        ans.name = fname;
        ans.file_type = file_type;
        ans.access = access;
        ans.aux_type = u16::to_le_bytes(aux);
        ans.create_time = pack_time(create_time);
        ans.last_mod = ans.create_time;
        ans.header_ptr = u16::to_le_bytes(VOL_KEY_BLOCK);
        ans
    }
    pub fn storage_type(&self) -> StorageType {
        match num_traits::FromPrimitive::from_u8(self.stor_len_nibs >> 4) {
            Some(t) => t,
            None => StorageType::Inactive
        }
    }
    pub fn set_storage_type(&mut self,stype: StorageType) {
        self.stor_len_nibs = ((stype as u8) << 4) | (self.stor_len_nibs & 0x0f);
    }
    pub fn is_active(&self) -> bool {
        self.storage_type()!=StorageType::Inactive
    }
    /// a file whose data this module can read and write
    pub fn is_file(&self) -> bool {
        [StorageType::Seedling,StorageType::Sapling,StorageType::Tree].contains(&self.storage_type())
    }
    /// a slot whose storage nibble was cleared but whose name is still there
    pub fn is_deleted(&self) -> bool {
        !self.is_active() && self.stor_len_nibs & 0x0f > 0
    }
    pub fn name(&self) -> String {
        file_name_to_string(self.stor_len_nibs,self.name)
    }
    pub fn rename(&mut self,new_name: &str) {
        let (nibs,fname) = string_to_file_name(&self.storage_type(),new_name);
        self.stor_len_nibs = nibs;
        self.name = fname;
    }
    pub fn get_ptr(&self) -> u16 {
        u16::from_le_bytes(self.key_ptr)
    }
    pub fn set_ptr(&mut self,ptr: u16) {
        self.key_ptr = u16::to_le_bytes(ptr);
    }
    pub fn blocks_used(&self) -> u16 {
        u16::from_le_bytes(self.blocks_used)
    }
    pub fn eof(&self) -> usize {
        u32::from_le_bytes([self.eof[0],self.eof[1],self.eof[2],0]) as usize
    }
    pub fn set_eof(&mut self,eof: usize) {
        let b = u32::to_le_bytes(eof as u32);
        self.eof = [b[0],b[1],b[2]];
    }
    pub fn aux(&self) -> u16 {
        u16::from_le_bytes(self.aux_type)
    }
    pub fn get_access(&self,what: Access) -> bool {
        (self.access & what as u8) > 0
    }
    pub fn set_access(&mut self,what: Access,which: bool) {
        if which {
            self.access |= what as u8;
        } else {
            self.access &= u8::MAX ^ what as u8;
        }
    }
    /// Tombstone the slot, as ProDOS does the name remains but the storage nibble is cleared
    pub fn delete(&mut self) {
        self.stor_len_nibs &= 0x0f;
    }
}

#[derive(BinRead,BinWrite,Clone)]
#[brw(little)]
pub struct KeyBlock {
    pub prev: [u8;2],
    pub next: [u8;2],
    pub header: VolDirHeader,
    pub entries: [Entry;12],
    pub pad: u8
}
crate::disk_struct!(KeyBlock);

#[derive(BinRead,BinWrite,Clone)]
#[brw(little)]
pub struct EntryBlock {
    pub prev: [u8;2],
    pub next: [u8;2],
    pub entries: [Entry;13],
    pub pad: u8
}
crate::disk_struct!(EntryBlock);

impl KeyBlock {
    pub fn new() -> Self {
        Self {
            prev: [0;2],
            next: [0;2],
            header: VolDirHeader::new(),
            entries: std::array::from_fn(|_| Entry::new()),
            pad: 0
        }
    }
}

impl EntryBlock {
    pub fn new() -> Self {
        Self {
            prev: [0;2],
            next: [0;2],
            entries: std::array::from_fn(|_| Entry::new()),
            pad: 0
        }
    }
}

/// A block of the volume directory, either the key block or one of the blocks after it
pub enum DirBlock {
    Key(KeyBlock),
    Entries(EntryBlock)
}

impl DirBlock {
    pub fn from_bytes(iblock: u16,dat: &[u8]) -> Result<Self,DYNERR> {
        use crate::DiskStruct;
        match iblock {
            VOL_KEY_BLOCK => Ok(Self::Key(KeyBlock::from_bytes(dat)?)),
            _ => Ok(Self::Entries(EntryBlock::from_bytes(dat)?))
        }
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        use crate::DiskStruct;
        match self {
            Self::Key(k) => k.to_bytes(),
            Self::Entries(e) => e.to_bytes()
        }
    }
    pub fn next(&self) -> u16 {
        match self {
            Self::Key(k) => u16::from_le_bytes(k.next),
            Self::Entries(e) => u16::from_le_bytes(e.next)
        }
    }
    pub fn entries(&self) -> &[Entry] {
        match self {
            Self::Key(k) => &k.entries,
            Self::Entries(e) => &e.entries
        }
    }
    pub fn entries_mut(&mut self) -> &mut [Entry] {
        match self {
            Self::Key(k) => &mut k.entries,
            Self::Entries(e) => &mut e.entries
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiskStruct;

    #[test]
    fn structure_sizes() {
        let mut key = KeyBlock::new();
        key.entries[0].stor_len_nibs = 0x15;
        key.entries[1].stor_len_nibs = 0x25;
        let buf = key.to_bytes();
        assert_eq!(buf.len(),BLOCK_SIZE);
        assert_eq!(buf[4 + ENTRY_SIZE],0x15);
        assert_eq!(buf[4 + 2*ENTRY_SIZE],0x25);
        assert_eq!(EntryBlock::new().to_bytes().len(),BLOCK_SIZE);
    }

    #[test]
    fn header_layout() {
        let mut key = KeyBlock::new();
        key.next = [3,0];
        key.header.format(280,"blank",None);
        let buf = key.to_bytes();
        assert_eq!(buf[4],0xf5);
        assert_eq!(&buf[5..10],b"BLANK");
        // entry length, entries per block, file count, bitmap pointer, total blocks
        assert_eq!(&buf[0x23..0x2b],&[0x27,0x0d,0,0,6,0,0x18,0x01]);
        let back = KeyBlock::from_bytes(&buf).expect("could not parse");
        assert_eq!(back.header.name(),"BLANK");
        assert_eq!(back.header.total_blocks(),280);
    }

    #[test]
    fn names() {
        assert!(is_name_valid("HELLO.WORLD"));
        assert!(is_name_valid("a1"));
        assert!(!is_name_valid("1ABC"));
        assert!(!is_name_valid("HELLO WORLD"));
        assert!(check_name("ABCDEFGHIJKLMNOP").is_err());
        let mut entry = Entry::create_file("hello",0x06,0x300,0xc3,None);
        assert_eq!(entry.name(),"HELLO");
        assert_eq!(entry.storage_type(),StorageType::Seedling);
        entry.delete();
        assert!(entry.is_deleted());
        assert_eq!(entry.name(),"HELLO");
    }
}
