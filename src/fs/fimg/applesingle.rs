//! ### AppleSingle
//!
//! AppleSingle stores both forks of a file along with its metadata in one byte stream.
//! Here it is the transfer container for `FileContent`.  Version 2 is written, versions
//! 1 and 2 are read.  The fixed records are `binrw` structures, the entry payloads are
//! sliced out of the buffer only after their bounds have been checked.

use binrw::{BinRead,BinWrite};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use log::{debug,error};
use crate::fs::{FileContent,Error,UNLOCKED_ACCESS};
use crate::DiskStruct;
use crate::DYNERR;

const HEADER_LEN: usize = 26;
const DESCRIPTOR_LEN: usize = 12;
const VERSION_1: u32 = 0x00010000;
const VERSION_2: u32 = 0x00020000;
const DEFAULT_NAME: &str = "UNTITLED";

#[derive(FromPrimitive,PartialEq,Clone,Copy,Debug)]
pub enum EntryType {
    DataFork = 1,
    ResourceFork = 2,
    RealName = 3,
    Comment = 4,
    IconBw = 5,
    IconColor = 6,
    FileInfo = 7,
    FileDatesInfo = 8,
    FinderInfo = 9,
    MacintoshFileInfo = 10,
    ProdosFileInfo = 11,
    MsdosFileInfo = 12,
    ShortName = 13,
    AfpFileInfo = 14,
    DirectoryId = 15,
}

#[derive(BinRead,BinWrite,Clone)]
#[brw(big, magic = 0x00051600u32)]
struct Header {
    version: u32,
    /// all zero in version 2
    home_fs: [u8;16],
    num_entries: u16
}
crate::disk_struct!(Header);

#[derive(BinRead,BinWrite,Clone)]
#[brw(big)]
struct Descriptor {
    entry_id: u32,
    offset: u32,
    length: u32
}
crate::disk_struct!(Descriptor);

#[derive(BinRead,BinWrite,Clone)]
#[brw(big)]
struct ProdosFileInfo {
    access: u16,
    file_type: u16,
    aux_type: u32
}
crate::disk_struct!(ProdosFileInfo);

/// is the data an AppleSingle, checks magic and version
pub fn test(dat: &[u8]) -> bool {
    if dat.len() < 8 {
        false
    } else {
        dat[0..8] == [0,5,0x16,0,0,1,0,0] || dat[0..8] == [0,5,0x16,0,0,2,0,0]
    }
}

/// Encode the file as a version 2 AppleSingle.  Entries are the real name, the ProDOS info,
/// the data fork, and the resource fork if there is one, laid out contiguously.
pub fn encode(content: &FileContent) -> Vec<u8> {
    let info = ProdosFileInfo {
        access: content.access as u16,
        file_type: content.file_type as u16,
        aux_type: content.aux_type as u32
    };
    let mut payloads: Vec<(EntryType,Vec<u8>)> = vec![
        (EntryType::RealName,content.name.as_bytes().to_vec()),
        (EntryType::ProdosFileInfo,info.to_bytes()),
        (EntryType::DataFork,content.data.clone())
    ];
    if let Some(res) = &content.resource {
        payloads.push((EntryType::ResourceFork,res.clone()));
    }
    let header = Header {
        version: VERSION_2,
        home_fs: [0;16],
        num_entries: payloads.len() as u16
    };
    let mut ans = header.to_bytes();
    let mut offset = HEADER_LEN + DESCRIPTOR_LEN * payloads.len();
    for (typ,dat) in &payloads {
        let desc = Descriptor {
            entry_id: *typ as u32,
            offset: offset as u32,
            length: dat.len() as u32
        };
        ans.append(&mut desc.to_bytes());
        offset += dat.len();
    }
    for (_,dat) in &payloads {
        ans.extend_from_slice(dat);
    }
    ans
}

fn malformed(msg: &str) -> DYNERR {
    error!("AppleSingle: {}",msg);
    Box::new(Error::MalformedContainer)
}

/// Decode an AppleSingle into `FileContent`.  Every offset and length is checked against
/// the buffer before it is used, and a data fork must be present.
pub fn decode(dat: &[u8]) -> Result<FileContent,DYNERR> {
    if dat.len() < HEADER_LEN {
        return Err(malformed("too short for header"));
    }
    let header = match Header::from_bytes(&dat[0..HEADER_LEN]) {
        Ok(h) => h,
        Err(_) => return Err(malformed("bad magic"))
    };
    if header.version!=VERSION_1 && header.version!=VERSION_2 {
        return Err(malformed(&format!("unknown version {:08X}",header.version)));
    }
    let desc_end = HEADER_LEN + DESCRIPTOR_LEN * header.num_entries as usize;
    if desc_end > dat.len() {
        return Err(malformed("entry descriptors run past end"));
    }
    let mut ans = FileContent {
        name: DEFAULT_NAME.to_string(),
        data: Vec::new(),
        resource: None,
        file_type: 0x06,
        aux_type: 0,
        access: UNLOCKED_ACCESS
    };
    let mut found_data = false;
    for i in 0..header.num_entries as usize {
        let beg = HEADER_LEN + DESCRIPTOR_LEN * i;
        let desc = match Descriptor::from_bytes(&dat[beg..beg+DESCRIPTOR_LEN]) {
            Ok(d) => d,
            Err(_) => return Err(malformed("bad descriptor"))
        };
        let (offset,len) = (desc.offset as usize,desc.length as usize);
        if offset < desc_end || offset + len > dat.len() {
            return Err(malformed(&format!("entry {} is out of bounds",desc.entry_id)));
        }
        let payload = &dat[offset..offset+len];
        match EntryType::from_u32(desc.entry_id) {
            Some(EntryType::DataFork) => {
                ans.data = payload.to_vec();
                found_data = true;
            },
            Some(EntryType::ResourceFork) => ans.resource = Some(payload.to_vec()),
            // an empty real name is kept, the default is only for a missing entry
            Some(EntryType::RealName) => ans.name = String::from_utf8_lossy(payload).trim_end_matches('\0').to_string(),
            Some(EntryType::ProdosFileInfo) => {
                if len < 8 {
                    return Err(malformed("ProDOS info entry is too short"));
                }
                let info = match ProdosFileInfo::from_bytes(&payload[0..8]) {
                    Ok(info) => info,
                    Err(_) => return Err(malformed("bad ProDOS info entry"))
                };
                ans.access = (info.access & 0xff) as u8;
                ans.file_type = (info.file_type & 0xff) as u8;
                ans.aux_type = (info.aux_type & 0xffff) as u16;
            },
            Some(other) => debug!("skipping AppleSingle entry {:?}",other),
            None => debug!("skipping unknown AppleSingle entry {}",desc.entry_id)
        }
    }
    if !found_data {
        return Err(malformed("no data fork"));
    }
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ItemType;

    #[test]
    fn layout() {
        let content = FileContent::new("HELLO",&[1,2,3],ItemType::Binary,Some(0x300));
        let dat = encode(&content);
        assert!(test(&dat));
        // header, 3 descriptors, name, info, data
        assert_eq!(dat.len(),26 + 36 + 5 + 8 + 3);
        assert_eq!(&dat[24..26],&[0,3]);
        // real name descriptor
        assert_eq!(&dat[26..38],&[0,0,0,3, 0,0,0,62, 0,0,0,5]);
        assert_eq!(&dat[62..67],b"HELLO");
        // access, type, aux
        assert_eq!(&dat[67..75],&[0,0xc3, 0,6, 0,0,3,0]);
        assert_eq!(&dat[75..78],&[1,2,3]);
    }

    #[test]
    fn version_1_defaults() {
        let mut dat = vec![0,5,0x16,0,0,1,0,0];
        dat.append(&mut vec![0;16]);
        dat.append(&mut vec![0,1]);
        dat.append(&mut vec![0,0,0,1, 0,0,0,38, 0,0,0,2]);
        dat.append(&mut vec![0xaa,0xbb]);
        let content = decode(&dat).expect("decode failed");
        assert_eq!(content.name,"UNTITLED");
        assert_eq!(content.data,vec![0xaa,0xbb]);
        assert_eq!(content.file_type,0x06);
        assert_eq!(content.aux_type,0);
        assert_eq!(content.access,0xc3);
    }
}
