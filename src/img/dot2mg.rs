//! ## Support for 2MG disk images
//!
//! This format consists of a 64 byte header followed by data in either DO or PO format.
//! At the end of the data there can be a comment and creator information, which
//! are kept and written back when the image is saved.

use log::{warn,info,error};
use binrw::{BinRead,BinWrite};
use crate::img;
use crate::img::DiskImage;
use crate::fs::Block;
use crate::DiskStruct;
use crate::{STDRESULT,DYNERR};

const HEADER_LEN: u16 = 64;
const BLOCK_SIZE: u32 = 512;
const LOCKED_FLAG: u32 = 0x8000_0000;
const VOLUME_FLAG: u32 = 0x0000_0100;

// all header entries are LE numbers
#[derive(BinRead,BinWrite,Clone)]
#[brw(little)]
pub struct Header {
    magic: [u8;4], // always '2IMG'
    creator_id: [u8;4],
    header_len: u16,
    version: u16, // 1
    img_fmt: u32, // 0=DO, 1=PO
    flags: u32, // bits 0-7=volume if bit 8 (otherwise 254), disk write protected if bit 31
    blocks: u32,
    data_offset: u32, // from start of file
    data_len: u32,
    comment_offset: u32,
    comment_len: u32,
    creator_offset: u32,
    creator_len: u32,
    pad: [u8;16]
}
crate::disk_struct!(Header);

pub struct Dot2mg {
    header: Header,
    // use the strategy of wrapping another disk image
    raw_img: Box<dyn img::DiskImage>,
    comment: String,
    creator_info: String,
}

impl Dot2mg {
    /// Wrap an existing DO or PO image.  For DO images `vol` is recorded in the flags.
    pub fn create(raw_img: Box<dyn img::DiskImage>,vol: Option<u8>) -> Result<Self,DYNERR> {
        let fmt = match raw_img.what_am_i() {
            img::DiskImageType::DO => 0,
            img::DiskImageType::PO => 1,
            img::DiskImageType::DOT2MG => {
                error!("attempt to wrap 2MG in 2MG");
                return Err(Box::new(img::Error::ImageTypeMismatch));
            }
        };
        let flags = match (fmt,vol) {
            (0,Some(v)) => VOLUME_FLAG | v as u32,
            _ => 0
        };
        let buf_len = raw_img.byte_capacity() as u32;
        Ok(Self {
            header: Header {
                magic: *b"2IMG",
                creator_id: *b"A2ST",
                header_len: HEADER_LEN,
                version: 1,
                img_fmt: fmt,
                flags,
                // some readers reject DO with blocks=0, so always write it
                blocks: buf_len / BLOCK_SIZE,
                data_offset: HEADER_LEN as u32,
                data_len: buf_len,
                comment_offset: 0,
                comment_len: 0,
                creator_offset: 0,
                creator_len: 0,
                pad: [0;16]
            },
            raw_img,
            comment: String::new(),
            creator_info: String::new()
        })
    }
    pub fn is_locked(&self) -> bool {
        self.header.flags & LOCKED_FLAG > 0
    }
    pub fn set_locked(&mut self,locked: bool) {
        self.header.flags = match locked {
            true => self.header.flags | LOCKED_FLAG,
            false => self.header.flags & !LOCKED_FLAG
        };
    }
    /// DOS volume number from the flags, if present
    pub fn volume(&self) -> Option<u8> {
        match self.header.flags & VOLUME_FLAG {
            0 => None,
            _ => Some((self.header.flags & 0xff) as u8)
        }
    }
    fn trailing_string(data: &[u8],offset: u32,len: u32,what: &str) -> String {
        let (beg,end) = (offset as usize,offset as usize + len as usize);
        if len==0 {
            return String::new();
        }
        if data.len()<end {
            warn!("end of {} {} runs past EOF, ignoring",what,end);
            return String::new();
        }
        match String::from_utf8(data[beg..end].to_vec()) {
            Ok(s) => {
                info!("2MG {}: {}",what,s);
                s
            },
            Err(_) => {
                warn!("{} could not be read as UTF8 string",what);
                String::new()
            }
        }
    }
}

impl img::DiskImage for Dot2mg {
    fn track_count(&self) -> usize {
        self.raw_img.track_count()
    }
    fn byte_capacity(&self) -> usize {
        self.raw_img.byte_capacity()
    }
    fn read_block(&mut self,addr: Block) -> Result<Vec<u8>,DYNERR> {
        self.raw_img.read_block(addr)
    }
    fn write_block(&mut self, addr: Block, dat: &[u8]) -> STDRESULT {
        if self.is_locked() {
            error!("2MG disk is write protected");
            return Err(Box::new(img::Error::WriteProtected));
        }
        self.raw_img.write_block(addr,dat)
    }
    fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len()<HEADER_LEN as usize {
            return None;
        }
        let header = Header::from_bytes(&data[0..HEADER_LEN as usize]).ok()?;
        if &header.magic != b"2IMG" {
            return None;
        }
        info!("identified 2MG header");
        if header.header_len!=HEADER_LEN {
            warn!("unexpected 2MG header length {}",header.header_len);
        }
        if header.version!=1 {
            warn!("unexpected 2MG version {}",header.version);
        }
        let offset = header.data_offset as usize;
        let len = header.data_len as usize;
        if data.len()<offset+len {
            error!("end of data {} runs past EOF",offset+len);
            return None;
        }
        let raw_img: Box<dyn img::DiskImage> = match header.img_fmt {
            0 => {
                info!("2MG flagged as DOS ordered");
                Box::new(img::dsk_do::DO::from_bytes(&data[offset..offset+len])?)
            },
            1 => {
                info!("2MG flagged as ProDOS ordered");
                Box::new(img::dsk_po::PO::from_bytes(&data[offset..offset+len])?)
            },
            fmt => {
                error!("unsupported 2MG format {}",fmt);
                return None;
            }
        };
        if header.img_fmt==1 && header.blocks as usize * BLOCK_SIZE as usize != raw_img.byte_capacity() {
            error!("2MG block count does not match data size");
            return None;
        }
        let comment = Self::trailing_string(data,header.comment_offset,header.comment_len,"comment");
        let creator_info = Self::trailing_string(data,header.creator_offset,header.creator_len,"creator info");
        Some(Self {
            header,
            raw_img,
            comment,
            creator_info
        })
    }
    fn what_am_i(&self) -> img::DiskImageType {
        img::DiskImageType::DOT2MG
    }
    fn kind(&self) -> img::DiskKind {
        self.raw_img.kind()
    }
    fn to_bytes(&self) -> Vec<u8> {
        let mut header = self.header.clone();
        let buf_len = self.raw_img.byte_capacity() as u32;
        let rem_len = self.comment.len() as u32;
        let cre_len = self.creator_info.len() as u32;
        header.data_offset = HEADER_LEN as u32;
        header.data_len = buf_len;
        header.comment_offset = match rem_len { 0 => 0, _ => HEADER_LEN as u32 + buf_len };
        header.comment_len = rem_len;
        header.creator_offset = match cre_len { 0 => 0, _ => HEADER_LEN as u32 + buf_len + rem_len };
        header.creator_len = cre_len;
        let mut ans = header.to_bytes();
        ans.append(&mut self.raw_img.to_bytes());
        ans.extend_from_slice(self.comment.as_bytes());
        ans.extend_from_slice(self.creator_info.as_bytes());
        return ans;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let raw = img::dsk_do::DO::create(img::DiskKind::A2_525_16).expect("could not create");
        let wrapped = Dot2mg::create(Box::new(raw),Some(254)).expect("could not wrap");
        let bytes = wrapped.to_bytes();
        assert_eq!(bytes.len(),64+143360);
        assert_eq!(&bytes[0..4],b"2IMG");
        assert_eq!(&bytes[8..10],&[64,0]);
        assert_eq!(&bytes[12..16],&[0,0,0,0]);
        assert_eq!(&bytes[16..20],&[254,1,0,0]);
        assert_eq!(&bytes[20..24],&[0x18,1,0,0]);
        let back = Dot2mg::from_bytes(&bytes).expect("could not read back");
        assert_eq!(back.volume(),Some(254));
        assert_eq!(back.kind(),img::DiskKind::A2_525_16);
    }

    #[test]
    fn locked_image_refuses_writes() {
        let raw = img::dsk_po::PO::create(280).expect("could not create");
        let mut wrapped = Dot2mg::create(Box::new(raw),None).expect("could not wrap");
        wrapped.set_locked(true);
        assert!(wrapped.write_block(Block::PO(0),&[0;512]).is_err());
        wrapped.set_locked(false);
        assert!(wrapped.write_block(Block::PO(0),&[0;512]).is_ok());
    }
}
