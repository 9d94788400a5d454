//! ## Support for ProDOS ordered disk images (PO,DSK)
//!
//! DSK images are a simple sequential dump of the already-decoded sector data.
//! If the sector sequence is ordered as in ProDOS, we have a PO variant.
//! A DOS track and sector can still be located, it is one half of some block.

use log::{trace,error};
use crate::img;
use crate::bios::skew;
use crate::fs::Block;
use crate::{STDRESULT,DYNERR};

const BLOCK_SIZE: usize = 512;
pub const MAX_BLOCKS: usize = 65535;
pub const MIN_BLOCKS: usize = 280;

/// Wrapper for PO data.
pub struct PO {
    kind: img::DiskKind,
    blocks: u16,
    data: Vec<u8>
}

impl PO {
    pub fn create(blocks: u16) -> Result<Self,DYNERR> {
        if (blocks as usize) < MIN_BLOCKS {
            error!("PO image needs at least {} blocks",MIN_BLOCKS);
            return Err(Box::new(img::Error::ImageSizeMismatch));
        }
        Ok(Self {
            kind: img::DiskKind::from_blocks(blocks as usize),
            blocks,
            data: vec![0;blocks as usize*BLOCK_SIZE]
        })
    }
    fn offset(&self,block: usize) -> Result<usize,DYNERR> {
        if block>=self.blocks as usize {
            error!("block {} is out of bounds",block);
            return Err(Box::new(img::Error::SectorAccess));
        }
        Ok(block*BLOCK_SIZE)
    }
}

impl img::DiskImage for PO {
    fn track_count(&self) -> usize {
        return self.blocks as usize/8;
    }
    fn byte_capacity(&self) -> usize {
        return self.data.len();
    }
    fn read_block(&mut self,addr: Block) -> Result<Vec<u8>,DYNERR> {
        trace!("read {}",addr);
        match addr {
            Block::PO(block) => {
                let offset = self.offset(block)?;
                Ok(self.data[offset..offset+BLOCK_SIZE].to_vec())
            },
            Block::DO([t,s]) => {
                let (block,byte) = skew::prodos_block_from_ts(t,s)?;
                let offset = self.offset(block)? + byte;
                Ok(self.data[offset..offset+BLOCK_SIZE/2].to_vec())
            }
        }
    }
    fn write_block(&mut self, addr: Block, dat: &[u8]) -> STDRESULT {
        trace!("write {}",addr);
        match addr {
            Block::PO(block) => {
                let padded = img::quantize_block(dat, BLOCK_SIZE);
                let offset = self.offset(block)?;
                self.data[offset..offset+BLOCK_SIZE].copy_from_slice(&padded);
                Ok(())
            },
            Block::DO([t,s]) => {
                let padded = img::quantize_block(dat, BLOCK_SIZE/2);
                let (block,byte) = skew::prodos_block_from_ts(t,s)?;
                let offset = self.offset(block)? + byte;
                self.data[offset..offset+BLOCK_SIZE/2].copy_from_slice(&padded);
                Ok(())
            }
        }
    }
    fn from_bytes(data: &[u8]) -> Option<Self> {
        // reject anything that can be neither a DOS 3.3 nor a ProDOS volume
        if data.len()%BLOCK_SIZE > 0 || data.len()/BLOCK_SIZE > MAX_BLOCKS || data.len()/BLOCK_SIZE < MIN_BLOCKS {
            return None;
        }
        let blocks = data.len()/BLOCK_SIZE;
        Some(Self {
            kind: img::DiskKind::from_blocks(blocks),
            blocks: blocks as u16,
            data: data.to_vec()
        })
    }
    fn what_am_i(&self) -> img::DiskImageType {
        img::DiskImageType::PO
    }
    fn kind(&self) -> img::DiskKind {
        self.kind
    }
    fn to_bytes(&self) -> Vec<u8> {
        return self.data.clone();
    }
}

#[test]
fn test_po_sizes() {
    use img::DiskImage;
    assert!(PO::from_bytes(&vec![0;143360]).is_some());
    assert!(PO::from_bytes(&vec![0;143361]).is_none());
    assert!(PO::from_bytes(&vec![0;512*279]).is_none());
    assert!(PO::create(100).is_err());
    let mut disk = PO::create(1600).expect("could not create");
    assert_eq!(disk.kind(),img::DiskKind::A2_35_800);
    assert!(disk.read_block(Block::PO(1599)).is_ok());
    assert!(disk.read_block(Block::PO(1600)).is_err());
}
