//! ## Support for Apple DOS ordered disk images (DO,DSK)
//!
//! DSK images are a simple sequential dump of the already-decoded sector data.
//! If the sector sequence is ordered as in DOS 3.3, we have a DO variant.
//! N.b. the ordering cannot be verified until we get up to the file system layer.

use log::{trace,error};
use crate::img;
use crate::bios::skew;
use crate::fs::Block;
use crate::{STDRESULT,DYNERR};

const SECTOR_SIZE: usize = 256;

/// Wrapper for DO data.
pub struct DO {
    kind: img::DiskKind,
    tracks: u16,
    sectors: u16,
    data: Vec<u8>
}

impl DO {
    /// Create a zeroed image, the geometry must be one of the DOS kinds
    pub fn create(kind: img::DiskKind) -> Result<Self,DYNERR> {
        let (tracks,sectors) = match kind.dos_geometry() {
            Some((t,s)) => (t as u16,s as u16),
            None => {
                error!("DO image cannot represent {}",kind);
                return Err(Box::new(img::Error::IncompatibleDiskKind));
            }
        };
        Ok(Self {
            kind,
            tracks,
            sectors,
            data: vec![0;tracks as usize*sectors as usize*SECTOR_SIZE]
        })
    }
    fn offset(&self,track: usize,sector: usize) -> Result<usize,DYNERR> {
        if track>=self.tracks as usize || sector>=self.sectors as usize {
            error!("track {} sector {} is out of bounds",track,sector);
            return Err(Box::new(img::Error::SectorAccess));
        }
        Ok(track*self.sectors as usize*SECTOR_SIZE + sector*SECTOR_SIZE)
    }
}

impl img::DiskImage for DO {
    fn track_count(&self) -> usize {
        return self.tracks as usize;
    }
    fn byte_capacity(&self) -> usize {
        return self.data.len();
    }
    fn read_block(&mut self,addr: Block) -> Result<Vec<u8>,DYNERR> {
        trace!("read {}",addr);
        match addr {
            Block::DO([t,s]) => {
                let offset = self.offset(t,s)?;
                Ok(self.data[offset..offset+SECTOR_SIZE].to_vec())
            },
            Block::PO(block) => {
                let mut ans: Vec<u8> = Vec::new();
                let ts_list = skew::ts_from_prodos_block(block,&self.kind)?;
                for [t,s] in ts_list {
                    let offset = self.offset(t,s)?;
                    ans.extend_from_slice(&self.data[offset..offset+SECTOR_SIZE]);
                }
                Ok(ans)
            }
        }
    }
    fn write_block(&mut self, addr: Block, dat: &[u8]) -> STDRESULT {
        trace!("write {}",addr);
        match addr {
            Block::DO([t,s]) => {
                let padded = img::quantize_block(dat, SECTOR_SIZE);
                let offset = self.offset(t,s)?;
                self.data[offset..offset+SECTOR_SIZE].copy_from_slice(&padded);
                Ok(())
            },
            Block::PO(block) => {
                let padded = img::quantize_block(dat, 2*SECTOR_SIZE);
                let ts_list = skew::ts_from_prodos_block(block,&self.kind)?;
                let mut src_offset = 0;
                for [t,s] in ts_list {
                    let offset = self.offset(t,s)?;
                    self.data[offset..offset+SECTOR_SIZE].copy_from_slice(&padded[src_offset..src_offset+SECTOR_SIZE]);
                    src_offset += SECTOR_SIZE;
                }
                Ok(())
            }
        }
    }
    fn from_bytes(data: &[u8]) -> Option<Self> {
        let kind = match data.len() {
            143360 => img::DiskKind::A2_525_16,
            409600 => img::DiskKind::A2_DOS_400,
            _ => return None
        };
        let (tracks,sectors) = kind.dos_geometry()?;
        Some(Self {
            kind,
            tracks: tracks as u16,
            sectors: sectors as u16,
            data: data.to_vec()
        })
    }
    fn what_am_i(&self) -> img::DiskImageType {
        img::DiskImageType::DO
    }
    fn kind(&self) -> img::DiskKind {
        self.kind
    }
    fn to_bytes(&self) -> Vec<u8> {
        return self.data.clone();
    }
}
