//! ## Sector Skewing Module
//!
//! Block to sector transformations shared by the disk images.  DOS ordered images store
//! sectors in DOS logical order, so a ProDOS block lands on two scattered sectors of one track.
//! ProDOS ordered images store blocks in sequence, so a DOS sector is half of some block.

use log::{trace,debug};
use crate::img::{DiskKind,Error};
use crate::DYNERR;

/// first DOS logical sector of each block within a track
const BLOCK_SECTOR1: [usize;8] = [0,13,11,9,7,5,3,1];
/// second DOS logical sector of each block within a track
const BLOCK_SECTOR2: [usize;8] = [14,12,10,8,6,4,2,15];

/// Get block number and byte offset into block corresponding to
/// track and DOS logical sector.  Returned in tuple (block,offset).
/// Only the 16 sector layout has a standard mapping.
pub fn prodos_block_from_ts(track: usize,sector: usize) -> Result<(usize,usize),DYNERR> {
    if sector>15 {
        debug!("sector {} cannot be mapped to a block",sector);
        return Err(Box::new(Error::IncompatibleDiskKind));
    }
    let block_offset: [usize;16] = [0,7,6,6,5,5,4,4,3,3,2,2,1,1,0,7];
    let byte_offset: [usize;16] = [0,0,256,0,256,0,256,0,256,0,256,0,256,0,256,256];
    Ok((8*track + block_offset[sector], byte_offset[sector]))
}

/// Get the pair of [track,logical sector] that hold a ProDOS block on a DOS ordered
/// 5.25 inch disk.  The pair is in order, first half of the block first.
pub fn ts_from_prodos_block(block: usize,kind: &DiskKind) -> Result<Vec<[usize;2]>,DYNERR> {
    match *kind {
        DiskKind::A2_525_16 => {
            let [track,sec1,sec2] = [block/8,BLOCK_SECTOR1[block%8],BLOCK_SECTOR2[block%8]];
            trace!("locate block for 5.25 inch disk: track {}, sectors {},{}",track,sec1,sec2);
            Ok(vec![[track,sec1],[track,sec2]])
        },
        _ => {
            debug!("cannot map ProDOS block to {}",*kind);
            Err(Box::new(Error::IncompatibleDiskKind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_and_sector_agree() {
        for block in 0..280 {
            let ts = ts_from_prodos_block(block,&DiskKind::A2_525_16).expect("mapping failed");
            assert_eq!(prodos_block_from_ts(ts[0][0],ts[0][1]).unwrap(),(block,0));
            assert_eq!(prodos_block_from_ts(ts[1][0],ts[1][1]).unwrap(),(block,256));
        }
    }

    #[test]
    fn volume_directory_sectors() {
        // block 2 is the ProDOS volume key block
        assert_eq!(ts_from_prodos_block(2,&DiskKind::A2_525_16).unwrap(),vec![[0,11],[0,10]]);
        assert!(ts_from_prodos_block(2,&DiskKind::A2_35_800).is_err());
    }
}
