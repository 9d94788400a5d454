//! # Disk Image Module
//!
//! Disk images are represented by objects implementing the `DiskImage` trait.
//! The object type is named for the disk image type that it handles, e.g., `PO`.
//! This object is best thought of as the raw medium, it knows nothing about files.
//!
//! ## Relation to File Systems
//!
//! The `DiskImage` trait object serves as the underlying storage for `fs` modules.
//! The `fs` modules work by reading blocks from, or writing blocks to, the disk image.
//! The task of mapping blocks to sectors happens in submodules of `img`, with
//! the aid of `bios::skew`, but never with any help from `fs`.
//! A disk image can refuse a request as out of scope or out of bounds.
//!
//! ## Buffering
//!
//! All images are held in memory.  Nothing is written to the host until the caller
//! serializes the image with `to_bytes` (see `crate::save_img`).

pub mod dsk_do;
pub mod dsk_po;
pub mod dot2mg;

use std::str::FromStr;
use std::fmt;
use crate::fs::Block;
use crate::{STDRESULT,DYNERR};

/// Enumerates disk image errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("unknown kind of disk")]
    UnknownDiskKind,
    #[error("unknown image type")]
    UnknownImageType,
    #[error("image size did not match any supported geometry")]
    ImageSizeMismatch,
    #[error("image type not compatible with request")]
    ImageTypeMismatch,
    #[error("disk kind not compatible with the addressing mode")]
    IncompatibleDiskKind,
    #[error("unable to access sector")]
    SectorAccess,
    #[error("image is write protected")]
    WriteProtected
}

/// Fixed set of media capacities.  Each maps onto a definite count of 512 byte blocks,
/// although the DO images address them as 256 byte sectors.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum DiskKind {
    Unknown,
    /// 5.25 inch floppy, 35 tracks, 16 sectors, 140K
    A2_525_16,
    /// large DOS volume, 50 tracks, 32 sectors, 400K
    A2_DOS_400,
    /// 3.5 inch floppy, 1600 blocks, 800K
    A2_35_800,
    /// logical volume with the given block count
    LogicalBlocks(usize)
}

impl DiskKind {
    /// Map a block count to the matching kind, unusual counts become `LogicalBlocks`
    pub fn from_blocks(blocks: usize) -> Self {
        match blocks {
            280 => Self::A2_525_16,
            1600 => Self::A2_35_800,
            b => Self::LogicalBlocks(b)
        }
    }
    pub fn block_count(&self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::A2_525_16 => 280,
            Self::A2_DOS_400 => 800,
            Self::A2_35_800 => 1600,
            Self::LogicalBlocks(b) => *b
        }
    }
    /// (tracks,sectors) if the kind has a DOS 3.3 style geometry
    pub fn dos_geometry(&self) -> Option<(u8,u8)> {
        match self {
            Self::A2_525_16 => Some((35,16)),
            Self::A2_DOS_400 => Some((50,32)),
            _ => None
        }
    }
}

impl fmt::Display for DiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f,"unknown"),
            Self::A2_525_16 => write!(f,"Apple 5.25 inch 16 sector"),
            Self::A2_DOS_400 => write!(f,"Apple DOS 400K volume"),
            Self::A2_35_800 => write!(f,"Apple 3.5 inch 800K"),
            Self::LogicalBlocks(b) => write!(f,"logical volume with {} blocks",b)
        }
    }
}

impl FromStr for DiskKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "140k" | "5.25in" => Ok(Self::A2_525_16),
            "400k" => Ok(Self::A2_DOS_400),
            "800k" | "3.5in" => Ok(Self::A2_35_800),
            _ => match usize::from_str(s) {
                Ok(blocks) => Ok(Self::from_blocks(blocks)),
                Err(_) => Err(Error::UnknownDiskKind)
            }
        }
    }
}

#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum DiskImageType {
    DO,
    PO,
    DOT2MG
}

impl fmt::Display for DiskImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DO => write!(f,"do"),
            Self::PO => write!(f,"po"),
            Self::DOT2MG => write!(f,"2mg")
        }
    }
}

impl FromStr for DiskImageType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "do" => Ok(Self::DO),
            "po" => Ok(Self::PO),
            "2mg" | "2img" => Ok(Self::DOT2MG),
            _ => Err(Error::UnknownImageType)
        }
    }
}

/// The main trait for working with any kind of disk image.
/// The corresponding trait object serves as storage for `DiskFS`.
pub trait DiskImage {
    fn track_count(&self) -> usize;
    /// number of bytes in the disk data, not counting any header
    fn byte_capacity(&self) -> usize;
    fn block_count(&self) -> usize {
        self.byte_capacity()/512
    }
    /// Read the allocation unit `addr`, out of range addresses are an error
    fn read_block(&mut self,addr: Block) -> Result<Vec<u8>,DYNERR>;
    /// Write the allocation unit `addr`, data is padded or truncated to the unit size
    fn write_block(&mut self,addr: Block,dat: &[u8]) -> STDRESULT;
    /// Try to interpret the bytes as this kind of image, returns None if size or header is wrong
    fn from_bytes(data: &[u8]) -> Option<Self> where Self: Sized;
    fn what_am_i(&self) -> DiskImageType;
    fn kind(&self) -> DiskKind;
    /// Serialize the image exactly as it should be saved on the host
    fn to_bytes(&self) -> Vec<u8>;
}

/// Pad with zeros or truncate as needed to match the allocation unit
pub fn quantize_block(src: &[u8],size: usize) -> Vec<u8> {
    let mut padded: Vec<u8> = Vec::new();
    for i in 0..size {
        if i<src.len() {
            padded.push(src[i])
        } else {
            padded.push(0);
        }
    }
    return padded;
}

#[test]
fn test_quantize() {
    assert_eq!(quantize_block(&[1,2,3],5),vec![1,2,3,0,0]);
    assert_eq!(quantize_block(&[1,2,3,4,5,6],4),vec![1,2,3,4]);
}

#[test]
fn test_kind_parse() {
    assert_eq!(DiskKind::from_str("140k").unwrap(),DiskKind::A2_525_16);
    assert_eq!(DiskKind::from_str("1600").unwrap(),DiskKind::A2_35_800);
    assert_eq!(DiskKind::from_str("3200").unwrap(),DiskKind::LogicalBlocks(3200));
    assert!(DiskKind::from_str("huge").is_err());
    assert_eq!(DiskKind::A2_DOS_400.dos_geometry(),Some((50,32)));
}
