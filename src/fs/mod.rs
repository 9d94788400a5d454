//! # File System Module
//!
//! File system modules handle interactions with directories and files.  There is a sub-module for
//! each supported file system.
//!
//! File systems are represented by the `DiskFS` trait.  The trait object takes ownership of
//! some disk image, which it uses as storage.  Files cross the trait boundary in one of two forms:
//! * `FileContent` is a format neutral view, the data fork plus ProDOS style type information.
//!   This is what moves between different file systems, and what the AppleSingle codec carries.
//! * `FileImage` is a low level representation that preserves every detail of a file
//!   within one file system, including sparse structure.
//!
//! This module also contains the `Block` enumeration, which specifies and locates allocation units.
//! The enumeration names the file system's allocation system, and its value is a specific block.
//!
//! Sector skews are not handled here.  Transformation of a `Block` to a physical disk address is
//! handled within the `img` module, with help from `bios`.

pub mod dos3x;
pub mod prodos;
pub mod pascal;
pub mod fimg;

use std::fmt;
use std::str::FromStr;
use std::collections::HashMap;
use crate::img;
use crate::{STDRESULT,DYNERR};

pub const A2_DOS: &str = "a2 dos";
pub const A2_PASCAL: &str = "a2 pascal";
pub const PRODOS: &str = "prodos";

/// Enumerates the failures every file system can report, regardless of its own vocabulary.
/// Drivers raise native errors with the historical messages, `error_kind` maps them onto this.
#[derive(thiserror::Error,Debug,Clone,Copy,PartialEq,Eq)]
pub enum Error {
    #[error("file not found")]
    NotFound,
    #[error("name already exists")]
    NameConflict,
    #[error("disk full")]
    DiskFull,
    #[error("invalid name")]
    InvalidName,
    #[error("name too long")]
    NameTooLong,
    #[error("file is locked")]
    FileLocked,
    #[error("image size does not match the geometry")]
    SizeMismatch,
    #[error("access outside the disk bounds")]
    BoundsError,
    #[error("malformed container")]
    MalformedContainer,
    #[error("target format cannot represent the source")]
    IncompatibleFormat,
    #[error("target size is too small")]
    SizeTooSmall,
    #[error("operation not supported by this file system")]
    Unsupported,
    #[error("file system not compatible with request")]
    FileSystemMismatch,
    #[error("file image format is wrong")]
    FileImageFormat,
    #[error("high level file format is wrong")]
    FileFormat
}

/// Classify any error produced by this crate into one of the shared kinds.
/// Returns None for errors that did not originate here, e.g. host I/O errors.
pub fn error_kind(err: &DYNERR) -> Option<Error> {
    if let Some(e) = err.downcast_ref::<Error>() {
        return Some(*e);
    }
    if let Some(e) = err.downcast_ref::<img::Error>() {
        return Some(match e {
            img::Error::ImageSizeMismatch => Error::SizeMismatch,
            img::Error::SectorAccess => Error::BoundsError,
            img::Error::WriteProtected => Error::FileLocked,
            img::Error::UnknownDiskKind | img::Error::UnknownImageType => Error::IncompatibleFormat,
            img::Error::ImageTypeMismatch | img::Error::IncompatibleDiskKind => Error::IncompatibleFormat
        });
    }
    if let Some(e) = err.downcast_ref::<dos3x::types::Error>() {
        return Some(e.kind());
    }
    if let Some(e) = err.downcast_ref::<prodos::types::Error>() {
        return Some(e.kind());
    }
    if let Some(e) = err.downcast_ref::<pascal::types::Error>() {
        return Some(e.kind());
    }
    if err.downcast_ref::<binrw::Error>().is_some() {
        return Some(Error::MalformedContainer);
    }
    None
}

/// Names the supported file systems, used when creating or converting volumes
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum FsKind {
    Dos33,
    ProDOS,
    Pascal
}

impl fmt::Display for FsKind {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dos33 => write!(f,"{}",A2_DOS),
            Self::ProDOS => write!(f,"{}",PRODOS),
            Self::Pascal => write!(f,"{}",A2_PASCAL)
        }
    }
}

impl FromStr for FsKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s {
            "dos33" | "dos" | A2_DOS => Ok(Self::Dos33),
            "prodos" => Ok(Self::ProDOS),
            "pascal" | A2_PASCAL => Ok(Self::Pascal),
            _ => Err(Error::Unsupported)
        }
    }
}

/// Encapsulates the disk address and addressing mode used by a file system.
/// Disk addresses generally involve some transformation between logical (file system) and physical (disk fields) addresses.
/// The disk image layer has the final responsibility for making this transformation.
/// A DO image should be prepared to process a PO block, since there are many ProDOS DSK images
/// that are DOS ordered, and likewise a PO image will locate a DO track and sector.
#[derive(PartialEq,Eq,Clone,Copy,Hash,Debug)]
pub enum Block {
    /// value is [track,sector]
    DO([usize;2]),
    /// value is block number
    PO(usize)
}

impl fmt::Display for Block {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DO([t,s]) => write!(f,"DOS track {} sector {}",t,s),
            Self::PO(b) => write!(f,"ProDOS block {}",b)
        }
    }
}

/// Format neutral file types a caller can ask for.  Each file system maps these onto its own codes,
/// the canonical number is the ProDOS file type.
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum ItemType {
    Text,
    Binary,
    Applesoft,
    Integer,
    System,
    /// Pascal p-code
    Code,
    /// any other ProDOS file type
    Other(u8)
}

impl ItemType {
    pub fn prodos_type(&self) -> u8 {
        match self {
            Self::Text => 0x04,
            Self::Binary => 0x06,
            Self::Applesoft => 0xfc,
            Self::Integer => 0xfa,
            Self::System => 0xff,
            Self::Code => 0x02,
            Self::Other(t) => *t
        }
    }
    pub fn from_prodos_type(typ: u8) -> Self {
        match typ {
            0x04 => Self::Text,
            0x06 => Self::Binary,
            0xfc => Self::Applesoft,
            0xfa => Self::Integer,
            0xff => Self::System,
            0x02 => Self::Code,
            t => Self::Other(t)
        }
    }
}

impl FromStr for ItemType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        // string can be the number itself, decimal or $hex
        if let Ok(num) = u8::from_str(s) {
            return Ok(Self::from_prodos_type(num));
        }
        if let Some(hex) = s.strip_prefix('$') {
            if let Ok(num) = u8::from_str_radix(hex,16) {
                return Ok(Self::from_prodos_type(num));
            }
        }
        // or a mnemonic
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(Self::Text),
            "bin" => Ok(Self::Binary),
            "bas" | "atok" => Ok(Self::Applesoft),
            "int" | "itok" => Ok(Self::Integer),
            "sys" => Ok(Self::System),
            "code" | "pcd" => Ok(Self::Code),
            _ => Err(Error::IncompatibleFormat)
        }
    }
}

/// Format neutral representation of one file, with ProDOS style metadata.
/// This is transient, it is built for one transfer and not kept.
#[derive(PartialEq,Eq,Clone,Debug)]
pub struct FileContent {
    pub name: String,
    pub data: Vec<u8>,
    pub resource: Option<Vec<u8>>,
    /// ProDOS file type code
    pub file_type: u8,
    /// ProDOS aux type, for binary files this is the load address
    pub aux_type: u16,
    /// ProDOS access bits
    pub access: u8
}

/// full access in ProDOS terms
pub const UNLOCKED_ACCESS: u8 = 0xc3;
/// read only in ProDOS terms
pub const LOCKED_ACCESS: u8 = 0x01;

impl FileContent {
    pub fn new(name: &str,data: &[u8],typ: ItemType,load_addr: Option<u16>) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            resource: None,
            file_type: typ.prodos_type(),
            aux_type: load_addr.unwrap_or(0),
            access: UNLOCKED_ACCESS
        }
    }
    pub fn item_type(&self) -> ItemType {
        ItemType::from_prodos_type(self.file_type)
    }
    /// write or destroy disabled counts as locked
    pub fn is_locked(&self) -> bool {
        self.access & 0x82 != 0x82
    }
}

/// One row of a catalog, independent of the file system.
#[derive(Clone,Debug)]
pub struct CatalogEntry {
    pub name: String,
    /// native type code, for DOS the lock bit is removed
    pub fs_type: u8,
    /// native type mnemonic
    pub type_name: String,
    /// size in the file system's allocation units (sectors for DOS, blocks otherwise)
    pub units: usize,
    /// length in bytes if the file system records it
    pub eof: Option<usize>,
    /// aux type or load address, if it can be found in the catalog
    pub aux: Option<u16>,
    /// first allocation unit, for DOS this is the track/sector list
    pub start: Block,
    pub locked: bool,
    pub deleted: bool,
    pub modified: Option<chrono::NaiveDateTime>,
    /// the row printed by the native catalog command
    pub native: String
}

/// Volume statistics
#[derive(Clone,Debug)]
pub struct Stat {
    /// one of `A2_DOS`, `PRODOS`, `A2_PASCAL`
    pub fs_name: String,
    pub label: String,
    /// bytes in an allocation unit
    pub block_size: usize,
    pub total_blocks: usize,
    pub free_blocks: usize,
    pub file_count: usize,
    /// size of the largest contiguous free area, only meaningful for Pascal
    pub largest_free: usize
}

/// Selects how a catalog is turned into text
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum DisplayMode {
    /// names only
    Standard,
    /// columns as the native operating system would print them
    Native,
    /// every field, including deleted entries still visible in the catalog
    Detailed
}

impl FromStr for DisplayMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "native" => Ok(Self::Native),
            "detail" | "detailed" => Ok(Self::Detailed),
            _ => Err(Error::Unsupported)
        }
    }
}

impl DisplayMode {
    /// Produce the lines of a catalog listing.  This never changes the data.
    pub fn render(&self,stat: &Stat,entries: &[CatalogEntry]) -> Vec<String> {
        let mut ans: Vec<String> = Vec::new();
        match self {
            Self::Standard => {
                for entry in entries.iter().filter(|e| !e.deleted) {
                    ans.push(entry.name.clone());
                }
            },
            Self::Native => {
                match stat.fs_name.as_str() {
                    A2_DOS => ans.push(format!("DISK VOLUME {}",stat.label)),
                    PRODOS => ans.push(format!("/{}",stat.label)),
                    _ => ans.push(format!("{}:",stat.label))
                }
                let mut listed = 0;
                for entry in entries.iter().filter(|e| !e.deleted) {
                    ans.push(entry.native.clone());
                    listed += 1;
                }
                match stat.fs_name.as_str() {
                    PRODOS => ans.push(format!("BLOCKS FREE: {:5}     BLOCKS USED: {:5}     TOTAL BLOCKS: {:5}",
                        stat.free_blocks,stat.total_blocks-stat.free_blocks,stat.total_blocks)),
                    A2_PASCAL => ans.push(format!("{}/{} files<listed/in-dir>, {} blocks used, {} unused, {} in largest",
                        listed,stat.file_count,stat.total_blocks-stat.free_blocks,stat.free_blocks,stat.largest_free)),
                    _ => {}
                }
            },
            Self::Detailed => {
                ans.push(format!("{}\t{}\t{} of {} units free\t{} bytes per unit",stat.fs_name,stat.label,stat.free_blocks,stat.total_blocks,stat.block_size));
                for entry in entries {
                    let eof = match entry.eof { Some(n) => n.to_string(), None => "-".to_string() };
                    let aux = match entry.aux { Some(a) => format!("${:04X}",a), None => "-".to_string() };
                    let modified = match entry.modified {
                        Some(t) => t.format("%d-%b-%y %H:%M").to_string(),
                        None => "-".to_string()
                    };
                    let flags = match (entry.locked,entry.deleted) {
                        (_,true) => "deleted",
                        (true,false) => "locked",
                        (false,false) => "-"
                    };
                    ans.push(format!("{}\t{}(${:02X})\t{}\t{}\t{}\t{}\t{}\t{}",
                        entry.name,entry.type_name,entry.fs_type,entry.units,eof,aux,entry.start,flags,modified));
                }
            }
        }
        ans
    }
}

/// This is an abstraction of a sparse file and its metadata.
/// Sequential files are a special case.  Metadata items are represented by a Vec<u8>
/// that contains the same byte ordering that is stored on disk.  In the JSON representation
/// these become hex strings.  The `DiskFS` is responsible for further interpretation.
/// The data itself is stored in a map with a numerical chunk id as the key, and a Vec<u8>
/// as the chunk data.  The JSON representation uses decimal strings for the key and hex
/// strings for the data.  *Beware of sorting routines that put "10" before "9"*.
///
/// Each `DiskFS` provides its own routine for creating an empty file image.
/// Unused metadata can be represented by an empty vector.
#[derive(Clone,Debug,PartialEq)]
pub struct FileImage {
    /// Version of the file image format, such as "2.0.0"
    pub fimg_version: String,
    /// UTF8 string naming the file system
    pub file_system: String,
    /// length of a chunk
    pub chunk_len: usize,
    /// length of the file were it serialized
    pub eof: Vec<u8>,
    /// file type, encoding varies by file system
    pub fs_type: Vec<u8>,
    /// auxiliary file information, encoding varies by file system
    pub aux: Vec<u8>,
    /// The access control bits, encoding varies by file system
    pub access: Vec<u8>,
    /// The creation time, encoding varies by file system
    pub created: Vec<u8>,
    /// The modified time, encoding varies by file system
    pub modified: Vec<u8>,
    /// Some version
    pub version: Vec<u8>,
    /// Some minimum version
    pub min_version: Vec<u8>,
    /// The name the file had on its volume
    pub name: String,
    /// The key is an ordered chunk number starting at 0, no relation to any disk location.
    pub chunks: HashMap<usize,Vec<u8>>
}

/// Abstract file system interface.  Presumed to own an underlying DiskImage.
/// Every mutating call either commits completely or leaves the volume unchanged.
pub trait DiskFS {
    /// Create an empty file image appropriate for this file system
    fn new_fimg(&self) -> FileImage;
    /// Volume name and space statistics
    fn stat(&mut self) -> Result<Stat,DYNERR>;
    /// List the files in catalog order.  Deleted entries that remain visible are only included on request.
    fn catalog(&mut self,include_deleted: bool) -> Result<Vec<CatalogEntry>,DYNERR>;
    /// Live entries that hold file data, directories are skipped with a warning
    fn files(&mut self) -> Result<Vec<CatalogEntry>,DYNERR> {
        let fs_name = self.stat()?.fs_name;
        Ok(self.catalog(false)?.into_iter().filter(|entry| {
            if fs_name==PRODOS && entry.fs_type==prodos::types::DIR_TYPE {
                log::warn!("skipping directory {}",entry.name);
                return false;
            }
            true
        }).collect())
    }
    /// Render the catalog as text lines
    fn catalog_to_vec(&mut self,mode: DisplayMode) -> Result<Vec<String>,DYNERR> {
        let entries = self.catalog(mode==DisplayMode::Detailed)?;
        let stat = self.stat()?;
        Ok(mode.render(&stat,&entries))
    }
    /// Change the volume name, for DOS this is the volume number
    fn rename_volume(&mut self,name: &str) -> STDRESULT;
    /// Delete a file, its storage goes back to the free map
    fn delete(&mut self,name: &str) -> STDRESULT;
    /// Rename a file
    fn rename(&mut self,old_name: &str,new_name: &str) -> STDRESULT;
    /// write protect a file
    fn lock(&mut self,name: &str) -> STDRESULT;
    /// remove write protection from a file
    fn unlock(&mut self,name: &str) -> STDRESULT;
    /// Change the type of a file
    fn retype(&mut self,name: &str,typ: ItemType) -> STDRESULT;
    /// Read a file into the format neutral representation, any header the file system keeps is stripped
    fn get(&mut self,name: &str) -> Result<FileContent,DYNERR>;
    /// Create a new file from the format neutral representation, returns the allocation units used.
    /// Existing files are never overwritten.
    fn put(&mut self,content: &FileContent) -> Result<usize,DYNERR>;
    /// Read a file into a generalized representation
    fn read_any(&mut self,name: &str) -> Result<FileImage,DYNERR>;
    /// Write a file from a generalized representation, the name is taken from the image
    fn write_any(&mut self,fimg: &FileImage) -> Result<usize,DYNERR>;
    /// Mutably borrow the underlying disk image
    fn get_img(&mut self) -> &mut Box<dyn img::DiskImage>;
}

#[test]
fn test_item_type() {
    assert_eq!(ItemType::from_str("bin").unwrap(),ItemType::Binary);
    assert_eq!(ItemType::from_str("BAS").unwrap(),ItemType::Applesoft);
    assert_eq!(ItemType::from_str("$C1").unwrap(),ItemType::Other(0xc1));
    assert_eq!(ItemType::from_str("255").unwrap(),ItemType::System);
    assert!(ItemType::from_str("xyz").is_err());
}

#[test]
fn test_standard_display() {
    let stat = Stat {
        fs_name: PRODOS.to_string(),
        label: "TEST".to_string(),
        block_size: 512,
        total_blocks: 280,
        free_blocks: 273,
        file_count: 1,
        largest_free: 273
    };
    let entry = CatalogEntry {
        name: "HELLO".to_string(),
        fs_type: 0x06,
        type_name: "BIN".to_string(),
        units: 1,
        eof: Some(10),
        aux: Some(0x300),
        start: Block::PO(7),
        locked: false,
        deleted: false,
        modified: None,
        native: " HELLO BIN".to_string()
    };
    let mut gone = entry.clone();
    gone.name = "GONE".to_string();
    gone.deleted = true;
    let entries = vec![entry,gone];
    assert_eq!(DisplayMode::Standard.render(&stat,&entries),vec!["HELLO".to_string()]);
    let native = DisplayMode::Native.render(&stat,&entries);
    assert_eq!(native[0],"/TEST");
    assert_eq!(native.len(),3);
    let detail = DisplayMode::Detailed.render(&stat,&entries);
    assert_eq!(detail.len(),3);
    assert!(detail[1].contains("$0300"));
    assert!(detail[2].contains("deleted"));
}
