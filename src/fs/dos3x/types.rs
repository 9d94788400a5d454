use num_derive::FromPrimitive;
use crate::fs::ItemType;

pub const VTOC_TRACK: u8 = 17;
pub const MAX_DIRECTORY_REPS: usize = 100;
pub const MAX_TSLIST_REPS: usize = 1000;
/// track/sector pairs in one track/sector list sector
pub const MAX_PAIRS: u8 = 0x7a;
pub const SECTOR_SIZE: usize = 256;
pub const ENTRIES_PER_SECTOR: usize = 7;
pub const NAME_LEN: usize = 30;
pub const LOCK_BIT: u8 = 0x80;

/// Enumerates DOS errors.  The `Display` trait will print equivalent DOS message such as `FILE NOT FOUND`.  Following DOS errors are omitted:
/// LANGUAGE NOT AVAILABLE, NO BUFFERS AVAILABLE, PROGRAM TOO LARGE, NOT DIRECT COMMAND
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("RANGE ERROR")]
    Range,
    #[error("END OF DATA")]
    EndOfData,
    #[error("FILE NOT FOUND")]
    FileNotFound,
    #[error("VOLUME MISMATCH")]
    VolumeMismatch,
    #[error("I/O ERROR")]
    IOError,
    #[error("DISK FULL")]
    DiskFull,
    #[error("FILE LOCKED")]
    FileLocked,
    #[error("FILE TYPE MISMATCH")]
    FileTypeMismatch,
    #[error("WRITE PROTECTED")]
    WriteProtected,
    #[error("SYNTAX ERROR")]
    SyntaxError
}

impl Error {
    pub fn kind(&self) -> crate::fs::Error {
        use crate::fs::Error as E;
        match self {
            Self::Range => E::BoundsError,
            Self::EndOfData | Self::IOError => E::FileFormat,
            Self::FileNotFound => E::NotFound,
            Self::VolumeMismatch => E::InvalidName,
            Self::DiskFull => E::DiskFull,
            Self::FileLocked | Self::WriteProtected => E::FileLocked,
            Self::FileTypeMismatch => E::IncompatibleFormat,
            Self::SyntaxError => E::InvalidName
        }
    }
}

/// Enumerates the DOS file types, available conversions are:
/// * FileType to u8: `as u8`
/// * u8 to FileType: `FileType::from_u8` (use FromPrimitive trait)
#[derive(FromPrimitive,PartialEq,Clone,Copy,Debug)]
pub enum FileType {
    Text = 0x00,
    Integer = 0x01,
    Applesoft = 0x02,
    Binary = 0x04,
    S = 0x08,
    R = 0x10,
    NewA = 0x20,
    NewB = 0x40
}

impl FileType {
    /// the letter DOS shows in the catalog
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Text => "T",
            Self::Integer => "I",
            Self::Applesoft => "A",
            Self::Binary => "B",
            Self::S => "S",
            Self::R => "R",
            Self::NewA => "A",
            Self::NewB => "B"
        }
    }
    /// DOS has only a few types, anything unknown becomes binary
    pub fn from_item(typ: ItemType) -> Self {
        match typ.prodos_type() {
            0x04 => Self::Text,
            0xfa => Self::Integer,
            0xfc => Self::Applesoft,
            _ => Self::Binary
        }
    }
    pub fn to_item(&self) -> ItemType {
        match self {
            Self::Text => ItemType::Text,
            Self::Integer => ItemType::Integer,
            Self::Applesoft => ItemType::Applesoft,
            _ => ItemType::Binary
        }
    }
}

/// Prepend the header DOS keeps with the data: BASIC programs start with the length,
/// binary files with the load address and length, text is terminated by a null.
pub fn pack_data(typ: FileType,dat: &[u8],load_addr: u16) -> Result<Vec<u8>,Error> {
    if dat.len() > u16::MAX as usize && typ!=FileType::Text {
        return Err(Error::Range);
    }
    // a null ends DOS text
    if typ==FileType::Text && dat.contains(&0) {
        return Err(Error::FileTypeMismatch);
    }
    let len = u16::to_le_bytes(dat.len() as u16);
    Ok(match typ {
        FileType::Text => [dat,&[0u8][..]].concat(),
        FileType::Integer | FileType::Applesoft => [&len[..],dat].concat(),
        FileType::Binary => [&u16::to_le_bytes(load_addr)[..],&len[..],dat].concat(),
        _ => dat.to_vec()
    })
}

/// Strip the header, returns (load address,data).  Types without a header come back whole.
pub fn unpack_data(typ: FileType,dat: &[u8]) -> Result<(u16,Vec<u8>),Error> {
    match typ {
        FileType::Text => {
            let end = dat.iter().position(|x| *x==0).unwrap_or(dat.len());
            Ok((0,dat[0..end].to_vec()))
        },
        FileType::Integer | FileType::Applesoft => {
            if dat.len() < 2 {
                return Err(Error::EndOfData);
            }
            let end = 2 + u16::from_le_bytes([dat[0],dat[1]]) as usize;
            if end > dat.len() {
                return Err(Error::EndOfData);
            }
            Ok((0,dat[2..end].to_vec()))
        },
        FileType::Binary => {
            if dat.len() < 4 {
                return Err(Error::EndOfData);
            }
            let end = 4 + u16::from_le_bytes([dat[2],dat[3]]) as usize;
            if end > dat.len() {
                return Err(Error::EndOfData);
            }
            Ok((u16::from_le_bytes([dat[0],dat[1]]),dat[4..end].to_vec()))
        },
        _ => Ok((0,dat.to_vec()))
    }
}

#[test]
fn test_headers() {
    let packed = pack_data(FileType::Binary,&[1,2,3],0x2000).expect("pack failed");
    assert_eq!(packed,vec![0x00,0x20,3,0,1,2,3]);
    // sector padding is ignored
    let padded = [packed,vec![0;249]].concat();
    assert_eq!(unpack_data(FileType::Binary,&padded).unwrap(),(0x2000,vec![1,2,3]));
    let packed = pack_data(FileType::Applesoft,&[0xab;5],0).expect("pack failed");
    assert_eq!(&packed[0..2],&[5,0]);
    assert_eq!(pack_data(FileType::Text,&[0xc1],0).unwrap(),vec![0xc1,0]);
    assert!(pack_data(FileType::Text,&[0xc1,0,0xc2],0).is_err());
    assert!(unpack_data(FileType::Integer,&[10,0,1]).is_err());
}
