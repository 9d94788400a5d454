use num_derive::FromPrimitive;
use chrono::{Datelike,Timelike};
use std::collections::HashMap;

pub const BLOCK_SIZE: usize = 512;
pub const VOL_KEY_BLOCK: u16 = 2;
/// last block of the volume directory
pub const VOL_DIR_END: u16 = 5;
pub const BITMAP_BLOCK: u16 = 6;
pub const ENTRY_SIZE: usize = 0x27;
pub const ENTRIES_PER_BLOCK: usize = 13;
pub const MAX_DIRECTORY_REPS: usize = 100;
pub const NAME_LEN: usize = 15;
/// file type code of a directory
pub const DIR_TYPE: u8 = 0x0f;
/// data blocks one index block can point to
pub const INDEX_PTRS: usize = 256;
/// index blocks a master index block can point to
pub const MASTER_PTRS: usize = 128;

#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("RANGE ERROR")]
    Range = 2,
    #[error("WRITE PROTECTED")]
    WriteProtected = 4,
    #[error("END OF DATA")]
    EndOfData = 5,
    #[error("PATH NOT FOUND")]
    PathNotFound = 6,
    #[error("I/O ERROR")]
    IOError = 8,
    #[error("DISK FULL")]
    DiskFull = 9,
    #[error("FILE LOCKED")]
    FileLocked = 10,
    #[error("FILE TYPE MISMATCH")]
    FileTypeMismatch = 13,
    #[error("SYNTAX ERROR")]
    Syntax = 16,
    #[error("DIRECTORY FULL")]
    DirectoryFull = 17,
    #[error("DUPLICATE FILENAME")]
    DuplicateFilename = 19,
    #[error("FILE NOT FOUND")]
    FileNotFound = 70
}

impl Error {
    pub fn kind(&self) -> crate::fs::Error {
        use crate::fs::Error as E;
        match self {
            Self::Range => E::BoundsError,
            Self::EndOfData | Self::IOError => E::FileFormat,
            Self::PathNotFound | Self::FileNotFound => E::NotFound,
            Self::DiskFull | Self::DirectoryFull => E::DiskFull,
            Self::WriteProtected | Self::FileLocked => E::FileLocked,
            Self::FileTypeMismatch => E::IncompatibleFormat,
            Self::Syntax => E::InvalidName,
            Self::DuplicateFilename => E::NameConflict
        }
    }
}

/// Map file type codes to strings for display
pub const TYPE_MAP_DISP: [(u8,&str);39] = [
    (0x00, "???"),
    (0x01, "BAD"),
    (0x02, "PCD"), // Pascal code
    (0x03, "PTX"), // Pascal text
    (0x04, "TXT"),
    (0x05, "PDA"), // Pascal data
    (0x06, "BIN"),
    (0x07, "FON"), // SOS
    (0x08, "FOT"), // Photo
    (0x09, "BAS"), // SOS
    (0x0a, "DAT"), // SOS
    (0x0b, "WRD"), // SOS
    (0x0c, "SYS"), // SOS
    (0x0f, "DIR"),
    (0x10, "RPD"), // SOS
    (0x11, "RPX"), // SOS
    (0x12, "AFD"), // SOS
    (0x13, "AFM"), // SOS
    (0x14, "AFR"), // SOS
    (0x15, "SLB"), // SOS
    (0x19, "AWD"), // AppleWorks Data Base
    (0x1a, "AWW"), // AppleWorks Word Processor
    (0x1b, "AWS"), // AppleWorks Spreadsheet
    (0xef, "PSA"), // Pascal area
    (0xf0, "CMD"),
    (0xf1, "USR"),
    (0xf2, "USR"),
    (0xf3, "USR"),
    (0xf4, "USR"),
    (0xf5, "USR"),
    (0xf6, "USR"),
    (0xf7, "USR"),
    (0xf8, "USR"),
    (0xfa, "INT"),
    (0xfb, "IVR"),
    (0xfc, "BAS"),
    (0xfd, "VAR"),
    (0xfe, "REL"),
    (0xff, "SYS")
];

/// mnemonic for a type code, unknown codes are shown in hex
pub fn type_mnemonic(typ: u8) -> String {
    let typ_map: HashMap<u8,&str> = HashMap::from(TYPE_MAP_DISP);
    match typ_map.get(&typ) {
        Some(s) => s.to_string(),
        None => format!("${:02X}",typ)
    }
}

#[derive(Clone,Copy,FromPrimitive,PartialEq,Debug)]
pub enum StorageType {
    Inactive = 0x00,
    Seedling = 0x01,
    Sapling = 0x02,
    Tree = 0x03,
    Pascal = 0x04,
    SubDirEntry = 0x0d,
    SubDirHeader = 0x0e,
    VolDirHeader = 0x0f
}

#[derive(Clone,Copy,FromPrimitive)]
pub enum Access {
    Read = 0x01,
    Write = 0x02,
    Backup = 0x20,
    Rename = 0x40,
    Destroy = 0x80
}

/// Locates an entry, `idx` counts from 0 within the entries of the directory block
#[derive(Clone,Copy,PartialEq,Debug)]
pub struct EntryLocation {
    pub block: u16,
    pub idx: usize
}

/// Pack the date and time in the ProDOS 4 byte format, defaults to now.
pub fn pack_time(time: Option<chrono::NaiveDateTime>) -> [u8;4] {
    let now = match time {
        Some(t) => t,
        None => chrono::Local::now().naive_local()
    };
    let date = now.day() as u16 + ((now.month() as u16) << 5) + (((now.year() % 100) as u16) << 9);
    let minutes = now.minute() as u16 + ((now.hour() as u16) << 8);
    let [d0,d1] = u16::to_le_bytes(date);
    let [m0,m1] = u16::to_le_bytes(minutes);
    [d0,d1,m0,m1]
}

/// Unpack a ProDOS time stamp, two digit years below 40 are taken to be 20xx.
/// Returns None if the date is not set or not valid.
pub fn unpack_time(prodos_date_time: [u8;4]) -> Option<chrono::NaiveDateTime> {
    let date = u16::from_le_bytes([prodos_date_time[0],prodos_date_time[1]]);
    let time = u16::from_le_bytes([prodos_date_time[2],prodos_date_time[3]]);
    if date==0 {
        return None;
    }
    let yearmod100 = date >> 9;
    let year = if yearmod100 < 40 { 2000 + yearmod100 } else { 1900 + yearmod100 };
    let month = (date >> 5) & 0x0f;
    let day = date & 0x1f;
    let hour = (time >> 8) & 0x1f;
    let minute = time & 0x3f;
    let date = chrono::NaiveDate::from_ymd_opt(year as i32,month as u32,day as u32)?;
    date.and_hms_opt(hour as u32,minute as u32,0)
}

#[test]
fn test_time_packing() {
    let t = chrono::NaiveDate::from_ymd_opt(1987,9,28).unwrap().and_hms_opt(13,45,0).unwrap();
    let packed = pack_time(Some(t));
    // 28 + 9*32 + 87*512
    assert_eq!(u16::from_le_bytes([packed[0],packed[1]]),28 + 288 + 44544);
    assert_eq!(packed[2..4],[45,13]);
    assert_eq!(unpack_time(packed),Some(t));
    let t = chrono::NaiveDate::from_ymd_opt(2026,1,2).unwrap().and_hms_opt(0,5,0).unwrap();
    assert_eq!(unpack_time(pack_time(Some(t))),Some(t));
    assert_eq!(unpack_time([0,0,0,0]),None);
}
