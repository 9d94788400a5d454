use num_derive::FromPrimitive;
use chrono::Datelike;
use crate::fs::ItemType;

pub const BLOCK_SIZE: usize = 512;
pub const VOL_HEADER_BLOCK: usize = 2;
/// first block after the directory
pub const DIR_END_BLOCK: usize = 6;
pub const ENTRY_SIZE: usize = 26;
/// entries that fit in the 4 directory blocks after the header
pub const MAX_FILES: usize = 77;
pub const VOL_NAME_LEN: usize = 7;
pub const NAME_LEN: usize = 15;
pub const INVALID_CHARS: &str = " $=?,[#:";

/// Enumerates Pascal errors.  The `Display` trait will print the long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("parity error (CRC)")]
    BadBlock,
    #[error("illegal operation")]
    BadMode,
    #[error("lost file")]
    LostFile,
    #[error("illegal filename")]
    BadTitle,
    #[error("insufficient space")]
    NoRoom,
    #[error("no file")]
    NoFile,
    #[error("duplicate filename")]
    DuplicateFilename,
    #[error("error reading real or integer")]
    BadFormat,
    #[error("disk is write protected")]
    WriteProtected,
    #[error("failed to complete read or write")]
    DevErr
}

impl Error {
    pub fn kind(&self) -> crate::fs::Error {
        use crate::fs::Error as E;
        match self {
            Self::BadBlock | Self::DevErr => E::BoundsError,
            Self::BadMode => E::Unsupported,
            Self::LostFile | Self::BadFormat => E::FileFormat,
            Self::BadTitle => E::InvalidName,
            Self::NoRoom => E::DiskFull,
            Self::NoFile => E::NotFound,
            Self::DuplicateFilename => E::NameConflict,
            Self::WriteProtected => E::FileLocked
        }
    }
}

/// Map file type codes to strings for display
pub const TYPE_MAP_DISP: [(u8,&str);9] = [
    (0x00, "NONE"),
    (0x01, "BAD"),
    (0x02, "CODE"),
    (0x03, "TEXT"),
    (0x04, "INFO"),
    (0x05, "DATA"),
    (0x06, "GRAF"),
    (0x07, "FOTO"),
    (0x08, "SECURE")
];

/// Enumerates the basic file types, available conversions are:
/// * FileType to u8,u16,u32: `as u8` etc.
/// * u8,u16,u32 to FileType: `FileType::from_u8` etc., (use FromPrimitive trait)
#[derive(FromPrimitive,PartialEq,Clone,Copy,Debug)]
pub enum FileType {
    Non = 0x00,
    Bad = 0x01,
    Code = 0x02,
    Text = 0x03,
    Info = 0x04,
    Data = 0x05,
    Graf = 0x06,
    Foto = 0x07,
    Secure = 0x08
}

impl FileType {
    pub fn mnemonic(&self) -> &'static str {
        TYPE_MAP_DISP[*self as usize].1
    }
    /// Pascal distinguishes code and text, everything else is data
    pub fn from_item(typ: ItemType) -> Self {
        match typ.prodos_type() {
            0x02 => Self::Code,
            0x03 | 0x04 => Self::Text,
            _ => Self::Data
        }
    }
    pub fn to_item(&self) -> ItemType {
        match self {
            Self::Code => ItemType::Code,
            Self::Text => ItemType::Text,
            _ => ItemType::Binary
        }
    }
}

/// Pack the date in the Pascal 2 byte format, defaults to today
pub fn pack_date(time: Option<chrono::NaiveDateTime>) -> [u8;2] {
    let now = match time {
        Some(t) => t,
        _ => chrono::Local::now().naive_local()
    };
    let (_is_common_era,year) = now.year_ce();
    let packed_date = (now.month() + (now.day() << 4) + ((year%100) << 9)) as u16;
    u16::to_le_bytes(packed_date)
}

/// Unpack a Pascal date, two digit years below 40 are taken to be 20xx.
/// Returns None if the date is not set or not valid.
pub fn unpack_date(pascal_date: [u8;2]) -> Option<chrono::NaiveDateTime> {
    let date = u16::from_le_bytes(pascal_date);
    if date==0 {
        return None;
    }
    let yearmod100 = date >> 9;
    let year = if yearmod100 < 40 { 2000 + yearmod100 } else { 1900 + yearmod100 };
    let month = date & 15;
    let day = (date >> 4) & 31;
    chrono::NaiveDate::from_ymd_opt(year as i32,month as u32,day as u32)?.and_hms_opt(0,0,0)
}

#[test]
fn test_date_packing() {
    let t = chrono::NaiveDate::from_ymd_opt(1984,3,17).unwrap().and_hms_opt(0,0,0).unwrap();
    let packed = pack_date(Some(t));
    assert_eq!(u16::from_le_bytes(packed),3 + (17 << 4) + (84 << 9));
    assert_eq!(unpack_date(packed),Some(t));
    assert_eq!(unpack_date([0,0]),None);
    assert_eq!(FileType::from_item(ItemType::Text),FileType::Text);
    assert_eq!(FileType::from_item(ItemType::Other(0x03)),FileType::Text);
    assert_eq!(FileType::from_item(ItemType::Applesoft),FileType::Data);
    assert_eq!(FileType::Code.mnemonic(),"CODE");
}
