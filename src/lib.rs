//! # `a2store` main library
//!
//! This library manipulates Apple II disk images at the level of files and volumes.
//! It understands three incompatible file systems and can move files between them.
//!
//! ## Architecture
//!
//! Disk image operations are built around three abstractions:
//! * `img::DiskImage` stores sectors or blocks, does not try to interpret a file system
//! * `fs::DiskFS` imposes a file system on the image
//! * `fs::FileContent` and `fs::FileImage` represent files as they cross the `DiskFS` boundary
//!
//! When a `DiskFS` object is created it takes ownership of some `DiskImage`.
//! It then uses this owned image as storage.  Any changes are not permanent until the
//! image is saved with `save_img`.
//!
//! ## File Systems
//!
//! * DOS 3.3 (140K and 400K volumes)
//! * ProDOS (flat volume directory, any size from 140K to 32M)
//! * Pascal File System
//!
//! ## Disk Images
//!
//! * DO, PO, and DSK (the ordering of DSK is found by probing the file system)
//! * 2MG wrapping either of the above
//!
//! ## Transfers
//!
//! Files leave and enter the library as AppleSingle containers, see `fs::fimg::applesingle`.
//! Whole volumes can be re-encoded with `convert`.

/// On-disk records that can be decoded from and encoded to fixed layouts.
pub trait DiskStruct: Sized {
    /// Create structure using flattened bytes (typically from disk)
    fn from_bytes(dat: &[u8]) -> Result<Self,DYNERR>;
    /// Return flattened bytes (typically written to disk)
    fn to_bytes(&self) -> Vec<u8>;
}

/// Implement `DiskStruct` for a type that derives `binrw::BinRead` and `binrw::BinWrite`
/// and carries an endian attribute.
#[macro_export]
macro_rules! disk_struct {
    ($t:ty) => {
        impl $crate::DiskStruct for $t {
            fn from_bytes(dat: &[u8]) -> Result<Self,$crate::DYNERR> {
                let mut cursor = std::io::Cursor::new(dat);
                Ok(<$t as binrw::BinRead>::read(&mut cursor)?)
            }
            fn to_bytes(&self) -> Vec<u8> {
                let mut cursor = std::io::Cursor::new(Vec::new());
                if let Err(e) = binrw::BinWrite::write(self,&mut cursor) {
                    log::error!("could not flatten structure: {}",e);
                }
                cursor.into_inner()
            }
        }
    };
}

pub mod fs;
pub mod bios;
pub mod img;
pub mod convert;

pub use convert::{convert,convert_file};

use img::DiskImage;
use fs::{DiskFS,FsKind,DisplayMode,FileContent,ItemType};
use std::fmt::Write;
use std::str::FromStr;
use log::{warn,info,debug,error};
use regex::Regex;

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Save the image file (make changes permanent)
pub fn save_img(disk: &mut Box<dyn DiskFS>,img_path: &str) -> STDRESULT {
    std::fs::write(img_path,disk.get_img().to_bytes())?;
    Ok(())
}

/// Container implied by a host file name.  DSK and unknown extensions give None,
/// meaning the ordering the file system was created with is kept.
pub fn container_for_path(img_path: &str) -> Option<img::DiskImageType> {
    let ext = std::path::Path::new(img_path).extension()?.to_str()?.to_lowercase();
    img::DiskImageType::from_str(&ext).ok()
}

/// Move the volume into a new container of type `typ`.  The file system's own allocation
/// units are copied, so DO and PO reorder the sectors, while 2MG wraps the native ordering
/// (DO for DOS 3.3, PO otherwise).  DOS 3.3 volumes cannot be put in PO order.
pub fn change_container(disk: &mut Box<dyn DiskFS>,typ: img::DiskImageType) -> Result<Box<dyn DiskFS>,DYNERR> {
    let stat = disk.stat()?;
    let is_dos = stat.fs_name==fs::A2_DOS;
    let src = disk.get_img();
    let kind = src.kind();
    let mut raw: Box<dyn DiskImage> = match (typ,is_dos) {
        (img::DiskImageType::PO,true) => {
            error!("DOS 3.3 volumes are kept in DOS order");
            return Err(Box::new(fs::Error::IncompatibleFormat));
        },
        (img::DiskImageType::DO,_) | (img::DiskImageType::DOT2MG,true) => match img::dsk_do::DO::create(kind) {
            Ok(img) => Box::new(img),
            Err(_) => return Err(Box::new(fs::Error::IncompatibleFormat))
        },
        _ => Box::new(img::dsk_po::PO::create(src.block_count() as u16)?)
    };
    if is_dos {
        let (tracks,sectors) = match kind.dos_geometry() {
            Some(g) => g,
            None => return Err(Box::new(fs::Error::IncompatibleFormat))
        };
        for t in 0..tracks as usize {
            for s in 0..sectors as usize {
                let addr = fs::Block::DO([t,s]);
                raw.write_block(addr,&src.read_block(addr)?)?;
            }
        }
    } else {
        for b in 0..src.block_count() {
            let addr = fs::Block::PO(b);
            raw.write_block(addr,&src.read_block(addr)?)?;
        }
    }
    if typ==img::DiskImageType::DOT2MG {
        let vol = match is_dos {
            true => fs::dos3x::parse_volume(&stat.label).ok(),
            false => None
        };
        raw = Box::new(img::dot2mg::Dot2mg::create(raw,vol)?);
    }
    info!("moved {} volume into {} container",stat.fs_name,typ);
    match try_img(raw) {
        Some(disk) => Ok(disk),
        None => {
            error!("file system was not found after changing the container");
            Err(Box::new(fs::Error::FileSystemMismatch))
        }
    }
}

/// Return the file system on a disk image, or None if one cannot be found.
/// If found, the file system takes ownership of the disk image.
fn try_img(mut img: Box<dyn DiskImage>) -> Option<Box<dyn DiskFS>> {
    if fs::dos3x::Disk::test_img(&mut img) {
        info!("identified DOS 3.3 file system");
        return fs::dos3x::Disk::from_img(img).ok().map(|d| Box::new(d) as Box<dyn DiskFS>);
    }
    if fs::prodos::Disk::test_img(&mut img) {
        info!("identified ProDOS file system");
        return fs::prodos::Disk::from_img(img).ok().map(|d| Box::new(d) as Box<dyn DiskFS>);
    }
    if fs::pascal::Disk::test_img(&mut img) {
        info!("identified Pascal file system");
        return fs::pascal::Disk::from_img(img).ok().map(|d| Box::new(d) as Box<dyn DiskFS>);
    }
    None
}

/// Given a bytestream return a DiskFS, or Err if the bytestream cannot be interpreted.
/// Images are tried as 2MG, then DO, then PO.
pub fn create_fs_from_bytestream(disk_img_data: &[u8]) -> Result<Box<dyn DiskFS>,DYNERR> {
    let mut any_image = false;
    if let Some(img) = img::dot2mg::Dot2mg::from_bytes(disk_img_data) {
        info!("identified 2mg image");
        any_image = true;
        if let Some(disk) = try_img(Box::new(img)) {
            return Ok(disk);
        }
    }
    if let Some(img) = img::dsk_do::DO::from_bytes(disk_img_data) {
        debug!("possible DO image");
        any_image = true;
        if let Some(disk) = try_img(Box::new(img)) {
            return Ok(disk);
        }
    }
    if let Some(img) = img::dsk_po::PO::from_bytes(disk_img_data) {
        debug!("possible PO image");
        any_image = true;
        if let Some(disk) = try_img(Box::new(img)) {
            return Ok(disk);
        }
    }
    if !any_image {
        error!("{} bytes does not match any image geometry",disk_img_data.len());
        return Err(Box::new(img::Error::ImageSizeMismatch));
    }
    warn!("cannot match any file system");
    Err(Box::new(fs::Error::FileSystemMismatch))
}

/// Calls `create_fs_from_bytestream` getting the bytes from a file.
/// A missing file surfaces the `std::io::Error`.
pub fn create_fs_from_file(img_path: &str) -> Result<Box<dyn DiskFS>,DYNERR> {
    let disk_img_data = std::fs::read(img_path)?;
    create_fs_from_bytestream(&disk_img_data)
}

/// Format a new volume.  DOS accepts the 140K and 400K kinds and takes a volume number
/// in `vol_name`, an empty string gives 254.  ProDOS and Pascal volumes are created
/// as PO images of any block count the kind implies.
pub fn create_image(kind: FsKind,size: img::DiskKind,vol_name: &str) -> Result<Box<dyn DiskFS>,DYNERR> {
    let time = Some(chrono::Local::now().naive_local());
    match kind {
        FsKind::Dos33 => {
            let vol = fs::dos3x::parse_volume(vol_name)?;
            let img = match img::dsk_do::DO::create(size) {
                Ok(img) => img,
                Err(_) => return Err(Box::new(fs::Error::IncompatibleFormat))
            };
            let mut disk = fs::dos3x::Disk::from_img(Box::new(img))?;
            disk.format(vol)?;
            Ok(Box::new(disk))
        },
        FsKind::ProDOS | FsKind::Pascal => {
            let blocks = size.block_count();
            if blocks < img::dsk_po::MIN_BLOCKS || blocks > img::dsk_po::MAX_BLOCKS {
                error!("{} cannot hold a {} volume",size,kind);
                return Err(Box::new(fs::Error::IncompatibleFormat));
            }
            let img = Box::new(img::dsk_po::PO::create(blocks as u16)?);
            match kind {
                FsKind::ProDOS => {
                    let mut disk = fs::prodos::Disk::from_img(img)?;
                    disk.format(vol_name,time)?;
                    Ok(Box::new(disk))
                },
                _ => {
                    let mut disk = fs::pascal::Disk::from_img(img)?;
                    disk.format(vol_name,time)?;
                    Ok(Box::new(disk))
                }
            }
        }
    }
}

/// Render the catalog as lines of text
pub fn list_directory(disk: &mut Box<dyn DiskFS>,mode: DisplayMode) -> Result<Vec<String>,DYNERR> {
    disk.catalog_to_vec(mode)
}

/// Volume statistics
pub fn stat(disk: &mut Box<dyn DiskFS>) -> Result<fs::Stat,DYNERR> {
    disk.stat()
}

/// Get the data fork of a file, any header the file system keeps is stripped
pub fn get_file(disk: &mut Box<dyn DiskFS>,name: &str) -> Result<Vec<u8>,DYNERR> {
    Ok(disk.get(name)?.data)
}

/// Get a file wrapped in an AppleSingle container
pub fn get_container(disk: &mut Box<dyn DiskFS>,name: &str) -> Result<Vec<u8>,DYNERR> {
    let content = disk.get(name)?;
    Ok(fs::fimg::applesingle::encode(&content))
}

/// Write every live file into `dest_dir` as `<NAME>.as`, returns the number of files written.
/// Names are escaped so they are safe as host file names.  Directories are skipped.
pub fn get_all_files(disk: &mut Box<dyn DiskFS>,dest_dir: &str) -> Result<usize,DYNERR> {
    let entries = disk.files()?;
    let dir = std::path::Path::new(dest_dir);
    let mut count = 0;
    for entry in entries {
        let content = disk.get(&entry.name)?;
        let host_name = entry.name.replace(['/','\\'],"_") + ".as";
        std::fs::write(dir.join(host_name),fs::fimg::applesingle::encode(&content))?;
        count += 1;
    }
    info!("wrote {} files to {}",count,dest_dir);
    Ok(count)
}

/// Create a new file, returns the allocation units used
pub fn put_file(disk: &mut Box<dyn DiskFS>,name: &str,data: &[u8],typ: ItemType,load_addr: Option<u16>) -> Result<usize,DYNERR> {
    disk.put(&FileContent::new(name,data,typ,load_addr))
}

/// Create a new binary file from data that starts with the 4 byte DOS header (load address and length),
/// as assemblers produce for DOS.  Works on any file system, the header becomes the load address.
pub fn put_dos_binary(disk: &mut Box<dyn DiskFS>,name: &str,data: &[u8]) -> Result<usize,DYNERR> {
    let (load_addr,dat) = fs::dos3x::types::unpack_data(fs::dos3x::types::FileType::Binary,data)?;
    debug!("DOS binary header gives {} bytes at ${:04X}",dat.len(),load_addr);
    disk.put(&FileContent::new(name,&dat,ItemType::Binary,Some(load_addr)))
}

/// Create a new file from an AppleSingle container.  An explicit `name` overrides the name in the container.
pub fn put_raw_container(disk: &mut Box<dyn DiskFS>,name: Option<&str>,container: &[u8]) -> Result<usize,DYNERR> {
    let mut content = fs::fimg::applesingle::decode(container)?;
    if let Some(n) = name {
        content.name = n.to_string();
    }
    disk.put(&content)
}

pub fn delete_file(disk: &mut Box<dyn DiskFS>,name: &str) -> STDRESULT {
    disk.delete(name)
}

pub fn rename_file(disk: &mut Box<dyn DiskFS>,old_name: &str,new_name: &str) -> STDRESULT {
    disk.rename(old_name,new_name)
}

pub fn retype_file(disk: &mut Box<dyn DiskFS>,name: &str,typ: ItemType) -> STDRESULT {
    disk.retype(name,typ)
}

pub fn rename_volume(disk: &mut Box<dyn DiskFS>,new_name: &str) -> STDRESULT {
    disk.rename_volume(new_name)
}

pub fn set_file_locked(disk: &mut Box<dyn DiskFS>,name: &str,locked: bool) -> STDRESULT {
    match locked {
        true => disk.lock(name),
        false => disk.unlock(name)
    }
}

/// Serialize a file, and every detail the file system keeps about it, as JSON
pub fn get_file_image_json(disk: &mut Box<dyn DiskFS>,name: &str) -> Result<String,DYNERR> {
    Ok(disk.read_any(name)?.to_json(Some(2)))
}

/// Restore a file from its JSON file image, the file system must match the one it came from
pub fn put_file_image_json(disk: &mut Box<dyn DiskFS>,json_str: &str) -> Result<usize,DYNERR> {
    let fimg = fs::FileImage::from_json(json_str)?;
    disk.write_any(&fimg)
}

/// This takes any bytes and makes an ascii friendly string
/// by using hex escapes, e.g., `\xFF`.
/// if `escape_cc` is true, ascii control characters are also escaped.
/// if `inverted` is true, assume we have negative ascii bytes.
pub fn escaped_ascii_from_bytes(bytes: &[u8],escape_cc: bool,inverted: bool) -> String {
    let mut result = String::new();
    let (lb,ub) = match (escape_cc,inverted) {
        (true,false) => (0x20,0x7e),
        (false,false) => (0x00,0x7f),
        (true,true) => (0xa0,0xfe),
        (false,true) => (0x80,0xff)
    };
    for byte in bytes {
        if *byte>=lb && *byte<=ub {
            match inverted {
                true => result.push((*byte - 0x80) as char),
                false => result.push(*byte as char)
            }
        } else {
            // writing to a String cannot fail
            let _ = write!(&mut result,"\\x{:02X}",byte);
        }
    }
    result
}

/// Interpret a UTF8 string as pure ascii and put into bytes.
/// Non-ascii characters are omitted from the result, but arbitrary
/// bytes can be introduced using escapes, e.g., `\xFF`.
/// if `inverted` is true the sign of the non-escaped bytes is flipped.
/// if `caps` is true the ascii is put in upper case.
pub fn parse_escaped_ascii(s: &str,inverted: bool,caps: bool) -> Vec<u8> {
    let mut ans: Vec<u8> = Vec::new();
    let hex_patt = match Regex::new(r"\\x[0-9A-Fa-f]{2}") {
        Ok(re) => re,
        Err(_) => return ans
    };
    let mut curs = 0;
    for hex in hex_patt.find_iter(s) {
        push_ascii(&mut ans,&s[curs..hex.start()],inverted,caps);
        if let Ok(mut byte) = hex::decode(&s[hex.start()+2..hex.end()]) {
            ans.append(&mut byte);
        }
        curs = hex.end();
    }
    push_ascii(&mut ans,&s[curs..],inverted,caps);
    ans
}

fn push_ascii(ans: &mut Vec<u8>,s: &str,inverted: bool,caps: bool) {
    for c in s.chars().filter(|c| c.is_ascii()) {
        let byte = match caps {
            true => c.to_ascii_uppercase() as u8,
            false => c as u8
        };
        ans.push(byte + match inverted { true => 0x80, false => 0 });
    }
}

#[test]
fn test_escapes() {
    assert_eq!(escaped_ascii_from_bytes(&[0xc8,0xc9,0x87],true,true),"HI\\x87");
    assert_eq!(escaped_ascii_from_bytes(b"A\x00B",true,false),"A\\x00B");
    assert_eq!(parse_escaped_ascii("hi\\x87",true,true),vec![0xc8,0xc9,0x87]);
    assert_eq!(parse_escaped_ascii("a\\x00b",false,false),vec![b'a',0,b'b']);
}
