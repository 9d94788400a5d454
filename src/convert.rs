//! # Volume conversion
//!
//! Re-encode the live files of one volume onto a freshly formatted volume of another
//! (or the same) file system.  Allocation is done by the destination driver, block layouts
//! are never carried over.  Everything that can be checked is checked before the
//! destination is built: the geometry, every file name, and the total footprint.

use log::{info,error};
use crate::fs::{self,DiskFS,FileContent,FsKind};
use crate::img::DiskKind;
use crate::{STDRESULT,DYNERR};

/// Volume name used when the source label cannot be carried over
fn default_volume(kind: FsKind) -> &'static str {
    match kind {
        FsKind::Dos33 => "",
        FsKind::ProDOS => "NEW.DISK",
        FsKind::Pascal => "BLANK"
    }
}

/// Map the requested size onto a disk kind the target can be formatted on
fn target_kind(kind: FsKind,size_blocks: usize) -> Result<DiskKind,DYNERR> {
    match kind {
        FsKind::Dos33 => match size_blocks {
            280 => Ok(DiskKind::A2_525_16),
            800 => Ok(DiskKind::A2_DOS_400),
            _ => {
                error!("DOS volumes are 280 or 800 blocks, not {}",size_blocks);
                Err(Box::new(fs::Error::IncompatibleFormat))
            }
        },
        _ => {
            if size_blocks < crate::img::dsk_po::MIN_BLOCKS || size_blocks > crate::img::dsk_po::MAX_BLOCKS {
                error!("{} volumes cannot have {} blocks",kind,size_blocks);
                return Err(Box::new(fs::Error::IncompatibleFormat));
            }
            Ok(DiskKind::from_blocks(size_blocks))
        }
    }
}

fn check_file_name(kind: FsKind,name: &str) -> STDRESULT {
    match kind {
        FsKind::Dos33 => fs::dos3x::check_name(name),
        FsKind::ProDOS => fs::prodos::check_name(name),
        FsKind::Pascal => fs::pascal::check_name(name,false)
    }
}

fn check_volume_name(kind: FsKind,name: &str) -> STDRESULT {
    match kind {
        FsKind::Dos33 => fs::dos3x::parse_volume(name).map(|_| ()),
        FsKind::ProDOS => fs::prodos::check_name(name),
        FsKind::Pascal => fs::pascal::check_name(name,true)
    }
}

/// (free units,directory slots) on a fresh target
fn capacity(kind: DiskKind,fs_kind: FsKind) -> Result<(usize,usize),DYNERR> {
    match fs_kind {
        FsKind::Dos33 => match fs::dos3x::capacity(kind) {
            Some(c) => Ok(c),
            None => Err(Box::new(fs::Error::IncompatibleFormat))
        },
        FsKind::ProDOS => Ok(fs::prodos::capacity(kind.block_count())),
        FsKind::Pascal => Ok(fs::pascal::capacity(kind.block_count()))
    }
}

fn footprint(kind: FsKind,content: &FileContent) -> Result<usize,DYNERR> {
    match kind {
        FsKind::Dos33 => fs::dos3x::footprint(content),
        FsKind::ProDOS => fs::prodos::footprint(content),
        FsKind::Pascal => fs::pascal::footprint(content)
    }
}

/// Gather the live files of the source, directories are skipped
fn gather(source: &mut Box<dyn DiskFS>) -> Result<Vec<FileContent>,DYNERR> {
    let mut ans = Vec::new();
    for entry in source.files()? {
        ans.push(source.get(&entry.name)?);
    }
    Ok(ans)
}

/// Copy every live file of `source` onto a new volume of the given kind and size.
/// Fails with `IncompatibleFormat` if the target cannot represent the size or some name,
/// or with `SizeTooSmall` if the files will not fit.  The source is not changed.
pub fn convert(source: &mut Box<dyn DiskFS>,kind: FsKind,size_blocks: usize,vol_name: &str) -> Result<Box<dyn DiskFS>,DYNERR> {
    let disk_kind = target_kind(kind,size_blocks)?;
    if check_volume_name(kind,vol_name).is_err() {
        error!("volume name `{}` cannot be used on {}",vol_name,kind);
        return Err(Box::new(fs::Error::IncompatibleFormat));
    }
    let files = gather(source)?;
    let mut seen: Vec<String> = Vec::new();
    let mut units = 0;
    for content in &files {
        if check_file_name(kind,&content.name).is_err() {
            error!("file name `{}` cannot be used on {}",content.name,kind);
            return Err(Box::new(fs::Error::IncompatibleFormat));
        }
        let folded = content.name.to_uppercase();
        if seen.contains(&folded) {
            error!("file name `{}` collides with another file on {}",content.name,kind);
            return Err(Box::new(fs::Error::IncompatibleFormat));
        }
        seen.push(folded);
        units += footprint(kind,content)?;
    }
    let (free,slots) = capacity(disk_kind,kind)?;
    if units > free || files.len() > slots {
        error!("{} files needing {} units will not fit, target has {} units and {} slots",files.len(),units,free,slots);
        return Err(Box::new(fs::Error::SizeTooSmall));
    }
    let mut dest = crate::create_image(kind,disk_kind,vol_name)?;
    for content in &files {
        dest.put(content)?;
    }
    info!("converted {} files to {}",files.len(),kind);
    Ok(dest)
}

/// Convert the image at `src_path` and save the result at `dest_path`.
/// The source volume name is kept if the target allows it.  The container follows the
/// extension of `dest_path` (DO, PO, or 2MG), other extensions keep the native ordering.
/// Nothing is written on failure.
pub fn convert_file(src_path: &str,dest_path: &str,kind: FsKind,size_blocks: usize) -> STDRESULT {
    let mut source = crate::create_fs_from_file(src_path)?;
    let label = source.stat()?.label;
    let vol_name = match check_volume_name(kind,&label) {
        Ok(()) => label.as_str(),
        Err(_) => default_volume(kind)
    };
    let mut dest = convert(&mut source,kind,size_blocks,vol_name)?;
    if let Some(typ) = crate::container_for_path(dest_path) {
        if typ!=dest.get_img().what_am_i() {
            dest = crate::change_container(&mut dest,typ)?;
        }
    }
    crate::save_img(&mut dest,dest_path)
}
