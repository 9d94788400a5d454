//! ## Pascal file system module
//!
//! This module is *not* for the Pascal language, but rather the Pascal file system.
//! Files occupy contiguous extents, and the directory entries are kept in block order,
//! so the free space is whatever lies between the extents.  Deleting a file closes
//! the gap in the directory.  There is no lock flag.

pub mod types;
mod directory;

use log::{info,debug,error};
use num_traits::FromPrimitive;
use types::*;
use directory::*;
use super::{Block,CatalogEntry,FileContent,FileImage,ItemType,Stat,UNLOCKED_ACCESS};
use crate::img;
use crate::DiskStruct;
use crate::{STDRESULT,DYNERR};

/// Check a file or volume name.  Lower case is accepted, it is converted when the name is stored.
pub fn check_name(s: &str,is_vol: bool) -> STDRESULT {
    let max = match is_vol { true => VOL_NAME_LEN, false => NAME_LEN };
    if s.len() > max {
        error!("name too long, max {}",max);
        return Err(Box::new(super::Error::NameTooLong));
    }
    if s.is_empty() {
        error!("empty name");
        return Err(Box::new(Error::BadTitle));
    }
    for char in s.chars() {
        if !char.is_ascii() || INVALID_CHARS.contains(char) || char.is_ascii_control() {
            error!("bad file name character `{}` (codepoint {})",char,char as u32);
            return Err(Box::new(Error::BadTitle));
        }
    }
    Ok(())
}

/// Blocks a file will occupy, an empty file still takes one
pub fn footprint(content: &FileContent) -> Result<usize,DYNERR> {
    Ok(usize::max(1,(content.data.len() + BLOCK_SIZE - 1) / BLOCK_SIZE))
}

/// Returns (free blocks,directory slots) of a fresh volume with this many blocks
pub fn capacity(blocks: usize) -> (usize,usize) {
    (blocks.saturating_sub(DIR_END_BLOCK),MAX_FILES)
}

/// Load directory structure from a borrowed disk image.
/// This is used to test images, as well as being called during FS operations.
fn get_directory(img: &mut Box<dyn img::DiskImage>) -> Result<Directory,DYNERR> {
    let buf = img.read_block(Block::PO(VOL_HEADER_BLOCK))?;
    let header = VolDirHeader::from_bytes(&buf[0..ENTRY_SIZE])?;
    let beg0 = u16::from_le_bytes(header.begin_block);
    let end = header.end_block();
    if beg0!=0 || end<=VOL_HEADER_BLOCK || end>20 || header.total_blocks()>img.block_count() {
        debug!("bad header: begin block {}, end block {}, total {}",beg0,end,header.total_blocks());
        return Err(Box::new(Error::BadFormat));
    }
    // gather up all the directory blocks in a contiguous buffer; this is convenient
    // since the entries are allowed to span 2 blocks.
    let mut buf = Vec::new();
    for iblock in VOL_HEADER_BLOCK..end {
        buf.append(&mut img.read_block(Block::PO(iblock))?);
    }
    Directory::from_bytes(&buf)
}

/// The primary interface for disk operations.
pub struct Disk {
    img: Box<dyn img::DiskImage>
}

impl Disk {
    /// Create a disk file system using the given image as storage.
    /// The DiskFS takes ownership of the image.
    pub fn from_img(img: Box<dyn img::DiskImage>) -> Result<Self,DYNERR> {
        Ok(Self {
            img
        })
    }
    /// Test an image for the Pascal file system.
    pub fn test_img(img: &mut Box<dyn img::DiskImage>) -> bool {
        let directory = match get_directory(img) {
            Ok(d) => d,
            Err(e) => {
                debug!("pascal directory was not readable; {}",e);
                return false;
            }
        };
        let hdr = &directory.header;
        let end = hdr.end_block();
        let tot = hdr.total_blocks();
        if hdr.name_len as usize > VOL_NAME_LEN || hdr.name_len==0 {
            debug!("header name length {}",hdr.name_len);
            return false;
        }
        if hdr.file_type != [0,0] {
            debug!("header type {}",u16::from_le_bytes(hdr.file_type));
            return false;
        }
        if hdr.name[0..hdr.name_len as usize].iter().any(|c| *c<32 || *c>126) {
            debug!("header name has bad characters");
            return false;
        }
        if hdr.num_files() > directory.entries.len() {
            debug!("file count {} is too large",hdr.num_files());
            return false;
        }
        // test every directory entry that is used
        for (i,entry) in directory.live().iter().enumerate() {
            if entry.begin()<end || entry.end()<=entry.begin() || entry.end()>tot {
                debug!("entry {} begin {} end {}",i,entry.begin(),entry.end());
                return false;
            }
            if entry.name_len as usize > NAME_LEN || entry.name_len==0 {
                debug!("entry {} name length {}",i,entry.name_len);
                return false;
            }
            if entry.name[0..entry.name_len as usize].iter().any(|c| *c<32 || *c>126) {
                debug!("entry {} name has bad characters",i);
                return false;
            }
        }
        true
    }
    fn get_directory(&mut self) -> Result<Directory,DYNERR> {
        get_directory(&mut self.img)
    }
    /// Writing the directory is the commit point of every change
    fn save_directory(&mut self,dir: &Directory) -> STDRESULT {
        let buf = dir.to_bytes();
        for (i,chunk) in buf.chunks(BLOCK_SIZE).enumerate() {
            self.img.write_block(Block::PO(VOL_HEADER_BLOCK + i),chunk)?;
        }
        Ok(())
    }
    /// The free extents as (first block,length), in block order
    fn free_extents(&self,dir: &Directory) -> Vec<(usize,usize)> {
        let mut ans = Vec::new();
        let mut next = dir.header.end_block();
        let mut extents: Vec<(usize,usize)> = dir.live().iter().map(|e| (e.begin(),e.end())).collect();
        extents.sort_unstable();
        for (beg,end) in extents {
            if beg > next {
                ans.push((next,beg-next));
            }
            next = usize::max(next,end);
        }
        let total = dir.header.total_blocks();
        if total > next {
            ans.push((next,total-next));
        }
        ans
    }
    /// Return tuple with (free blocks,largest contiguous span of blocks)
    fn num_free_blocks(&self,dir: &Directory) -> (usize,usize) {
        let extents = self.free_extents(dir);
        (extents.iter().map(|x| x.1).sum(),extents.iter().map(|x| x.1).max().unwrap_or(0))
    }
    /// Format disk for the Pascal file system.  The boot blocks are zeroed.
    pub fn format(&mut self,vol_name: &str,time: Option<chrono::NaiveDateTime>) -> STDRESULT {
        check_name(vol_name,true)?;
        let num_blocks = self.img.block_count();
        if num_blocks > u16::MAX as usize || num_blocks <= DIR_END_BLOCK {
            error!("cannot put Pascal on {} blocks",num_blocks);
            return Err(Box::new(Error::NoRoom));
        }
        for iblock in 0..num_blocks {
            self.img.write_block(Block::PO(iblock),&[0;BLOCK_SIZE])?;
        }
        let mut dir = Directory::new();
        let (len,name) = string_to_name::<7>(vol_name);
        dir.header.begin_block = u16::to_le_bytes(0);
        dir.header.end_block = u16::to_le_bytes(DIR_END_BLOCK as u16);
        dir.header.name_len = len;
        dir.header.name = name;
        dir.header.total_blocks = u16::to_le_bytes(num_blocks as u16);
        dir.header.last_set_date = pack_date(time);
        self.save_directory(&dir)?;
        info!("formatted Pascal volume {} with {} blocks",vol_name.to_uppercase(),num_blocks);
        Ok(())
    }
    /// Scan the directory to find the named file and return (Option<entry index>, directory).
    fn get_file_entry(&mut self,name: &str) -> Result<(Option<usize>,Directory),DYNERR> {
        let directory = self.get_directory()?;
        let fname = name.to_uppercase();
        let idx = directory.live().iter().position(|e| e.name()==fname);
        Ok((idx,directory))
    }
    fn find_file(&mut self,name: &str) -> Result<(usize,Directory),DYNERR> {
        match self.get_file_entry(name)? {
            (Some(idx),dir) => Ok((idx,dir)),
            (None,_) => {
                debug!("{} not found",name);
                Err(Box::new(Error::NoFile))
            }
        }
    }
    fn new_fimg_internal(&self) -> FileImage {
        let mut ans = FileImage::new(super::A2_PASCAL,BLOCK_SIZE);
        ans.fs_type = vec![0;2];
        ans.eof = vec![0;4];
        ans.modified = vec![0;2];
        ans
    }
    /// Read any file into the sparse file format.  The fact that the Pascal FS does not
    /// have sparse files presents no difficulty, since `FileImage` is quite general.
    fn read_file(&mut self,entry: &DirectoryEntry) -> Result<FileImage,DYNERR> {
        let mut ans = self.new_fimg_internal();
        ans.name = entry.name();
        for (count,iblock) in (entry.begin()..entry.end()).enumerate() {
            ans.chunks.insert(count,self.img.read_block(Block::PO(iblock))?);
        }
        ans.fs_type = entry.file_type.to_vec();
        ans.eof = u32::to_le_bytes(entry.eof() as u32).to_vec();
        ans.modified = entry.mod_date.to_vec();
        Ok(ans)
    }
    /// Write a sequential file.  Data goes into the first free extent that holds it, the
    /// directory is written last.  Nothing is written unless there is room for all of it.
    fn write_file(&mut self,name: &str,fimg: &FileImage,file_type: FileType,mod_date: [u8;2]) -> Result<usize,DYNERR> {
        check_name(name,false)?;
        let (maybe_idx,mut dir) = self.get_file_entry(name)?;
        if maybe_idx.is_some() {
            error!("overwriting is not allowed");
            return Err(Box::new(Error::DuplicateFilename));
        }
        let data_blocks = usize::max(1,fimg.end());
        if fimg.chunks.len() < fimg.end() {
            error!("pascal file image had a hole which is not allowed");
            return Err(Box::new(Error::BadFormat));
        }
        let eof = fimg.get_eof();
        if eof > data_blocks*BLOCK_SIZE || eof < (data_blocks-1)*BLOCK_SIZE {
            error!("eof {} does not fall in the last data block",eof);
            return Err(Box::new(Error::BadFormat));
        }
        let n = dir.header.num_files();
        if n >= dir.entries.len() {
            error!("directory is full");
            return Err(Box::new(Error::NoRoom));
        }
        let beg = match self.free_extents(&dir).iter().find(|x| x.1 >= data_blocks) {
            Some(x) => x.0,
            None => {
                error!("not enough contiguous space");
                return Err(Box::new(Error::NoRoom));
            }
        };
        for b in 0..data_blocks {
            let chunk = match fimg.chunks.get(&b) {
                Some(c) => c.clone(),
                None => vec![0;BLOCK_SIZE]
            };
            self.img.write_block(Block::PO(beg + b),&chunk)?;
        }
        let mut entry = DirectoryEntry::new();
        let (len,fname) = string_to_name::<15>(name);
        entry.begin_block = u16::to_le_bytes(beg as u16);
        entry.end_block = u16::to_le_bytes((beg + data_blocks) as u16);
        entry.file_type = u16::to_le_bytes(file_type as u16);
        entry.name_len = len;
        entry.name = fname;
        entry.bytes_remaining = u16::to_le_bytes((eof - (data_blocks-1)*BLOCK_SIZE) as u16);
        entry.mod_date = mod_date;
        // keep the entries in block order
        let pos = dir.live().iter().position(|e| e.begin() > beg).unwrap_or(n);
        dir.entries.insert(pos,entry);
        dir.entries.pop();
        dir.header.set_num_files(n+1);
        dir.header.last_access_date = pack_date(None);
        self.save_directory(&dir)?;
        Ok(data_blocks)
    }
    /// modify a file entry, optionally rename, retype.
    fn modify(&mut self,name: &str,maybe_new_name: Option<&str>,maybe_ftype: Option<FileType>) -> STDRESULT {
        let (idx,mut dir) = self.find_file(name)?;
        if let Some(new_name) = maybe_new_name {
            check_name(new_name,false)?;
            let other = dir.live().iter().position(|e| e.name()==new_name.to_uppercase());
            if other.is_some() && other!=Some(idx) {
                error!("{} already exists",new_name);
                return Err(Box::new(Error::DuplicateFilename));
            }
            let (len,fname) = string_to_name::<15>(new_name);
            dir.entries[idx].name_len = len;
            dir.entries[idx].name = fname;
        }
        if let Some(typ) = maybe_ftype {
            dir.entries[idx].file_type = u16::to_le_bytes(typ as u16);
        }
        self.save_directory(&dir)
    }
}

impl super::DiskFS for Disk {
    fn new_fimg(&self) -> FileImage {
        self.new_fimg_internal()
    }
    fn stat(&mut self) -> Result<Stat,DYNERR> {
        let dir = self.get_directory()?;
        let (free,largest) = self.num_free_blocks(&dir);
        Ok(Stat {
            fs_name: super::A2_PASCAL.to_string(),
            label: name_to_string(&dir.header.name,dir.header.name_len & 0x07),
            block_size: BLOCK_SIZE,
            total_blocks: dir.header.total_blocks(),
            free_blocks: free,
            file_count: dir.header.num_files(),
            largest_free: largest
        })
    }
    fn catalog(&mut self,_include_deleted: bool) -> Result<Vec<CatalogEntry>,DYNERR> {
        // deleted entries are squeezed out of the directory, there is nothing more to show
        let dir = self.get_directory()?;
        let mut ans = Vec::new();
        for entry in dir.live() {
            let ftype = u16::from_le_bytes(entry.file_type);
            let typ = match FileType::from_u16(ftype & 0x0f) {
                Some(t) => t.mnemonic(),
                None => "????"
            };
            let modified = unpack_date(entry.mod_date);
            let date = match modified {
                Some(d) => d.format("%d-%b-%y").to_string(),
                None => "<NO DATE>".to_string()
            };
            ans.push(CatalogEntry {
                name: entry.name(),
                fs_type: (ftype & 0xff) as u8,
                type_name: typ.to_string(),
                units: entry.blocks(),
                eof: Some(entry.eof()),
                aux: None,
                start: Block::PO(entry.begin()),
                locked: false,
                deleted: false,
                modified,
                native: format!("{:15} {:4} {:9}  {:4}",entry.name(),entry.blocks(),date,typ)
            });
        }
        Ok(ans)
    }
    fn rename_volume(&mut self,name: &str) -> STDRESULT {
        check_name(name,true)?;
        let mut dir = self.get_directory()?;
        let (len,vname) = string_to_name::<7>(name);
        dir.header.name_len = len;
        dir.header.name = vname;
        self.save_directory(&dir)
    }
    fn delete(&mut self,name: &str) -> STDRESULT {
        let (idx,mut dir) = self.find_file(name)?;
        dir.entries.remove(idx);
        dir.entries.push(DirectoryEntry::new());
        let n = dir.header.num_files();
        dir.header.set_num_files(n-1);
        self.save_directory(&dir)
    }
    fn rename(&mut self,old_name: &str,new_name: &str) -> STDRESULT {
        self.modify(old_name,Some(new_name),None)
    }
    fn lock(&mut self,_name: &str) -> STDRESULT {
        error!("pascal file system has no lock");
        Err(Box::new(super::Error::Unsupported))
    }
    fn unlock(&mut self,_name: &str) -> STDRESULT {
        error!("pascal file system has no lock");
        Err(Box::new(super::Error::Unsupported))
    }
    fn retype(&mut self,name: &str,typ: ItemType) -> STDRESULT {
        self.modify(name,None,Some(FileType::from_item(typ)))
    }
    fn get(&mut self,name: &str) -> Result<FileContent,DYNERR> {
        let (idx,dir) = self.find_file(name)?;
        let entry = dir.entries[idx];
        let fimg = self.read_file(&entry)?;
        let typ = match FileType::from_u16(u16::from_le_bytes(entry.file_type) & 0x0f) {
            Some(t) => t,
            None => FileType::Data
        };
        Ok(FileContent {
            name: entry.name(),
            data: fimg.sequence_limited(entry.eof()),
            resource: None,
            file_type: typ.to_item().prodos_type(),
            aux_type: 0,
            access: UNLOCKED_ACCESS
        })
    }
    fn put(&mut self,content: &FileContent) -> Result<usize,DYNERR> {
        let mut fimg = self.new_fimg_internal();
        fimg.desequence(&content.data);
        self.write_file(&content.name,&fimg,FileType::from_item(content.item_type()),pack_date(None))
    }
    fn read_any(&mut self,name: &str) -> Result<FileImage,DYNERR> {
        let (idx,dir) = self.find_file(name)?;
        let entry = dir.entries[idx];
        self.read_file(&entry)
    }
    fn write_any(&mut self,fimg: &FileImage) -> Result<usize,DYNERR> {
        if fimg.file_system!=super::A2_PASCAL || fimg.chunk_len!=BLOCK_SIZE {
            error!("file image from {} with chunk length {} is incompatible with Pascal",fimg.file_system,fimg.chunk_len);
            return Err(Box::new(super::Error::FileImageFormat));
        }
        let typ = match FileType::from_usize(fimg.get_ftype()) {
            Some(t) => t,
            None => {
                error!("unknown file type");
                return Err(Box::new(Error::BadMode));
            }
        };
        let mod_date = match fimg.modified.len() {
            2 => [fimg.modified[0],fimg.modified[1]],
            _ => pack_date(None)
        };
        self.write_file(&fimg.name,fimg,typ,mod_date)
    }
    fn get_img(&mut self) -> &mut Box<dyn img::DiskImage> {
        &mut self.img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::DiskFS;

    fn new_disk() -> Disk {
        let img = img::dsk_po::PO::create(280).expect("could not create image");
        let mut disk = Disk::from_img(Box::new(img)).expect("could not mount");
        disk.format("blank",None).expect("could not format");
        disk
    }

    #[test]
    fn names() {
        assert!(check_name("SYSTEM.PASCAL",false).is_ok());
        assert!(check_name("A:B",false).is_err());
        assert!(check_name("TOOLONGV",true).is_err());
        assert!(check_name("APPLE0",true).is_ok());
    }

    #[test]
    fn first_fit() {
        let mut disk = new_disk();
        disk.put(&FileContent::new("A",&vec![1;1024],ItemType::Binary,None)).expect("put failed");
        disk.put(&FileContent::new("B",&vec![2;512],ItemType::Binary,None)).expect("put failed");
        disk.put(&FileContent::new("C",&vec![3;1536],ItemType::Binary,None)).expect("put failed");
        disk.delete("A").expect("delete failed");
        // the two block hole left by A is reused
        disk.put(&FileContent::new("D",&[4],ItemType::Text,None)).expect("put failed");
        let dir = disk.get_directory().expect("no directory");
        let names: Vec<String> = dir.live().iter().map(|e| e.name()).collect();
        assert_eq!(names,vec!["D","B","C"]);
        assert_eq!(dir.live()[0].begin(),6);
        assert_eq!(dir.live()[0].eof(),1);
        let (free,largest) = disk.num_free_blocks(&dir);
        assert_eq!(free,274 - 1 - 1 - 3);
        assert_eq!(free - largest,1);
    }

    #[test]
    fn empty_file() {
        let mut disk = new_disk();
        assert_eq!(disk.put(&FileContent::new("EMPTY",&[],ItemType::Binary,None)).expect("put failed"),1);
        let content = disk.get("empty").expect("get failed");
        assert_eq!(content.data.len(),0);
        assert_eq!(content.file_type,0x06);
    }
}
