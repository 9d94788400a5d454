//! # ProDOS file system module
//! This manipulates disk images containing one ProDOS volume.
//!
//! * Files in the volume directory are handled, subdirectories are listed but not entered
//! * Seedling, sapling, and tree files can be read and written, including sparse files
//! * The volume bitmap is buffered.  Allocations are made in the buffer and written back
//!   after the directory entry, so a failed write leaves the volume as it was

pub mod types;
mod directory;

use log::{debug,info,warn,error};

use types::*;
use directory::*;
pub use directory::{is_name_valid,check_name};
use super::{Block,CatalogEntry,FileContent,FileImage,ItemType,Stat};
use crate::img;
use crate::DiskStruct;
use crate::{STDRESULT,DYNERR};

fn bitmap_blocks(total_blocks: usize) -> usize {
    (total_blocks + 4095) / 4096
}

/// Work out the storage type and the total blocks, index blocks included,
/// for a file with data in the chunks `present`.  The first data block is always allocated.
fn storage_plan(present: &[usize],end: usize) -> Result<(StorageType,usize),Error> {
    let end = usize::max(end,1);
    let mut data_blocks = present.len();
    if !present.contains(&0) {
        data_blocks += 1;
    }
    if end==1 {
        return Ok((StorageType::Seedling,1));
    }
    if end <= INDEX_PTRS {
        return Ok((StorageType::Sapling,data_blocks + 1));
    }
    if end > INDEX_PTRS * MASTER_PTRS {
        error!("file of {} blocks is too large for ProDOS",end);
        return Err(Error::Range);
    }
    let mut groups: Vec<usize> = present.iter().map(|i| i / INDEX_PTRS).collect();
    groups.push(0);
    groups.sort_unstable();
    groups.dedup();
    Ok((StorageType::Tree,data_blocks + groups.len() + 1))
}

/// Blocks a file will occupy, including index blocks
pub fn footprint(content: &FileContent) -> Result<usize,DYNERR> {
    let end = (content.data.len() + BLOCK_SIZE - 1) / BLOCK_SIZE;
    let present: Vec<usize> = (0..end).collect();
    Ok(storage_plan(&present,end)?.1)
}

/// Returns (free blocks,directory slots) of a fresh volume with this many blocks
pub fn capacity(blocks: usize) -> (usize,usize) {
    let used = VOL_DIR_END as usize + 1 + bitmap_blocks(blocks);
    (blocks.saturating_sub(used),12 + 3 * ENTRIES_PER_BLOCK)
}

fn pack_index(ptrs: &[u16]) -> Vec<u8> {
    let mut ans = vec![0;BLOCK_SIZE];
    for (i,ptr) in ptrs.iter().enumerate().take(INDEX_PTRS) {
        let [lo,hi] = u16::to_le_bytes(*ptr);
        ans[i] = lo;
        ans[i+256] = hi;
    }
    ans
}

fn unpack_index(buf: &[u8],count: usize) -> Vec<u16> {
    (0..count).map(|i| u16::from_le_bytes([buf[i],buf[i+256]])).collect()
}

/// The primary interface for disk operations.
pub struct Disk {
    img: Box<dyn img::DiskImage>,
    total_blocks: usize,
    bitmap_ptr: usize,
    /// buffered copy of the volume bitmap
    bitmap: Vec<u8>
}

impl Disk {
    /// Create a disk file system using the given image as storage.
    /// The DiskFS takes ownership of the image.
    pub fn from_img(img: Box<dyn img::DiskImage>) -> Result<Self,DYNERR> {
        let mut ans = Self {
            total_blocks: img.block_count(),
            img,
            bitmap_ptr: BITMAP_BLOCK as usize,
            bitmap: Vec::new()
        };
        let key = KeyBlock::from_bytes(&ans.img.read_block(Block::PO(VOL_KEY_BLOCK as usize))?)?;
        let total = key.header.total_blocks() as usize;
        if total > VOL_DIR_END as usize && total <= ans.total_blocks {
            ans.total_blocks = total;
        }
        let ptr = key.header.bitmap_ptr() as usize;
        if ptr > VOL_DIR_END as usize && ptr + bitmap_blocks(ans.total_blocks) <= ans.total_blocks {
            ans.bitmap_ptr = ptr;
        }
        ans.load_bitmap()?;
        Ok(ans)
    }
    /// Test an image to see if it already contains ProDOS.
    pub fn test_img(img: &mut Box<dyn img::DiskImage>) -> bool {
        let key = match img.read_block(Block::PO(VOL_KEY_BLOCK as usize)) {
            Ok(dat) => match KeyBlock::from_bytes(&dat) {
                Ok(k) => k,
                Err(_) => return false
            },
            Err(_) => {
                debug!("ProDOS volume directory was not readable");
                return false;
            }
        };
        let hdr = &key.header;
        if key.prev!=[0,0] || hdr.stor_len_nibs >> 4 != StorageType::VolDirHeader as u8 {
            debug!("no ProDOS volume header");
            return false;
        }
        if !is_name_valid(&hdr.name()) {
            debug!("ProDOS volume name is not valid");
            return false;
        }
        if hdr.entry_len as usize != ENTRY_SIZE || hdr.entries_per_block as usize != ENTRIES_PER_BLOCK {
            debug!("unexpected entry length {} or entries per block {}",hdr.entry_len,hdr.entries_per_block);
            return false;
        }
        let total = hdr.total_blocks() as usize;
        if total <= VOL_DIR_END as usize || total > img.block_count() {
            debug!("total blocks {} does not fit image with {}",total,img.block_count());
            return false;
        }
        let ptr = hdr.bitmap_ptr() as usize;
        if ptr <= VOL_DIR_END as usize || ptr + bitmap_blocks(total) > total {
            debug!("bitmap pointer {} is out of range",ptr);
            return false;
        }
        true
    }
    fn check_block(&self,iblock: usize) -> STDRESULT {
        if iblock >= self.total_blocks {
            error!("block {} is outside the volume, image may be damaged",iblock);
            return Err(Box::new(Error::Range));
        }
        Ok(())
    }
    fn read_block(&mut self,iblock: usize) -> Result<Vec<u8>,DYNERR> {
        self.check_block(iblock)?;
        self.img.read_block(Block::PO(iblock))
    }
    fn write_block(&mut self,dat: &[u8],iblock: usize) -> STDRESULT {
        self.check_block(iblock)?;
        self.img.write_block(Block::PO(iblock),dat)
    }
    fn load_bitmap(&mut self) -> STDRESULT {
        let mut ans = Vec::new();
        for iblock in self.bitmap_ptr..self.bitmap_ptr + bitmap_blocks(self.total_blocks) {
            ans.append(&mut self.read_block(iblock)?);
        }
        self.bitmap = ans;
        Ok(())
    }
    /// write the buffered bitmap to the disk
    fn commit(&mut self) -> STDRESULT {
        let buf = self.bitmap.clone();
        for (i,chunk) in buf.chunks(BLOCK_SIZE).enumerate() {
            self.write_block(chunk,self.bitmap_ptr + i)?;
        }
        Ok(())
    }
    /// throw away buffered allocations
    fn rollback(&mut self) {
        if let Err(e) = self.load_bitmap() {
            error!("bitmap could not be restored: {}",e);
        }
    }
    fn allocate_block(&mut self,iblock: usize) -> STDRESULT {
        self.check_block(iblock)?;
        self.bitmap[iblock / 8] &= (0x80 >> (iblock % 8)) ^ u8::MAX;
        Ok(())
    }
    fn deallocate_block(&mut self,iblock: usize) -> STDRESULT {
        self.check_block(iblock)?;
        self.bitmap[iblock / 8] |= 0x80 >> (iblock % 8);
        Ok(())
    }
    fn is_block_free(&self,iblock: usize) -> bool {
        iblock < self.total_blocks && self.bitmap[iblock / 8] & (0x80 >> (iblock % 8)) > 0
    }
    fn num_free_blocks(&self) -> usize {
        (0..self.total_blocks).filter(|b| self.is_block_free(*b)).count()
    }
    fn get_available_block(&self) -> Option<u16> {
        (0..self.total_blocks).find(|b| self.is_block_free(*b)).map(|b| b as u16)
    }
    fn alloc_block(&mut self) -> Result<u16,DYNERR> {
        match self.get_available_block() {
            Some(b) => {
                self.allocate_block(b as usize)?;
                Ok(b)
            },
            None => {
                error!("block not available, but it should have been");
                Err(Box::new(Error::DiskFull))
            }
        }
    }
    /// Format a disk with the ProDOS file system.  The boot blocks are zeroed.
    pub fn format(&mut self,vol_name: &str,time: Option<chrono::NaiveDateTime>) -> STDRESULT {
        check_name(vol_name)?;
        let total = self.img.block_count();
        if total > u16::MAX as usize || total < VOL_DIR_END as usize + 2 + bitmap_blocks(total) {
            error!("cannot put ProDOS on {} blocks",total);
            return Err(Box::new(Error::Range));
        }
        self.total_blocks = total;
        self.bitmap_ptr = BITMAP_BLOCK as usize;
        for iblock in 0..total {
            self.write_block(&[0;BLOCK_SIZE],iblock)?;
        }
        let mut key = KeyBlock::new();
        key.next = u16::to_le_bytes(VOL_KEY_BLOCK+1);
        key.header.format(total as u16,vol_name,time);
        self.write_block(&key.to_bytes(),VOL_KEY_BLOCK as usize)?;
        for b in VOL_KEY_BLOCK+1..=VOL_DIR_END {
            let mut this = EntryBlock::new();
            this.prev = u16::to_le_bytes(b-1);
            if b < VOL_DIR_END {
                this.next = u16::to_le_bytes(b+1);
            }
            self.write_block(&this.to_bytes(),b as usize)?;
        }
        let nmap = bitmap_blocks(total);
        self.bitmap = vec![0;nmap * BLOCK_SIZE];
        for b in 0..total {
            self.deallocate_block(b)?;
        }
        for b in 0..self.bitmap_ptr + nmap {
            self.allocate_block(b)?;
        }
        self.commit()?;
        info!("formatted ProDOS volume {} with {} blocks",vol_name.to_uppercase(),total);
        Ok(())
    }
    fn key_block(&mut self) -> Result<KeyBlock,DYNERR> {
        Ok(KeyBlock::from_bytes(&self.read_block(VOL_KEY_BLOCK as usize)?)?)
    }
    fn write_key_block(&mut self,key: &KeyBlock) -> STDRESULT {
        self.write_block(&key.to_bytes(),VOL_KEY_BLOCK as usize)
    }
    /// Read the volume directory blocks in chain order
    fn directory(&mut self) -> Result<Vec<(u16,DirBlock)>,DYNERR> {
        let mut ans = Vec::new();
        let mut curr = VOL_KEY_BLOCK;
        for _try in 0..MAX_DIRECTORY_REPS {
            let dir = DirBlock::from_bytes(curr,&self.read_block(curr as usize)?)?;
            let next = dir.next();
            ans.push((curr,dir));
            if next==0 {
                return Ok(ans);
            }
            if next as usize >= self.total_blocks || next==VOL_KEY_BLOCK {
                warn!("directory link {} is out of range",next);
                return Err(Box::new(Error::IOError));
            }
            curr = next;
        }
        error!("the volume directory seems to be damaged");
        Err(Box::new(Error::IOError))
    }
    fn entries(&mut self) -> Result<Vec<(EntryLocation,Entry)>,DYNERR> {
        let mut ans = Vec::new();
        for (block,dir) in self.directory()? {
            for (idx,entry) in dir.entries().iter().enumerate() {
                ans.push((EntryLocation { block, idx },entry.clone()));
            }
        }
        Ok(ans)
    }
    /// any active entry with this name, files or directories
    fn find_entry(&mut self,name: &str) -> Result<Option<(EntryLocation,Entry)>,DYNERR> {
        let fname = name.to_uppercase();
        Ok(self.entries()?.into_iter().find(|(_,e)| e.is_active() && e.name()==fname))
    }
    fn find_file(&mut self,name: &str) -> Result<(EntryLocation,Entry),DYNERR> {
        match self.find_entry(name)? {
            Some((loc,entry)) if entry.is_file() => Ok((loc,entry)),
            Some(_) => {
                error!("{} is not a file this module can access",name);
                Err(Box::new(Error::FileTypeMismatch))
            },
            None => {
                debug!("{} not found",name);
                Err(Box::new(Error::FileNotFound))
            }
        }
    }
    fn write_entry(&mut self,loc: &EntryLocation,entry: &Entry) -> STDRESULT {
        let mut dir = DirBlock::from_bytes(loc.block,&self.read_block(loc.block as usize)?)?;
        dir.entries_mut()[loc.idx] = entry.clone();
        self.write_block(&dir.to_bytes(),loc.block as usize)
    }
    fn new_fimg_internal(&self) -> FileImage {
        let mut ans = FileImage::new(super::PRODOS,BLOCK_SIZE);
        ans.eof = vec![0;3];
        ans.fs_type = vec![0];
        ans.aux = vec![0;2];
        ans.access = vec![0];
        ans.created = vec![0;4];
        ans.modified = vec![0;4];
        ans.version = vec![0];
        ans.min_version = vec![0];
        ans
    }
    /// Read any file into the sparse file format.  Use `FileImage.sequence()` to flatten the result
    /// when it is expected to be sequential.
    fn read_file(&mut self,entry: &Entry) -> Result<FileImage,DYNERR> {
        let mut fimg = self.new_fimg_internal();
        fimg.name = entry.name();
        fimg.eof = entry.eof.to_vec();
        fimg.fs_type = vec![entry.file_type];
        fimg.aux = entry.aux_type.to_vec();
        fimg.access = vec![entry.access];
        fimg.created = entry.create_time.to_vec();
        fimg.modified = entry.last_mod.to_vec();
        fimg.version = vec![entry.vers];
        fimg.min_version = vec![entry.min_vers];
        let key = entry.get_ptr() as usize;
        match entry.storage_type() {
            StorageType::Seedling => {
                fimg.chunks.insert(0,self.read_block(key)?);
            },
            StorageType::Sapling => {
                self.read_index_block(key,0,&mut fimg)?;
            },
            StorageType::Tree => {
                let master = unpack_index(&self.read_block(key)?,MASTER_PTRS);
                for (m,ptr) in master.iter().enumerate() {
                    if *ptr>0 {
                        self.read_index_block(*ptr as usize,m * INDEX_PTRS,&mut fimg)?;
                    }
                }
            },
            _ => return Err(Box::new(Error::FileTypeMismatch))
        }
        Ok(fimg)
    }
    fn read_index_block(&mut self,index_ptr: usize,base: usize,fimg: &mut FileImage) -> STDRESULT {
        let ptrs = unpack_index(&self.read_block(index_ptr)?,INDEX_PTRS);
        for (i,ptr) in ptrs.iter().enumerate() {
            if *ptr>0 {
                fimg.chunks.insert(base + i,self.read_block(*ptr as usize)?);
            }
        }
        Ok(())
    }
    /// Write the data blocks for chunks `beg..end` and return their pointers as an index.
    /// Chunk 0 is written even if the image does not have it.
    fn write_data_run(&mut self,fimg: &FileImage,beg: usize,end: usize) -> Result<Vec<u16>,DYNERR> {
        let mut ans = vec![0;INDEX_PTRS];
        for idx in beg..end {
            let chunk = match (fimg.chunks.get(&idx),idx) {
                (Some(c),_) => c.clone(),
                (None,0) => vec![0;BLOCK_SIZE],
                (None,_) => continue
            };
            let ptr = self.alloc_block()?;
            self.write_block(&chunk,ptr as usize)?;
            ans[idx - beg] = ptr;
        }
        Ok(ans)
    }
    /// Write any sparse or sequential file.  The entry carries the name and metadata,
    /// storage fields are filled in here.  Nothing is written unless there is room for all of it.
    fn write_file(&mut self,mut entry: Entry,fimg: &FileImage) -> Result<usize,DYNERR> {
        let name = entry.name();
        if self.find_entry(&name)?.is_some() {
            error!("{} already exists",name);
            return Err(Box::new(Error::DuplicateFilename));
        }
        let (stype,needed) = storage_plan(&fimg.ordered_indices(),fimg.end())?;
        if needed > self.num_free_blocks() {
            error!("{} blocks are needed",needed);
            return Err(Box::new(Error::DiskFull));
        }
        let loc = match self.entries()?.into_iter().find(|(_,e)| !e.is_active()) {
            Some((loc,_)) => loc,
            None => {
                error!("volume directory is full");
                return Err(Box::new(Error::DirectoryFull));
            }
        };
        match self.write_file_unchecked(&loc,&mut entry,fimg,stype,needed) {
            Ok(()) => {
                self.commit()?;
                Ok(needed)
            },
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }
    fn write_file_unchecked(&mut self,loc: &EntryLocation,entry: &mut Entry,fimg: &FileImage,stype: StorageType,blocks: usize) -> STDRESULT {
        let end = usize::max(fimg.end(),1);
        let key = match stype {
            StorageType::Seedling => {
                let ptrs = self.write_data_run(fimg,0,1)?;
                ptrs[0]
            },
            StorageType::Sapling => {
                let index_ptr = self.alloc_block()?;
                let ptrs = self.write_data_run(fimg,0,end)?;
                self.write_block(&pack_index(&ptrs),index_ptr as usize)?;
                index_ptr
            },
            _ => {
                let master_ptr = self.alloc_block()?;
                let mut master = vec![0;INDEX_PTRS];
                for m in 0..(end + INDEX_PTRS - 1) / INDEX_PTRS {
                    let beg = m * INDEX_PTRS;
                    let stop = usize::min(beg + INDEX_PTRS,end);
                    if m>0 && !(beg..stop).any(|i| fimg.chunks.contains_key(&i)) {
                        continue;
                    }
                    let index_ptr = self.alloc_block()?;
                    let ptrs = self.write_data_run(fimg,beg,stop)?;
                    self.write_block(&pack_index(&ptrs),index_ptr as usize)?;
                    master[m] = index_ptr;
                }
                self.write_block(&pack_index(&master),master_ptr as usize)?;
                master_ptr
            }
        };
        entry.set_storage_type(stype);
        entry.set_ptr(key);
        entry.blocks_used = u16::to_le_bytes(blocks as u16);
        entry.set_eof(fimg.get_eof());
        entry.header_ptr = u16::to_le_bytes(VOL_KEY_BLOCK);
        // the entry goes last
        self.write_entry(loc,entry)?;
        let mut key_block = self.key_block()?;
        key_block.header.inc_file_count();
        self.write_key_block(&key_block)
    }
    /// Deallocate the index block and all data blocks referenced by it.
    /// The swapped index block is queued in `swaps`, nothing is written yet.
    fn deallocate_index_block(&mut self,index_ptr: usize,swaps: &mut Vec<(usize,Vec<u8>)>) -> STDRESULT {
        let index_block = self.read_block(index_ptr)?;
        for ptr in unpack_index(&index_block,INDEX_PTRS) {
            if ptr>0 {
                self.deallocate_block(ptr as usize)?;
            }
        }
        // ProDOS swaps the index block halves upon deletion
        swaps.push((index_ptr,[&index_block[256..512],&index_block[0..256]].concat()));
        self.deallocate_block(index_ptr)
    }
    /// Free every block of the file in the bitmap buffer.  Index blocks are only
    /// rewritten once every pointer has been found in range.
    fn deallocate_file_blocks(&mut self,entry: &Entry) -> STDRESULT {
        let key = entry.get_ptr() as usize;
        let mut swaps = Vec::new();
        match entry.storage_type() {
            StorageType::Seedling => self.deallocate_block(key)?,
            StorageType::Sapling => self.deallocate_index_block(key,&mut swaps)?,
            StorageType::Tree => {
                let master_block = self.read_block(key)?;
                for ptr in unpack_index(&master_block,MASTER_PTRS) {
                    if ptr>0 {
                        self.deallocate_index_block(ptr as usize,&mut swaps)?;
                    }
                }
                swaps.push((key,[&master_block[256..512],&master_block[0..256]].concat()));
                self.deallocate_block(key)?;
            },
            _ => return Err(Box::new(Error::FileTypeMismatch))
        }
        for (iblock,dat) in swaps {
            self.write_block(&dat,iblock)?;
        }
        Ok(())
    }
    fn delete_unchecked(&mut self,loc: &EntryLocation,entry: &mut Entry) -> STDRESULT {
        self.deallocate_file_blocks(entry)?;
        entry.delete();
        self.write_entry(loc,entry)?;
        let mut key_block = self.key_block()?;
        key_block.header.dec_file_count();
        self.write_key_block(&key_block)
    }
    /// modify a file entry, optionally lock, unlock, rename, retype; renaming a locked file will fail.
    fn modify(&mut self,name: &str,maybe_lock: Option<bool>,maybe_new_name: Option<&str>,maybe_new_type: Option<u8>) -> STDRESULT {
        let (loc,mut entry) = self.find_file(name)?;
        if let Some(new_name) = maybe_new_name {
            if !entry.get_access(Access::Rename) {
                error!("{} is locked",name);
                return Err(Box::new(Error::FileLocked));
            }
            check_name(new_name)?;
            if let Some((other,_)) = self.find_entry(new_name)? {
                if other!=loc {
                    error!("{} already exists",new_name);
                    return Err(Box::new(Error::DuplicateFilename));
                }
            }
            entry.rename(new_name);
        }
        match maybe_lock {
            Some(true) => {
                entry.set_access(Access::Destroy,false);
                entry.set_access(Access::Rename,false);
                entry.set_access(Access::Write,false);
            },
            Some(false) => {
                entry.set_access(Access::Read,true);
                entry.set_access(Access::Destroy,true);
                entry.set_access(Access::Rename,true);
                entry.set_access(Access::Write,true);
            },
            None => {}
        }
        if let Some(typ) = maybe_new_type {
            entry.file_type = typ;
        }
        self.write_entry(&loc,&entry)
    }
}

impl super::DiskFS for Disk {
    fn new_fimg(&self) -> FileImage {
        self.new_fimg_internal()
    }
    fn stat(&mut self) -> Result<Stat,DYNERR> {
        let key = self.key_block()?;
        let free = self.num_free_blocks();
        Ok(Stat {
            fs_name: super::PRODOS.to_string(),
            label: key.header.name(),
            block_size: BLOCK_SIZE,
            total_blocks: self.total_blocks,
            free_blocks: free,
            file_count: key.header.file_count() as usize,
            largest_free: free
        })
    }
    fn catalog(&mut self,include_deleted: bool) -> Result<Vec<CatalogEntry>,DYNERR> {
        const DATE_FMT: &str = "%d-%b-%y %H:%M";
        let mut ans = Vec::new();
        for (_,entry) in self.entries()? {
            if !entry.is_active() && !(include_deleted && entry.is_deleted()) {
                continue;
            }
            let typ = type_mnemonic(entry.file_type);
            let modified = unpack_time(entry.last_mod);
            let date_str = |t: Option<chrono::NaiveDateTime>| match t {
                Some(t) => t.format(DATE_FMT).to_string(),
                None => "<NO DATE>".to_string()
            };
            let locked = entry.access & 0x82 != 0x82;
            ans.push(CatalogEntry {
                name: entry.name(),
                fs_type: entry.file_type,
                type_name: typ.clone(),
                units: entry.blocks_used() as usize,
                eof: Some(entry.eof()),
                aux: Some(entry.aux()),
                start: Block::PO(entry.get_ptr() as usize),
                locked,
                deleted: entry.is_deleted(),
                modified,
                native: format!("{}{:15} {:4} {:6} {:16} {:16} {:7} ${:04X}",
                    match locked { true => "*", false => " " },
                    entry.name(),
                    typ,
                    entry.blocks_used(),
                    date_str(modified),
                    date_str(unpack_time(entry.create_time)),
                    entry.eof(),
                    entry.aux())
            });
        }
        Ok(ans)
    }
    fn rename_volume(&mut self,name: &str) -> STDRESULT {
        check_name(name)?;
        let mut key = self.key_block()?;
        key.header.rename(name);
        self.write_key_block(&key)
    }
    fn delete(&mut self,name: &str) -> STDRESULT {
        let (loc,mut entry) = self.find_file(name)?;
        if !entry.get_access(Access::Destroy) {
            error!("{} is locked",name);
            return Err(Box::new(Error::FileLocked));
        }
        match self.delete_unchecked(&loc,&mut entry) {
            Ok(()) => self.commit(),
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }
    fn rename(&mut self,old_name: &str,new_name: &str) -> STDRESULT {
        self.modify(old_name,None,Some(new_name),None)
    }
    fn lock(&mut self,name: &str) -> STDRESULT {
        self.modify(name,Some(true),None,None)
    }
    fn unlock(&mut self,name: &str) -> STDRESULT {
        self.modify(name,Some(false),None,None)
    }
    fn retype(&mut self,name: &str,typ: ItemType) -> STDRESULT {
        self.modify(name,None,None,Some(typ.prodos_type()))
    }
    fn get(&mut self,name: &str) -> Result<FileContent,DYNERR> {
        let (_,entry) = self.find_file(name)?;
        let fimg = self.read_file(&entry)?;
        Ok(FileContent {
            name: entry.name(),
            data: fimg.sequence_limited(entry.eof()),
            resource: None,
            file_type: entry.file_type,
            aux_type: entry.aux(),
            access: entry.access
        })
    }
    fn put(&mut self,content: &FileContent) -> Result<usize,DYNERR> {
        check_name(&content.name)?;
        if content.resource.is_some() {
            warn!("resource fork of {} is not stored",content.name);
        }
        let entry = Entry::create_file(&content.name,content.file_type,content.aux_type,content.access,None);
        let mut fimg = self.new_fimg_internal();
        fimg.desequence(&content.data);
        self.write_file(entry,&fimg)
    }
    fn read_any(&mut self,name: &str) -> Result<FileImage,DYNERR> {
        let (_,entry) = self.find_file(name)?;
        self.read_file(&entry)
    }
    fn write_any(&mut self,fimg: &FileImage) -> Result<usize,DYNERR> {
        if fimg.file_system!=super::PRODOS || fimg.chunk_len!=BLOCK_SIZE {
            error!("file image from {} with chunk length {} is incompatible with ProDOS",fimg.file_system,fimg.chunk_len);
            return Err(Box::new(super::Error::FileImageFormat));
        }
        if fimg.fs_type.len()!=1 || fimg.access.len()!=1 || fimg.aux.len()!=2 {
            error!("ProDOS file image metadata has the wrong length");
            return Err(Box::new(super::Error::FileImageFormat));
        }
        check_name(&fimg.name)?;
        let mut entry = Entry::create_file(&fimg.name,fimg.fs_type[0],fimg.get_aux() as u16,fimg.access[0],None);
        if fimg.created.len()==4 {
            entry.create_time.copy_from_slice(&fimg.created);
        }
        if fimg.modified.len()==4 {
            entry.last_mod.copy_from_slice(&fimg.modified);
        }
        entry.vers = fimg.version.first().copied().unwrap_or(0);
        entry.min_vers = fimg.min_version.first().copied().unwrap_or(0);
        self.write_file(entry,fimg)
    }
    fn get_img(&mut self) -> &mut Box<dyn img::DiskImage> {
        &mut self.img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::DiskFS;

    fn new_disk(blocks: u16) -> Disk {
        let img = img::dsk_po::PO::create(blocks).expect("could not create image");
        let mut disk = Disk::from_img(Box::new(img)).expect("could not mount");
        disk.format("TEST",None).expect("could not format");
        disk
    }

    #[test]
    fn plans() {
        assert_eq!(storage_plan(&[],0).unwrap(),(StorageType::Seedling,1));
        assert_eq!(storage_plan(&[0],1).unwrap(),(StorageType::Seedling,1));
        assert_eq!(storage_plan(&[0,1],2).unwrap(),(StorageType::Sapling,3));
        // sparse sapling still allocates the first block
        assert_eq!(storage_plan(&[9],10).unwrap(),(StorageType::Sapling,3));
        let all: Vec<usize> = (0..257).collect();
        assert_eq!(storage_plan(&all,257).unwrap(),(StorageType::Tree,257 + 2 + 1));
        assert_eq!(storage_plan(&[0,1000],1001).unwrap(),(StorageType::Tree,2 + 2 + 1));
        assert!(storage_plan(&[32768],32769).is_err());
    }

    #[test]
    fn bitmap() {
        let mut disk = new_disk(280);
        // boot, volume directory, bitmap
        assert_eq!(disk.num_free_blocks(),273);
        assert_eq!(disk.get_available_block(),Some(7));
        assert_eq!(disk.bitmap[0],0x01);
        assert_eq!(disk.bitmap[1],0xff);
        // bits past the end of the volume are not free
        assert_eq!(disk.bitmap[35],0x00);
        disk.allocate_block(8).expect("allocate failed");
        assert_eq!(disk.bitmap[1],0x7f);
        disk.rollback();
        assert_eq!(disk.bitmap[1],0xff);
        assert_eq!(capacity(280),(273,51));
        assert_eq!(capacity(65535).0,65535 - 6 - 16);
    }

    #[test]
    fn tree_file() {
        let mut disk = new_disk(1600);
        let mut fimg = disk.new_fimg();
        fimg.name = "TREE".to_string();
        fimg.fs_type = vec![0x06];
        fimg.access = vec![0xc3];
        fimg.chunks.insert(0,vec![1;512]);
        fimg.chunks.insert(300,vec![2;512]);
        fimg.eof = vec![0,0x5a,0x02];
        assert_eq!(disk.write_any(&fimg).expect("write failed"),5);
        let back = disk.read_any("TREE").expect("read failed");
        assert_eq!(back.ordered_indices(),vec![0,300]);
        assert_eq!(back.chunks[&300],vec![2;512]);
        assert_eq!(back.get_eof(),301*512);
        let free = disk.num_free_blocks();
        disk.delete("TREE").expect("delete failed");
        assert_eq!(disk.num_free_blocks(),free + 5);
    }

    #[test]
    fn delete_swaps_index() {
        let mut disk = new_disk(280);
        let content = FileContent::new("SAPLING",&vec![0x55;1000],ItemType::Binary,Some(0x2000));
        assert_eq!(disk.put(&content).expect("put failed"),3);
        let (_,entry) = disk.find_file("SAPLING").expect("not found");
        let index_ptr = entry.get_ptr() as usize;
        let before = disk.read_block(index_ptr).expect("read failed");
        disk.delete("SAPLING").expect("delete failed");
        let after = disk.read_block(index_ptr).expect("read failed");
        assert_eq!(&after[0..256],&before[256..512]);
        assert_eq!(&after[256..512],&before[0..256]);
        let cat = disk.catalog(true).expect("catalog failed");
        assert_eq!(cat.len(),1);
        assert!(cat[0].deleted);
        assert_eq!(disk.num_free_blocks(),273);
    }
}
