//! # DOS 3.3 file system module
//! This manipulates disk images containing one standard non-bootable
//! DOS 3.3 volume.  Two geometries are handled, 35 tracks of 16 sectors
//! (140K) and 50 tracks of 32 sectors (400K).
//!
//! * The module will try to emulate the order in which DOS would access sectors
//! * The VTOC is buffered, allocations are made in the buffer and written back only
//!   after the catalog entry, so a failed write leaves the volume as it was

pub mod types;
mod directory;

use num_traits::FromPrimitive;
use log::{debug,info,error};

use types::*;
use directory::*;
use super::{Block,CatalogEntry,FileContent,FileImage,ItemType,Stat,LOCKED_ACCESS,UNLOCKED_ACCESS};
use crate::img;
use crate::DiskStruct;
use crate::{STDRESULT,DYNERR};

fn file_name_to_string(fname: &[u8]) -> String {
    // fname is negative ASCII padded to the end with spaces
    // non-ASCII will go as hex escapes
    String::from(crate::escaped_ascii_from_bytes(fname,true,true).trim_end())
}

fn string_to_file_name(s: &str) -> [u8;30] {
    let mut ans: [u8;30] = [0xa0;30]; // fill with negative spaces
    let unescaped = crate::parse_escaped_ascii(s,true,true);
    for i in 0..NAME_LEN {
        if i<unescaped.len() {
            ans[i] = unescaped[i];
        }
    }
    ans
}

/// Check a file name against the rules DOS enforces.
pub fn check_name(s: &str) -> STDRESULT {
    let bytes = crate::parse_escaped_ascii(s,false,true);
    if bytes.len() > NAME_LEN {
        error!("DOS names are limited to {} characters",NAME_LEN);
        return Err(Box::new(super::Error::NameTooLong));
    }
    if bytes.is_empty() || !bytes[0].is_ascii_alphabetic() || bytes.contains(&b',') {
        error!("DOS names must begin with a letter and cannot contain commas");
        return Err(Box::new(Error::SyntaxError));
    }
    Ok(())
}

/// The DOS volume "name" is its number, an empty string gives 254.
pub fn parse_volume(s: &str) -> Result<u8,DYNERR> {
    if s.is_empty() {
        return Ok(254);
    }
    match u8::from_str_radix(s,10) {
        Ok(v) if v>0 && v<255 => Ok(v),
        _ => {
            error!("DOS volume must be a number from 1 to 254");
            Err(Box::new(super::Error::InvalidName))
        }
    }
}

/// Sectors a file will occupy, including its track/sector lists
pub fn footprint(content: &FileContent) -> Result<usize,DYNERR> {
    let typ = FileType::from_item(content.item_type());
    let data_sectors = match pack_data(typ,&content.data,content.aux_type)?.len() {
        0 => 1,
        n => (n + SECTOR_SIZE - 1) / SECTOR_SIZE
    };
    Ok(data_sectors + 1 + (data_sectors-1)/MAX_PAIRS as usize)
}

/// Returns (free sectors,catalog slots) of a fresh volume with this geometry
pub fn capacity(kind: img::DiskKind) -> Option<(usize,usize)> {
    let (tracks,sectors) = kind.dos_geometry()?;
    // track 0 and the VTOC track are not free
    Some(((tracks as usize - 2) * sectors as usize,(sectors as usize - 1) * ENTRIES_PER_SECTOR))
}

/// Location of a catalog entry, the directory sector and the index within it
struct EntryLocation {
    ts: [u8;2],
    idx: usize
}

/// The primary interface for disk operations.
pub struct Disk
{
    vtoc: VTOC,
    img: Box<dyn img::DiskImage>
}

impl Disk
{
    /// Create a disk file system using the given image as storage.
    /// The DiskFS takes ownership of the image.
    pub fn from_img(mut img: Box<dyn img::DiskImage>) -> Result<Self,DYNERR> {
        let dat = img.read_block(Block::DO([VTOC_TRACK as usize,0]))?;
        Ok(Self {
            vtoc: VTOC::from_bytes(&dat)?,
            img
        })
    }
    /// Test an image to see if it already contains DOS 3.3.
    pub fn test_img(img: &mut Box<dyn img::DiskImage>) -> bool {
        let tlen = img.track_count();
        if tlen!=35 && tlen!=50 {
            debug!("track count {} is unexpected",tlen);
            return false;
        }
        let vtoc = match img.read_block(Block::DO([VTOC_TRACK as usize,0])) {
            Ok(dat) => match VTOC::from_bytes(&dat) {
                Ok(v) => v,
                Err(_) => return false
            },
            Err(_) => {
                debug!("VTOC sector was not readable as DO");
                return false;
            }
        };
        let slen = match tlen { 35 => 16, _ => 32 };
        if vtoc.version<3 {
            debug!("VTOC wrong version {}",vtoc.version);
            return false;
        }
        if vtoc.vol<1 || vtoc.vol>254 {
            debug!("Volume {} out of range",vtoc.vol);
            return false;
        }
        if vtoc.track1 != VTOC_TRACK || vtoc.sector1 != slen-1 {
            debug!("VTOC wrong track1 {}, sector1 {}",vtoc.track1,vtoc.sector1);
            return false;
        }
        if vtoc.bytes != [0,1] || vtoc.sectors != slen || vtoc.tracks as usize != tlen {
            debug!("VTOC wrong bytes {:?}, sectors {}, tracks {}",vtoc.bytes,vtoc.sectors,vtoc.tracks);
            return false;
        }
        true
    }
    fn addr(&self,ts: [u8;2]) -> Block {
        Block::DO([ts[0] as usize,ts[1] as usize])
    }
    fn check_ts(&self,ts: [u8;2]) -> STDRESULT {
        if ts[0]>=self.vtoc.tracks || ts[1]>=self.vtoc.sectors {
            error!("track {} sector {} is outside the volume, image may be damaged",ts[0],ts[1]);
            return Err(Box::new(Error::Range));
        }
        Ok(())
    }
    /// pairs per track/sector list, a damaged VTOC cannot push this past the sector
    fn max_pairs(&self) -> usize {
        usize::min(self.vtoc.max_pairs as usize,MAX_PAIRS as usize)
    }
    fn get_track_map(&self,track: u8) -> u32 {
        let bm = &self.vtoc.bitmap;
        let i = (track as usize)*4;
        u32::from_be_bytes([bm[i],bm[i+1],bm[i+2],bm[i+3]])
    }
    fn save_track_map(&mut self,track: u8,map: u32) {
        let i = (track as usize)*4;
        self.vtoc.bitmap[i..i+4].copy_from_slice(&u32::to_be_bytes(map));
    }
    fn update_last_track(&mut self,track: u8) {
        // The last_direction and last_track fields are not discussed in DOS manual.
        // This way of setting them is a guess based on emulator outputs.
        if track<VTOC_TRACK {
            self.vtoc.last_direction = 255;
            self.vtoc.last_track = track;
        }
        if track>VTOC_TRACK {
            self.vtoc.last_direction = 1;
            self.vtoc.last_track = track;
        }
    }
    fn allocate_sector(&mut self,track: u8,sector: u8) {
        let mut map = self.get_track_map(track);
        let eff_sec: u32 = (sector + 32 - self.vtoc.sectors) as u32;
        map &= (1 << eff_sec) ^ u32::MAX;
        self.save_track_map(track,map);
    }
    fn deallocate_sector(&mut self,track: u8,sector: u8) {
        let mut map = self.get_track_map(track);
        let eff_sec: u32 = (sector + 32 - self.vtoc.sectors) as u32;
        map |= 1 << eff_sec;
        self.save_track_map(track,map);
    }
    fn is_sector_free(&self,track: u8,sector: u8) -> bool {
        let map = self.get_track_map(track);
        let eff_sec: u32 = (sector + 32 - self.vtoc.sectors) as u32;
        (map & (1 << eff_sec)) > 0
    }
    fn read_sector(&mut self,ts: [u8;2]) -> Result<Vec<u8>,DYNERR> {
        self.check_ts(ts)?;
        self.img.read_block(self.addr(ts))
    }
    fn write_sector(&mut self,dat: &[u8],ts: [u8;2]) -> STDRESULT {
        self.check_ts(ts)?;
        self.img.write_block(self.addr(ts),dat)
    }
    /// write the buffered VTOC to the disk
    fn commit(&mut self) -> STDRESULT {
        let dat = self.vtoc.to_bytes();
        self.write_sector(&dat,[VTOC_TRACK,0])
    }
    /// throw away buffered allocations
    fn rollback(&mut self) {
        match self.img.read_block(self.addr([VTOC_TRACK,0])) {
            Ok(dat) => match VTOC::from_bytes(&dat) {
                Ok(vtoc) => self.vtoc = vtoc,
                Err(e) => error!("VTOC could not be restored: {}",e)
            },
            Err(e) => error!("VTOC could not be restored: {}",e)
        }
    }
    /// Create a DOS 3.3 volume with the geometry of the underlying image.
    /// Track 0 is reserved but no boot code is written.
    pub fn format(&mut self,vol: u8) -> STDRESULT {
        let (tracks,sectors) = match self.img.kind().dos_geometry() {
            Some(geometry) => geometry,
            None => {
                error!("cannot put DOS 3.3 on {}",self.img.kind());
                return Err(Box::new(img::Error::IncompatibleDiskKind));
            }
        };
        if vol<1 || vol>254 {
            return Err(Box::new(super::Error::InvalidName));
        }
        let mut vtoc = VTOC::new();
        vtoc.pad1 = 4;
        vtoc.vol = vol;
        vtoc.last_track = VTOC_TRACK;
        vtoc.last_direction = 1;
        vtoc.max_pairs = MAX_PAIRS;
        vtoc.track1 = VTOC_TRACK;
        vtoc.sector1 = sectors-1;
        vtoc.version = 3;
        vtoc.bytes = [0,1];
        vtoc.sectors = sectors;
        vtoc.tracks = tracks;
        // Mark as free except track 0 and the VTOC track
        let all_free: [u8;4] = match sectors {
            16 => u32::to_be_bytes(0xffff0000),
            _ => u32::to_be_bytes(0xffffffff)
        };
        for track in 1..tracks as usize {
            if track != VTOC_TRACK as usize {
                vtoc.bitmap[track*4..track*4+4].copy_from_slice(&all_free);
            }
        }
        self.vtoc = vtoc;
        // the directory runs downward from the last sector of the VTOC track
        let mut dir = DirectorySector::new();
        self.write_sector(&dir.to_bytes(),[VTOC_TRACK,1])?;
        for sec in 2..sectors {
            dir.next_track = VTOC_TRACK;
            dir.next_sector = sec - 1;
            self.write_sector(&dir.to_bytes(),[VTOC_TRACK,sec])?;
        }
        self.commit()?;
        info!("formatted DOS 3.3 volume {} with {} tracks",vol,tracks);
        Ok(())
    }
    fn num_free_sectors(&self) -> usize {
        let mut ans: usize = 0;
        for track in 0..self.vtoc.tracks {
            for sector in 0..self.vtoc.sectors {
                if self.is_sector_free(track, sector) {
                    ans += 1;
                }
            }
        }
        ans
    }
    fn get_next_free_sector(&self,prefer_jump: bool) -> Option<[u8;2]> {
        // Search algorithm outlined in DOS manual seems inconsistent with actual results from emulators.
        // This algorithm is a guess at how DOS is doing it, based on emulator outputs.
        let tvtoc: u8 = self.vtoc.track1;
        let tstart = match self.vtoc.last_track {
            x if x>=self.vtoc.tracks || x==0 => tvtoc-1,
            x if x>tvtoc && prefer_jump => x+1,
            x if x<tvtoc && prefer_jump => x-1,
            x => x
        };
        let tend = self.vtoc.tracks;
        let search_tracks: Vec<u8> = if tstart<tvtoc {
            [
                (1..tstart+1).rev().collect::<Vec<u8>>(),
                (tvtoc+1..tend).collect(),
                (tstart+1..tvtoc).rev().collect()
            ].concat()
        } else {
            [
                (tstart..tend).collect::<Vec<u8>>(),
                (1..tvtoc).rev().collect(),
                (tvtoc+1..tstart).collect()
            ].concat()
        };
        for track in search_tracks {
            for sector in (0..self.vtoc.sectors).rev() {
                if self.is_sector_free(track,sector) {
                    return Some([track,sector]);
                }
            }
        }
        None
    }
    /// Read every directory sector in chain order
    fn directory(&mut self) -> Result<Vec<([u8;2],DirectorySector)>,DYNERR> {
        let mut ans = Vec::new();
        let mut ts = [self.vtoc.track1,self.vtoc.sector1];
        for _try in 0..MAX_DIRECTORY_REPS {
            let dir = DirectorySector::from_bytes(&self.read_sector(ts)?)?;
            let next = [dir.next_track,dir.next_sector];
            ans.push((ts,dir));
            if next[0] == 0 {
                return Ok(ans);
            }
            ts = next;
        }
        error!("the disk image directory seems to be damaged");
        Err(Box::new(Error::IOError))
    }
    fn find_entry(&mut self,name: &str) -> Result<Option<(EntryLocation,DirectoryEntry)>,DYNERR> {
        let fname = string_to_file_name(name);
        for (ts,dir) in self.directory()? {
            for (idx,entry) in dir.entries.iter().enumerate() {
                if entry.is_active() && fname==entry.name {
                    return Ok(Some((EntryLocation { ts, idx },entry.clone())));
                }
            }
        }
        Ok(None)
    }
    fn find_active(&mut self,name: &str) -> Result<(EntryLocation,DirectoryEntry),DYNERR> {
        match self.find_entry(name)? {
            Some(ans) => Ok(ans),
            None => {
                debug!("{} not found",name);
                Err(Box::new(Error::FileNotFound))
            }
        }
    }
    /// first slot that was never used or was deleted
    fn get_next_directory_slot(&mut self) -> Result<Option<EntryLocation>,DYNERR> {
        for (ts,dir) in self.directory()? {
            for (idx,entry) in dir.entries.iter().enumerate() {
                if !entry.is_active() {
                    return Ok(Some(EntryLocation { ts, idx }));
                }
            }
        }
        Ok(None)
    }
    fn write_entry(&mut self,loc: &EntryLocation,entry: &DirectoryEntry) -> STDRESULT {
        let mut dir = DirectorySector::from_bytes(&self.read_sector(loc.ts)?)?;
        dir.entries[loc.idx] = entry.clone();
        self.write_sector(&dir.to_bytes(),loc.ts)
    }
    /// Track/sector list sectors of a file in order
    fn tslist_chain(&mut self,first: [u8;2]) -> Result<Vec<([u8;2],TrackSectorList)>,DYNERR> {
        let mut ans = Vec::new();
        let mut ts = first;
        for _try in 0..MAX_TSLIST_REPS {
            let tslist = TrackSectorList::from_bytes(&self.read_sector(ts)?)?;
            let next = [tslist.next_track,tslist.next_sector];
            ans.push((ts,tslist));
            if next[0] == 0 {
                return Ok(ans);
            }
            ts = next;
        }
        error!("the disk image track sector list seems to be damaged");
        Err(Box::new(Error::IOError))
    }
    /// Read any file into the sparse file format.  Use `FileImage.sequence()` to flatten the result
    /// when it is expected to be sequential.
    fn read_file(&mut self,entry: &DirectoryEntry) -> Result<FileImage,DYNERR> {
        let mut ans = self.new_fimg_internal();
        ans.fs_type = vec![entry.file_type];
        ans.name = file_name_to_string(&entry.name);
        let mut count: usize = 0;
        for (_,tslist) in self.tslist_chain([entry.tsl_track,entry.tsl_sector])? {
            for p in 0..self.max_pairs() {
                let next = [tslist.pairs[p*2],tslist.pairs[p*2+1]];
                if next[0]>0 {
                    ans.chunks.insert(count,self.read_sector(next)?);
                }
                count += 1;
            }
        }
        Ok(ans)
    }
    fn new_fimg_internal(&self) -> FileImage {
        let mut ans = FileImage::new(super::A2_DOS,SECTOR_SIZE);
        ans.fs_type = vec![0];
        ans.version = vec![self.vtoc.version];
        ans
    }
    /// Write any sparse or sequential file.  Nothing is written unless there is room for all of it.
    fn write_file(&mut self,name: &str,fimg: &FileImage,file_type: u8) -> Result<usize,DYNERR> {
        if fimg.chunks.is_empty() {
            error!("empty data is not allowed for DOS 3.3 file images");
            return Err(Box::new(Error::EndOfData));
        }
        check_name(name)?;
        if self.find_entry(name)?.is_some() {
            error!("{} already exists",name);
            return Err(Box::new(super::Error::NameConflict));
        }
        let max_pairs = self.max_pairs();
        let data_sectors = fimg.chunks.len();
        let tslist_sectors = 1 + (fimg.end()-1)/max_pairs;
        if data_sectors + tslist_sectors > self.num_free_sectors() {
            error!("{} sectors are needed",data_sectors + tslist_sectors);
            return Err(Box::new(Error::DiskFull));
        }
        let loc = match self.get_next_directory_slot()? {
            Some(loc) => loc,
            None => {
                error!("catalog is full");
                return Err(Box::new(Error::DiskFull))
            }
        };
        match self.write_file_unchecked(&loc,name,fimg,file_type,data_sectors + tslist_sectors) {
            Ok(()) => {
                self.commit()?;
                Ok(data_sectors + tslist_sectors)
            },
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }
    fn alloc_next(&mut self,prefer_jump: bool) -> Result<[u8;2],DYNERR> {
        match self.get_next_free_sector(prefer_jump) {
            Some(ts) => {
                self.allocate_sector(ts[0],ts[1]);
                self.update_last_track(ts[0]);
                Ok(ts)
            },
            None => Err(Box::new(Error::DiskFull))
        }
    }
    fn write_file_unchecked(&mut self,loc: &EntryLocation,name: &str,fimg: &FileImage,file_type: u8,total: usize) -> STDRESULT {
        let max_pairs = self.max_pairs();
        let first_tslist_ts = self.alloc_next(true)?;
        let mut tslist_ts = first_tslist_ts;
        let mut tslist = TrackSectorList::new();
        let mut p = 0;
        let mut sec_base = 0;
        for s in 0..fimg.end() {
            if let Some(chunk) = fimg.chunks.get(&s) {
                let data_ts = self.alloc_next(false)?;
                tslist.pairs[p*2] = data_ts[0];
                tslist.pairs[p*2+1] = data_ts[1];
                self.write_sector(chunk,data_ts)?;
            }
            p += 1;
            if p==max_pairs && s+1!=fimg.end() {
                // tslist spilled over to another sector
                let next_tslist_ts = self.alloc_next(false)?;
                tslist.next_track = next_tslist_ts[0];
                tslist.next_sector = next_tslist_ts[1];
                self.write_sector(&tslist.to_bytes(),tslist_ts)?;
                tslist_ts = next_tslist_ts;
                sec_base += max_pairs;
                tslist = TrackSectorList::new();
                tslist.sector_base = u16::to_le_bytes(sec_base as u16);
                p = 0;
            }
        }
        self.write_sector(&tslist.to_bytes(),tslist_ts)?;
        // the entry goes last
        let mut entry = DirectoryEntry::new();
        entry.tsl_track = first_tslist_ts[0];
        entry.tsl_sector = first_tslist_ts[1];
        entry.file_type = file_type;
        entry.name = string_to_file_name(name);
        entry.sectors = u16::to_le_bytes(total as u16);
        self.write_entry(loc,&entry)
    }
    /// modify a file entry, attempt to rename a locked file will fail.
    fn modify(&mut self,name: &str,maybe_lock: Option<bool>,maybe_new_name: Option<&str>,maybe_ftype: Option<FileType>) -> STDRESULT {
        let (loc,mut entry) = self.find_active(name)?;
        if let Some(new_name) = maybe_new_name {
            if entry.file_type & LOCK_BIT > 0 {
                error!("{} is locked",name);
                return Err(Box::new(Error::FileLocked));
            }
            check_name(new_name)?;
            if string_to_file_name(new_name)!=entry.name && self.find_entry(new_name)?.is_some() {
                error!("{} already exists",new_name);
                return Err(Box::new(super::Error::NameConflict));
            }
            entry.name = string_to_file_name(new_name);
        }
        entry.file_type = match maybe_lock {
            Some(true) => entry.file_type | LOCK_BIT,
            Some(false) => entry.file_type & !LOCK_BIT,
            None => entry.file_type
        };
        if let Some(typ) = maybe_ftype {
            entry.file_type = (entry.file_type & LOCK_BIT) | typ as u8;
        }
        self.write_entry(&loc,&entry)
    }
    fn delete_unchecked(&mut self,loc: &EntryLocation,entry: &mut DirectoryEntry) -> STDRESULT {
        for (ts,tslist) in self.tslist_chain([entry.tsl_track,entry.tsl_sector])? {
            for p in 0..self.max_pairs() {
                let pair = [tslist.pairs[p*2],tslist.pairs[p*2+1]];
                if pair[0]>0 && pair[0]<255 {
                    self.check_ts(pair)?;
                    self.deallocate_sector(pair[0],pair[1]);
                }
            }
            self.deallocate_sector(ts[0],ts[1]);
        }
        entry.name[NAME_LEN-1] = entry.tsl_track;
        entry.tsl_track = 255;
        self.write_entry(loc,entry)
    }
}

impl super::DiskFS for Disk {
    fn new_fimg(&self) -> FileImage {
        self.new_fimg_internal()
    }
    fn stat(&mut self) -> Result<Stat,DYNERR> {
        let mut file_count = 0;
        for (_,dir) in self.directory()? {
            file_count += dir.entries.iter().filter(|e| e.is_active()).count();
        }
        let free = self.num_free_sectors();
        Ok(Stat {
            fs_name: super::A2_DOS.to_string(),
            label: self.vtoc.vol.to_string(),
            block_size: SECTOR_SIZE,
            total_blocks: self.vtoc.tracks as usize * self.vtoc.sectors as usize,
            free_blocks: free,
            file_count,
            largest_free: free
        })
    }
    fn catalog(&mut self,include_deleted: bool) -> Result<Vec<CatalogEntry>,DYNERR> {
        let mut ans = Vec::new();
        for (_,dir) in self.directory()? {
            for entry in dir.entries.iter() {
                if !entry.is_active() && !(include_deleted && entry.is_deleted()) {
                    continue;
                }
                let (name,tsl_track) = match entry.is_deleted() {
                    true => (file_name_to_string(&entry.name[0..NAME_LEN-1]),entry.name[NAME_LEN-1]),
                    false => (file_name_to_string(&entry.name),entry.tsl_track)
                };
                let locked = entry.file_type & LOCK_BIT > 0;
                let typ = entry.file_type & !LOCK_BIT;
                let mnemonic = match FileType::from_u8(typ) {
                    Some(t) => t.mnemonic(),
                    None => "?"
                };
                let sectors = u16::from_le_bytes(entry.sectors) as usize;
                ans.push(CatalogEntry {
                    name: name.clone(),
                    fs_type: typ,
                    type_name: mnemonic.to_string(),
                    units: sectors,
                    eof: None,
                    aux: None,
                    start: Block::DO([tsl_track as usize,entry.tsl_sector as usize]),
                    locked,
                    deleted: entry.is_deleted(),
                    modified: None,
                    native: format!("{}{} {:03} {}",match locked { true => "*", false => " " },mnemonic,sectors % 1000,name)
                });
            }
        }
        Ok(ans)
    }
    fn rename_volume(&mut self,name: &str) -> STDRESULT {
        self.vtoc.vol = parse_volume(name)?;
        self.commit()
    }
    fn delete(&mut self,name: &str) -> STDRESULT {
        let (loc,mut entry) = self.find_active(name)?;
        if entry.file_type & LOCK_BIT > 0 {
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
        self.modify(name,None,None,Some(FileType::from_item(typ)))
    }
    fn get(&mut self,name: &str) -> Result<FileContent,DYNERR> {
        let (_,entry) = self.find_active(name)?;
        let fimg = self.read_file(&entry)?;
        let typ = match FileType::from_u8(entry.file_type & !LOCK_BIT) {
            Some(t) => t,
            None => FileType::S
        };
        let (load_addr,data) = unpack_data(typ,&fimg.sequence())?;
        Ok(FileContent {
            name: file_name_to_string(&entry.name),
            data,
            resource: None,
            file_type: typ.to_item().prodos_type(),
            aux_type: load_addr,
            access: match entry.file_type & LOCK_BIT > 0 {
                true => LOCKED_ACCESS,
                false => UNLOCKED_ACCESS
            }
        })
    }
    fn put(&mut self,content: &FileContent) -> Result<usize,DYNERR> {
        let typ = FileType::from_item(content.item_type());
        let mut fimg = self.new_fimg_internal();
        fimg.desequence(&pack_data(typ,&content.data,content.aux_type)?);
        let mut file_type = typ as u8;
        if content.is_locked() {
            file_type |= LOCK_BIT;
        }
        self.write_file(&content.name,&fimg,file_type)
    }
    fn read_any(&mut self,name: &str) -> Result<FileImage,DYNERR> {
        let (_,entry) = self.find_active(name)?;
        self.read_file(&entry)
    }
    fn write_any(&mut self,fimg: &FileImage) -> Result<usize,DYNERR> {
        if fimg.file_system!=super::A2_DOS || fimg.chunk_len!=SECTOR_SIZE {
            error!("file image from {} with chunk length {} is incompatible with DOS 3.3",fimg.file_system,fimg.chunk_len);
            return Err(Box::new(super::Error::FileImageFormat));
        }
        let file_type = match fimg.fs_type.first() {
            Some(t) => *t,
            None => return Err(Box::new(super::Error::FileImageFormat))
        };
        self.write_file(&fimg.name,fimg,file_type)
    }
    fn get_img(&mut self) -> &mut Box<dyn img::DiskImage> {
        &mut self.img
    }
}
