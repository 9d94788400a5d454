//! ## File Image Module
//!
//! Methods of `FileImage` and its JSON representation.  The AppleSingle codec for
//! moving `FileContent` in and out of the crate lives in the `applesingle` submodule.

pub mod applesingle;

use std::str::FromStr;
use std::collections::{BTreeMap,HashMap};
use log::{warn,error};
use super::{FileImage,Error};
use crate::DYNERR;

impl FileImage {
    pub fn fimg_version() -> String {
        "2.0.0".to_string()
    }
    /// Create an empty file image, metadata vectors are sized by the file system
    pub fn new(file_system: &str,chunk_len: usize) -> Self {
        Self {
            fimg_version: Self::fimg_version(),
            file_system: file_system.to_string(),
            chunk_len,
            eof: Vec::new(),
            fs_type: Vec::new(),
            aux: Vec::new(),
            access: Vec::new(),
            created: Vec::new(),
            modified: Vec::new(),
            version: Vec::new(),
            min_version: Vec::new(),
            name: String::new(),
            chunks: HashMap::new()
        }
    }
    /// the string slices must be in the form X.Y.Z
    pub fn version_tuple(vers: &str) -> Result<(usize,usize,usize),DYNERR> {
        let v: Vec<usize> = vers.split('.').filter_map(|s| usize::from_str(s).ok()).collect();
        if v.len()!=3 {
            error!("bad version format {}",vers);
            return Err(Box::new(Error::FileImageFormat));
        }
        Ok((v[0],v[1],v[2]))
    }
    pub fn ordered_indices(&self) -> Vec<usize> {
        let mut idx_list = self.chunks.keys().copied().collect::<Vec<usize>>();
        idx_list.sort_unstable();
        idx_list
    }
    /// Find the logical number of chunks (assuming indexing from 0..end)
    pub fn end(&self) -> usize {
        match self.ordered_indices().pop() {
            Some(idx) => idx+1,
            None => 0
        }
    }
    pub fn get_eof(&self) -> usize {
        Self::usize_from_truncated_le_bytes(&self.eof)
    }
    pub fn set_eof(&mut self,eof: usize) {
        self.eof = Self::fix_le_vec(eof,self.eof.len());
    }
    pub fn get_ftype(&self) -> usize {
        Self::usize_from_truncated_le_bytes(&self.fs_type)
    }
    pub fn get_aux(&self) -> usize {
        Self::usize_from_truncated_le_bytes(&self.aux)
    }
    /// pack the data sequentially, missing chunks are filled with zeros
    pub fn sequence(&self) -> Vec<u8> {
        let mut ans: Vec<u8> = Vec::new();
        for idx in 0..self.end() {
            match self.chunks.get(&idx) {
                Some(v) => ans.extend_from_slice(&crate::img::quantize_block(v,self.chunk_len)),
                None => ans.extend_from_slice(&vec![0;self.chunk_len])
            }
        }
        ans
    }
    /// pack the data sequentially and cut it at `max_len`
    pub fn sequence_limited(&self,max_len: usize) -> Vec<u8> {
        let mut ans = self.sequence();
        ans.resize(max_len,0);
        ans
    }
    /// Use any byte stream as the file image data.  The eof is set to the length of the data.
    /// The last chunk is not padded.  The existing chunks, if any, are thrown away.
    pub fn desequence(&mut self, dat: &[u8]) {
        self.chunks = HashMap::new();
        for (idx,chunk) in dat.chunks(self.chunk_len).enumerate() {
            self.chunks.insert(idx,chunk.to_vec());
        }
        self.eof = Self::fix_le_vec(dat.len(),self.eof.len());
    }
    /// throw out trailing zeros with exact length constraint
    pub fn fix_le_vec(val: usize,exact_len: usize) -> Vec<u8> {
        let mut ans = usize::to_le_bytes(val).to_vec();
        ans.resize(exact_len,0);
        ans
    }
    /// compute a usize assuming missing trailing bytes are 0
    pub fn usize_from_truncated_le_bytes(bytes: &[u8]) -> usize {
        let mut ans: usize = 0;
        for (i,byte) in bytes.iter().enumerate() {
            if i == usize::BITS as usize/8 {
                break;
            }
            ans += (*byte as usize) << (i*8);
        }
        ans
    }
    fn parse_hex_to_vec(key: &str,parsed: &json::JsonValue) -> Result<Vec<u8>,DYNERR> {
        if let Some(s) = parsed[key].as_str() {
            if let Ok(bytes) = hex::decode(s) {
                return Ok(bytes);
            }
        }
        error!("record {} is missing in the file image",key);
        Err(Box::new(Error::FileImageFormat))
    }
    fn parse_usize(key: &str,parsed: &json::JsonValue) -> Result<usize,DYNERR> {
        if let Some(val) = parsed[key].as_usize() {
            return Ok(val);
        }
        error!("record {} is missing in the file image",key);
        Err(Box::new(Error::FileImageFormat))
    }
    fn parse_str(key: &str,parsed: &json::JsonValue) -> Result<String,DYNERR> {
        if let Some(s) = parsed[key].as_str() {
            return Ok(s.to_string());
        }
        error!("record {} is missing in the file image",key);
        Err(Box::new(Error::FileImageFormat))
    }
    /// Get chunks from the JSON string representation.
    pub fn from_json(json_str: &str) -> Result<FileImage,DYNERR> {
        let parsed = json::parse(json_str)?;
        let fimg_version = Self::parse_str("fimg_version",&parsed)?;
        if Self::version_tuple(&fimg_version)? < (2,0,0) {
            error!("file image v2 or higher is required");
            return Err(Box::new(Error::FileImageFormat));
        }
        let file_system = Self::parse_str("file_system",&parsed)?;
        let chunk_len = Self::parse_usize("chunk_len", &parsed)?;
        if chunk_len==0 {
            error!("chunk length cannot be zero");
            return Err(Box::new(Error::FileImageFormat));
        }
        let mut chunks: HashMap<usize,Vec<u8>> = HashMap::new();
        let map_obj = &parsed["chunks"];
        if map_obj.entries().len()==0 {
            warn!("file image contains metadata, but no data");
        }
        for (key,hex) in map_obj.entries() {
            let dat = match (usize::from_str(key),hex.as_str().map(hex::decode)) {
                (Ok(num),Some(Ok(dat))) => (num,dat),
                _ => {
                    error!("could not read hex string from chunk {}",key);
                    return Err(Box::new(Error::FileImageFormat));
                }
            };
            chunks.insert(dat.0,dat.1);
        }
        Ok(Self {
            fimg_version,
            file_system,
            chunk_len,
            eof: Self::parse_hex_to_vec("eof",&parsed)?,
            fs_type: Self::parse_hex_to_vec("fs_type",&parsed)?,
            aux: Self::parse_hex_to_vec("aux",&parsed)?,
            access: Self::parse_hex_to_vec("access",&parsed)?,
            created: Self::parse_hex_to_vec("created",&parsed)?,
            modified: Self::parse_hex_to_vec("modified",&parsed)?,
            version: Self::parse_hex_to_vec("version",&parsed)?,
            min_version: Self::parse_hex_to_vec("min_version",&parsed)?,
            name: Self::parse_str("name",&parsed)?,
            chunks
        })
    }
    /// Put chunks into the JSON string representation
    pub fn to_json(&self,indent: Option<u16>) -> String {
        let mut json_map = json::JsonValue::new_object();
        let sorted: BTreeMap<&usize,&Vec<u8>> = self.chunks.iter().collect();
        for (c,v) in sorted {
            json_map[c.to_string()] = json::JsonValue::String(hex::encode_upper(v));
        }
        let ans = json::object! {
            fimg_version: self.fimg_version.clone(),
            file_system: self.file_system.clone(),
            chunk_len: self.chunk_len,
            eof: hex::encode_upper(&self.eof),
            fs_type: hex::encode_upper(&self.fs_type),
            aux: hex::encode_upper(&self.aux),
            access: hex::encode_upper(&self.access),
            created: hex::encode_upper(&self.created),
            modified: hex::encode_upper(&self.modified),
            version: hex::encode_upper(&self.version),
            min_version: hex::encode_upper(&self.min_version),
            name: self.name.clone(),
            chunks: json_map
        };
        match indent {
            Some(spaces) => json::stringify_pretty(ans, spaces),
            None => json::stringify(ans)
        }
    }
}
