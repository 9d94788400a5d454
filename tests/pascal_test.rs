// test of pascal disk image module
use a2store::fs::{DiskFS,DisplayMode,ItemType,FsKind,Error,error_kind};
use a2store::img::DiskKind;

const PROG1: &str =
"PROGRAM TEST;
BEGIN
  WRITE('HELLO FROM PASCAL')
END.";

fn new_disk(blocks: usize) -> Box<dyn DiskFS> {
    a2store::create_image(FsKind::Pascal,DiskKind::from_blocks(blocks),"blank").expect("could not create Pascal volume")
}

fn put_blocks(disk: &mut Box<dyn DiskFS>,name: &str,blocks: usize) {
    a2store::put_file(disk,name,&vec![0xee;blocks*512],ItemType::Binary,None).expect("put failed");
}

#[test]
fn format() {
    let mut disk = new_disk(280);
    let stat = disk.stat().expect("no stat");
    assert_eq!(stat.label,"BLANK");
    assert_eq!(stat.total_blocks,280);
    assert_eq!(stat.free_blocks,274);
    assert_eq!(stat.largest_free,274);
    assert!(disk.catalog(true).expect("no catalog").is_empty());
    let lines = a2store::list_directory(&mut disk,DisplayMode::Native).expect("no listing");
    assert_eq!(lines,vec!["BLANK:".to_string(),"0/0 files<listed/in-dir>, 6 blocks used, 274 unused, 274 in largest".to_string()]);
}

#[test]
fn put_and_get() {
    let mut disk = new_disk(280);
    assert_eq!(a2store::put_file(&mut disk,"hello.text",PROG1.as_bytes(),ItemType::Text,None).expect("put failed"),1);
    let content = disk.get("HELLO.TEXT").expect("get failed");
    assert_eq!(content.name,"HELLO.TEXT");
    assert_eq!(content.data,PROG1.as_bytes().to_vec());
    assert_eq!(content.file_type,0x04);
    let dat: Vec<u8> = (0..1300).map(|i| (i % 256) as u8).collect();
    assert_eq!(a2store::put_file(&mut disk,"DATA",&dat,ItemType::Binary,None).expect("put failed"),3);
    let cat = disk.catalog(false).expect("no catalog");
    assert_eq!(cat.len(),2);
    assert_eq!(cat[1].eof,Some(1300));
    assert_eq!(cat[1].type_name,"DATA");
    assert!(cat[1].native.starts_with("DATA               3 "));
    assert_eq!(a2store::get_file(&mut disk,"DATA").expect("get failed"),dat);
    assert_eq!(disk.stat().expect("no stat").free_blocks,270);
}

#[test]
fn duplicate_name() {
    let mut disk = new_disk(280);
    a2store::put_file(&mut disk,"FIRST",&[1,2,3],ItemType::Binary,None).expect("put failed");
    let err = a2store::put_file(&mut disk,"first",&[4],ItemType::Binary,None).expect_err("duplicate was allowed");
    assert_eq!(error_kind(&err),Some(Error::NameConflict));
    assert_eq!(a2store::get_file(&mut disk,"FIRST").expect("get failed"),vec![1,2,3]);
}

#[test]
fn contiguous_space() {
    let mut disk = new_disk(280);
    put_blocks(&mut disk,"A",100);
    put_blocks(&mut disk,"B",10);
    put_blocks(&mut disk,"C",100);
    a2store::delete_file(&mut disk,"B").expect("delete failed");
    let stat = disk.stat().expect("no stat");
    assert_eq!(stat.free_blocks,74);
    assert_eq!(stat.largest_free,64);
    // enough blocks in total, but not in one piece
    let before = disk.get_img().to_bytes();
    let err = a2store::put_file(&mut disk,"D",&vec![0;70*512],ItemType::Binary,None).expect_err("fragmented space was used");
    assert_eq!(error_kind(&err),Some(Error::DiskFull));
    assert_eq!(disk.get_img().to_bytes(),before);
    // the hole left by B is filled first
    put_blocks(&mut disk,"E",8);
    let cat = disk.catalog(false).expect("no catalog");
    let names: Vec<String> = cat.iter().map(|e| e.name.clone()).collect();
    assert_eq!(names,vec!["A","E","C"]);
    assert_eq!(cat[1].start,a2store::fs::Block::PO(106));
}

#[test]
fn delete_and_reuse() {
    let mut disk = new_disk(280);
    put_blocks(&mut disk,"SCRATCH",20);
    a2store::delete_file(&mut disk,"SCRATCH").expect("delete failed");
    assert_eq!(disk.stat().expect("no stat").free_blocks,274);
    assert!(disk.catalog(true).expect("no catalog").is_empty());
    put_blocks(&mut disk,"SCRATCH",20);
    assert_eq!(disk.stat().expect("no stat").file_count,1);
}

#[test]
fn no_locks() {
    let mut disk = new_disk(280);
    a2store::put_file(&mut disk,"FILE",&[0],ItemType::Binary,None).expect("put failed");
    let err = a2store::set_file_locked(&mut disk,"FILE",true).expect_err("pascal lock succeeded");
    assert_eq!(error_kind(&err),Some(Error::Unsupported));
    assert!(!disk.get("FILE").expect("get failed").is_locked());
    a2store::rename_file(&mut disk,"FILE","OTHER").expect("rename failed");
    a2store::delete_file(&mut disk,"OTHER").expect("delete failed");
}

#[test]
fn names_and_types() {
    let mut disk = new_disk(280);
    let err = a2store::put_file(&mut disk,"A:B",&[0],ItemType::Binary,None).expect_err("bad name accepted");
    assert_eq!(error_kind(&err),Some(Error::InvalidName));
    let err = a2store::put_file(&mut disk,"ABCDEFGHIJKLMNOP",&[0],ItemType::Binary,None).expect_err("long name accepted");
    assert_eq!(error_kind(&err),Some(Error::NameTooLong));
    let err = a2store::rename_volume(&mut disk,"TOOLONGV").expect_err("long volume name accepted");
    assert_eq!(error_kind(&err),Some(Error::NameTooLong));
    a2store::rename_volume(&mut disk,"work").expect("rename failed");
    assert_eq!(disk.stat().expect("no stat").label,"WORK");
    a2store::put_file(&mut disk,"PROG.CODE",&[0;600],ItemType::Code,None).expect("put failed");
    assert_eq!(disk.catalog(false).expect("no catalog")[0].type_name,"CODE");
    a2store::retype_file(&mut disk,"PROG.CODE",ItemType::Text).expect("retype failed");
    assert_eq!(disk.catalog(false).expect("no catalog")[0].type_name,"TEXT");
    let err = disk.get("MISSING").expect_err("found a missing file");
    assert_eq!(error_kind(&err),Some(Error::NotFound));
}

#[test]
fn directory_full() {
    let mut disk = new_disk(280);
    for i in 0..77 {
        a2store::put_file(&mut disk,&format!("F{}",i),&[i as u8],ItemType::Binary,None).expect("put failed");
    }
    let err = a2store::put_file(&mut disk,"MORE",&[0],ItemType::Binary,None).expect_err("directory overflowed");
    assert_eq!(error_kind(&err),Some(Error::DiskFull));
    assert_eq!(disk.stat().expect("no stat").file_count,77);
}

#[test]
fn file_image_eof() {
    let mut disk = new_disk(280);
    let dat: Vec<u8> = (0..1300).map(|i| (i % 256) as u8).collect();
    a2store::put_file(&mut disk,"DATA",&dat,ItemType::Binary,None).expect("put failed");
    let mut fimg = disk.read_any("DATA").expect("could not read file image");
    fimg.name = "COPY".to_string();
    // eof ends before the last chunk
    fimg.set_eof(512);
    let before = disk.get_img().to_bytes();
    let err = a2store::put_file_image_json(&mut disk,&fimg.to_json(None)).expect_err("short eof accepted");
    assert_eq!(error_kind(&err),Some(Error::FileFormat));
    assert_eq!(disk.get_img().to_bytes(),before);
    fimg.set_eof(1025);
    a2store::put_file_image_json(&mut disk,&fimg.to_json(None)).expect("put failed");
    assert_eq!(a2store::get_file(&mut disk,"COPY").expect("get failed"),dat[0..1025].to_vec());
}
