// test of dos3x disk image module
use a2store::fs::{DiskFS,DisplayMode,ItemType,FsKind,Error,error_kind};
use a2store::img::DiskKind;

fn new_disk(kind: DiskKind) -> Box<dyn DiskFS> {
    a2store::create_image(FsKind::Dos33,kind,"").expect("could not create DOS volume")
}

#[test]
fn format() {
    let mut disk = new_disk(DiskKind::A2_525_16);
    let stat = disk.stat().expect("no stat");
    assert_eq!(stat.label,"254");
    assert_eq!(stat.total_blocks,560);
    assert_eq!(stat.free_blocks,528);
    assert_eq!(stat.file_count,0);
    assert!(disk.catalog(true).expect("no catalog").is_empty());
    let mut big = new_disk(DiskKind::A2_DOS_400);
    assert_eq!(big.stat().expect("no stat").free_blocks,48*32);
}

#[test]
fn put_and_get() {
    let mut disk = new_disk(DiskKind::A2_525_16);
    let code = vec![0xa9,0xc1,0x20,0xed,0xfd,0x60];
    assert_eq!(a2store::put_file(&mut disk,"HELLO",&code,ItemType::Binary,Some(0x300)).expect("put failed"),2);
    a2store::put_file(&mut disk,"NOTES",b"\xc8\xc9\x8d",ItemType::Text,None).expect("put failed");
    let content = disk.get("hello").expect("get failed");
    assert_eq!(content.data,code);
    assert_eq!(content.aux_type,0x300);
    assert_eq!(content.file_type,0x06);
    assert_eq!(a2store::get_file(&mut disk,"NOTES").expect("get failed"),b"\xc8\xc9\x8d".to_vec());
    assert_eq!(disk.stat().expect("no stat").free_blocks,524);
}

#[test]
fn native_catalog() {
    let mut disk = new_disk(DiskKind::A2_525_16);
    a2store::put_file(&mut disk,"HELLO",&[0;10],ItemType::Binary,Some(0x800)).expect("put failed");
    disk.lock("HELLO").expect("lock failed");
    let lines = a2store::list_directory(&mut disk,DisplayMode::Native).expect("no listing");
    assert_eq!(lines,vec!["DISK VOLUME 254".to_string(),"*B 002 HELLO".to_string()]);
}

#[test]
fn duplicate_name() {
    let mut disk = new_disk(DiskKind::A2_525_16);
    a2store::put_file(&mut disk,"HELLO",&[1,2,3],ItemType::Binary,Some(0x300)).expect("put failed");
    let err = a2store::put_file(&mut disk,"HELLO",&[4,5,6,7],ItemType::Binary,Some(0x300)).expect_err("duplicate was allowed");
    assert_eq!(error_kind(&err),Some(Error::NameConflict));
    assert_eq!(a2store::get_file(&mut disk,"HELLO").expect("get failed"),vec![1,2,3]);
}

#[test]
fn disk_full() {
    let mut disk = new_disk(DiskKind::A2_525_16);
    a2store::put_file(&mut disk,"SMALL",&[0xc1;100],ItemType::Text,None).expect("put failed");
    let before = disk.get_img().to_bytes();
    let err = a2store::put_file(&mut disk,"HUGE",&vec![0xc1;140000],ItemType::Text,None).expect_err("oversize file was accepted");
    assert_eq!(error_kind(&err),Some(Error::DiskFull));
    assert_eq!(disk.get_img().to_bytes(),before);
    assert_eq!(disk.stat().expect("no stat").free_blocks,526);
}

#[test]
fn delete_and_reuse() {
    let mut disk = new_disk(DiskKind::A2_525_16);
    a2store::put_file(&mut disk,"DATA",&vec![0x55;2000],ItemType::Binary,Some(0x2000)).expect("put failed");
    a2store::delete_file(&mut disk,"DATA").expect("delete failed");
    assert_eq!(disk.stat().expect("no stat").free_blocks,528);
    // the deleted entry is still visible on request
    let cat = disk.catalog(true).expect("no catalog");
    assert_eq!(cat.len(),1);
    assert!(cat[0].deleted);
    assert!(disk.catalog(false).expect("no catalog").is_empty());
    a2store::put_file(&mut disk,"DATA",&[1],ItemType::Binary,Some(0x2000)).expect("put after delete failed");
    assert_eq!(a2store::get_file(&mut disk,"DATA").expect("get failed"),vec![1]);
}

#[test]
fn locked_files() {
    let mut disk = new_disk(DiskKind::A2_525_16);
    a2store::put_file(&mut disk,"KEEP",&[1,2],ItemType::Binary,Some(0x300)).expect("put failed");
    a2store::set_file_locked(&mut disk,"KEEP",true).expect("lock failed");
    let err = a2store::delete_file(&mut disk,"KEEP").expect_err("deleted a locked file");
    assert_eq!(error_kind(&err),Some(Error::FileLocked));
    let err = a2store::rename_file(&mut disk,"KEEP","OTHER").expect_err("renamed a locked file");
    assert_eq!(error_kind(&err),Some(Error::FileLocked));
    assert!(disk.get("KEEP").expect("get failed").is_locked());
    a2store::set_file_locked(&mut disk,"KEEP",false).expect("unlock failed");
    a2store::rename_file(&mut disk,"KEEP","OTHER").expect("rename failed");
    a2store::delete_file(&mut disk,"OTHER").expect("delete failed");
}

#[test]
fn volume_and_types() {
    let mut disk = new_disk(DiskKind::A2_525_16);
    a2store::rename_volume(&mut disk,"17").expect("could not set volume");
    assert_eq!(disk.stat().expect("no stat").label,"17");
    let err = a2store::rename_volume(&mut disk,"FRED").expect_err("volume must be a number");
    assert_eq!(error_kind(&err),Some(Error::InvalidName));
    a2store::put_file(&mut disk,"PROG",&[0xba,0x20],ItemType::Applesoft,None).expect("put failed");
    a2store::retype_file(&mut disk,"PROG",ItemType::Integer).expect("retype failed");
    let cat = disk.catalog(false).expect("no catalog");
    assert_eq!(cat[0].type_name,"I");
    let err = disk.get("NOTHERE").expect_err("found a missing file");
    assert_eq!(error_kind(&err),Some(Error::NotFound));
    let err = a2store::put_file(&mut disk,"1BAD",&[0],ItemType::Binary,None).expect_err("bad name accepted");
    assert_eq!(error_kind(&err),Some(Error::InvalidName));
}

#[test]
fn file_image_json() {
    let mut disk = new_disk(DiskKind::A2_525_16);
    a2store::put_file(&mut disk,"HELLO",&[1,2,3,4],ItemType::Binary,Some(0x300)).expect("put failed");
    let json = a2store::get_file_image_json(&mut disk,"HELLO").expect("no json");
    let mut other = new_disk(DiskKind::A2_525_16);
    a2store::put_file_image_json(&mut other,&json).expect("could not restore");
    assert_eq!(other.get("HELLO").expect("get failed"),disk.get("HELLO").expect("get failed"));
    // file images do not cross file systems
    let mut pro = a2store::create_image(FsKind::ProDOS,DiskKind::A2_525_16,"NEW.DISK").expect("could not create");
    let err = a2store::put_file_image_json(&mut pro,&json).expect_err("DOS image accepted by ProDOS");
    assert_eq!(error_kind(&err),Some(Error::FileImageFormat));
}

#[test]
fn text_with_null() {
    let mut disk = new_disk(DiskKind::A2_525_16);
    let before = disk.get_img().to_bytes();
    let err = a2store::put_file(&mut disk,"T",&[0xc1,0xc2,0x00,0xc3,0xc4],ItemType::Text,None).expect_err("null in text accepted");
    assert_eq!(error_kind(&err),Some(Error::IncompatibleFormat));
    assert_eq!(disk.get_img().to_bytes(),before);
    // as binary the same bytes survive
    a2store::put_file(&mut disk,"T",&[0xc1,0xc2,0x00,0xc3,0xc4],ItemType::Binary,None).expect("put failed");
    assert_eq!(a2store::get_file(&mut disk,"T").expect("get failed"),vec![0xc1,0xc2,0x00,0xc3,0xc4]);
}
