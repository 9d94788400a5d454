// test of prodos disk image module
use a2store::fs::{DiskFS,DisplayMode,FileContent,ItemType,FsKind,Error,error_kind,LOCKED_ACCESS};
use a2store::fs::prodos;
use a2store::img::DiskKind;

fn new_disk(blocks: usize) -> Box<dyn DiskFS> {
    a2store::create_image(FsKind::ProDOS,DiskKind::from_blocks(blocks),"new.disk").expect("could not create ProDOS volume")
}

#[test]
fn format() {
    for (blocks,free) in [(280,273),(1600,1593),(65535,65535-6-16)] {
        let mut disk = new_disk(blocks);
        let stat = disk.stat().expect("no stat");
        assert_eq!(stat.label,"NEW.DISK");
        assert_eq!(stat.total_blocks,blocks);
        assert_eq!(stat.free_blocks,free);
        assert!(disk.catalog(true).expect("no catalog").is_empty());
        assert_eq!(prodos::capacity(blocks).0,free);
    }
}

#[test]
fn put_and_get() {
    let mut disk = new_disk(280);
    let prog: Vec<u8> = (0..1000).map(|i| (i % 251) as u8).collect();
    // sapling: 2 data blocks and the index
    assert_eq!(a2store::put_file(&mut disk,"hello",&prog,ItemType::Binary,Some(0x2000)).expect("put failed"),3);
    let content = disk.get("HELLO").expect("get failed");
    assert_eq!(content.name,"HELLO");
    assert_eq!(content.data,prog);
    assert_eq!(content.aux_type,0x2000);
    assert_eq!(content.file_type,0x06);
    assert_eq!(disk.stat().expect("no stat").free_blocks,270);
    // seedling with no data
    assert_eq!(a2store::put_file(&mut disk,"EMPTY",&[],ItemType::Text,None).expect("put failed"),1);
    assert_eq!(a2store::get_file(&mut disk,"EMPTY").expect("get failed").len(),0);
}

#[test]
fn tree_file() {
    let mut disk = new_disk(800);
    let dat: Vec<u8> = (0..257*512+10).map(|i| (i % 253) as u8).collect();
    let content = FileContent::new("BIG.FILE",&dat,ItemType::Binary,Some(0));
    let expected = prodos::footprint(&content).expect("no footprint");
    let free = disk.stat().expect("no stat").free_blocks;
    assert_eq!(disk.put(&content).expect("put failed"),expected);
    assert_eq!(disk.stat().expect("no stat").free_blocks,free - expected);
    assert_eq!(disk.get("BIG.FILE").expect("get failed").data,dat);
    disk.delete("BIG.FILE").expect("delete failed");
    assert_eq!(disk.stat().expect("no stat").free_blocks,free);
}

#[test]
fn native_catalog() {
    let mut disk = new_disk(280);
    a2store::put_file(&mut disk,"HELLO",&[0;10],ItemType::Binary,Some(0x300)).expect("put failed");
    let lines = a2store::list_directory(&mut disk,DisplayMode::Native).expect("no listing");
    assert_eq!(lines.len(),3);
    assert_eq!(lines[0],"/NEW.DISK");
    assert!(lines[1].starts_with(" HELLO           BIN       1"));
    assert!(lines[1].ends_with("$0300"));
    assert_eq!(lines[2],"BLOCKS FREE:   272     BLOCKS USED:     8     TOTAL BLOCKS:   280");
    let names = a2store::list_directory(&mut disk,DisplayMode::Standard).expect("no listing");
    assert_eq!(names,vec!["HELLO".to_string()]);
}

#[test]
fn duplicate_and_full() {
    let mut disk = new_disk(280);
    a2store::put_file(&mut disk,"A",&[1],ItemType::Binary,None).expect("put failed");
    let err = a2store::put_file(&mut disk,"a",&[2],ItemType::Binary,None).expect_err("duplicate was allowed");
    assert_eq!(error_kind(&err),Some(Error::NameConflict));
    assert_eq!(a2store::get_file(&mut disk,"A").expect("get failed"),vec![1]);
    let before = disk.get_img().to_bytes();
    let err = a2store::put_file(&mut disk,"HUGE",&vec![0;300*512],ItemType::Binary,None).expect_err("oversize file was accepted");
    assert_eq!(error_kind(&err),Some(Error::DiskFull));
    assert_eq!(disk.get_img().to_bytes(),before);
}

#[test]
fn directory_full() {
    let mut disk = new_disk(280);
    for i in 0..51 {
        a2store::put_file(&mut disk,&format!("F{}",i),&[i as u8],ItemType::Binary,None).expect("put failed");
    }
    let err = a2store::put_file(&mut disk,"ONE.MORE",&[0],ItemType::Binary,None).expect_err("directory overflowed");
    assert_eq!(error_kind(&err),Some(Error::DiskFull));
    assert_eq!(disk.stat().expect("no stat").file_count,51);
    // a freed slot is reused
    a2store::delete_file(&mut disk,"F20").expect("delete failed");
    a2store::put_file(&mut disk,"ONE.MORE",&[0],ItemType::Binary,None).expect("put after delete failed");
    assert_eq!(disk.catalog(false).expect("no catalog")[20].name,"ONE.MORE");
}

#[test]
fn locked_files() {
    let mut disk = new_disk(280);
    a2store::put_file(&mut disk,"KEEP",&[1,2],ItemType::Text,None).expect("put failed");
    a2store::set_file_locked(&mut disk,"KEEP",true).expect("lock failed");
    assert_eq!(disk.get("KEEP").expect("get failed").access,LOCKED_ACCESS);
    let err = a2store::delete_file(&mut disk,"KEEP").expect_err("deleted a locked file");
    assert_eq!(error_kind(&err),Some(Error::FileLocked));
    let err = a2store::rename_file(&mut disk,"KEEP","OTHER").expect_err("renamed a locked file");
    assert_eq!(error_kind(&err),Some(Error::FileLocked));
    assert!(disk.catalog(false).expect("no catalog")[0].locked);
    a2store::set_file_locked(&mut disk,"KEEP",false).expect("unlock failed");
    a2store::rename_file(&mut disk,"KEEP","OTHER").expect("rename failed");
    a2store::delete_file(&mut disk,"OTHER").expect("delete failed");
    assert_eq!(disk.stat().expect("no stat").free_blocks,273);
}

#[test]
fn names_and_types() {
    let mut disk = new_disk(280);
    let err = a2store::put_file(&mut disk,"BAD NAME",&[0],ItemType::Binary,None).expect_err("bad name accepted");
    assert_eq!(error_kind(&err),Some(Error::InvalidName));
    let err = a2store::put_file(&mut disk,"SIXTEEN.LETTERSX",&[0],ItemType::Binary,None).expect_err("long name accepted");
    assert_eq!(error_kind(&err),Some(Error::NameTooLong));
    a2store::put_file(&mut disk,"STARTUP",&[0x01,0x08],ItemType::Applesoft,Some(0x801)).expect("put failed");
    a2store::retype_file(&mut disk,"STARTUP",ItemType::System).expect("retype failed");
    assert_eq!(disk.catalog(false).expect("no catalog")[0].type_name,"SYS");
    a2store::rename_volume(&mut disk,"other").expect("rename failed");
    assert_eq!(disk.stat().expect("no stat").label,"OTHER");
}

#[test]
fn sparse_file_image() {
    let mut disk = new_disk(280);
    let mut fimg = disk.new_fimg();
    fimg.name = "SPARSE".to_string();
    fimg.fs_type = vec![0x06];
    fimg.aux = vec![0,0];
    fimg.access = vec![0xc3];
    fimg.chunks.insert(0,vec![1;512]);
    fimg.chunks.insert(5,vec![2;512]);
    fimg.set_eof(6*512);
    // two data blocks and the index block
    assert_eq!(disk.write_any(&fimg).expect("write failed"),3);
    let back = disk.read_any("SPARSE").expect("read failed");
    assert_eq!(back.ordered_indices(),vec![0,5]);
    assert_eq!(back.get_eof(),6*512);
    let content = disk.get("SPARSE").expect("get failed");
    assert_eq!(content.data.len(),6*512);
    assert_eq!(content.data[2*512],0);
}

#[test]
fn damaged_tree_delete() {
    use a2store::fs::Block;
    let mut disk = new_disk(800);
    let dat: Vec<u8> = (0..257*512+10).map(|i| (i % 253) as u8).collect();
    a2store::put_file(&mut disk,"BIG.FILE",&dat,ItemType::Binary,None).expect("put failed");
    let master_ptr = match disk.catalog(false).expect("no catalog")[0].start {
        Block::PO(b) => b,
        _ => panic!("unexpected block type")
    };
    // point the second index block past the end of the volume
    let master = disk.get_img().read_block(Block::PO(master_ptr)).expect("read failed");
    let index_ptr = u16::from_le_bytes([master[1],master[257]]) as usize;
    let mut index = disk.get_img().read_block(Block::PO(index_ptr)).expect("read failed");
    index[1] = 0xff;
    index[257] = 0xff;
    disk.get_img().write_block(Block::PO(index_ptr),&index).expect("write failed");
    let before = disk.get_img().to_bytes();
    let free = disk.stat().expect("no stat").free_blocks;
    let err = a2store::delete_file(&mut disk,"BIG.FILE").expect_err("damaged file was deleted");
    assert_eq!(error_kind(&err),Some(Error::BoundsError));
    assert_eq!(disk.get_img().to_bytes(),before);
    assert_eq!(disk.stat().expect("no stat").free_blocks,free);
    assert_eq!(disk.stat().expect("no stat").file_count,1);
}
