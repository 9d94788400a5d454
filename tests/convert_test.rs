// test of volume conversion
use a2store::fs::{DiskFS,ItemType,FsKind,Error,error_kind};
use a2store::img::DiskKind;

fn dos_source() -> Box<dyn DiskFS> {
    let mut disk = a2store::create_image(FsKind::Dos33,DiskKind::A2_525_16,"").expect("could not create");
    a2store::put_file(&mut disk,"HELLO",&[0xa9,0xc1,0x60],ItemType::Binary,Some(0x300)).expect("put failed");
    a2store::put_file(&mut disk,"STARTUP",&[0x01,0x08,0x0a,0x00,0xba,0x00],ItemType::Applesoft,None).expect("put failed");
    a2store::put_file(&mut disk,"NOTES",b"\xc8\xc9\x8d",ItemType::Text,None).expect("put failed");
    a2store::put_file(&mut disk,"GONE",&[0],ItemType::Binary,None).expect("put failed");
    a2store::delete_file(&mut disk,"GONE").expect("delete failed");
    disk
}

#[test]
fn dos_to_prodos() {
    let mut src = dos_source();
    let mut dest = a2store::convert(&mut src,FsKind::ProDOS,280,"FROM.DOS").expect("conversion failed");
    let stat = dest.stat().expect("no stat");
    assert_eq!(stat.fs_name,a2store::fs::PRODOS);
    assert_eq!(stat.label,"FROM.DOS");
    assert_eq!(stat.file_count,3);
    for name in ["HELLO","STARTUP","NOTES"] {
        assert_eq!(dest.get(name).expect("get failed").data,src.get(name).expect("get failed").data);
    }
    let hello = dest.get("HELLO").expect("get failed");
    assert_eq!(hello.aux_type,0x300);
    assert_eq!(hello.file_type,0x06);
    assert_eq!(dest.get("STARTUP").expect("get failed").file_type,0xfc);
    assert!(dest.get("GONE").is_err());
}

#[test]
fn prodos_to_pascal_to_dos() {
    let mut pro = a2store::create_image(FsKind::ProDOS,DiskKind::A2_525_16,"SOURCE").expect("could not create");
    let dat: Vec<u8> = (0..5000).map(|i| (i % 200) as u8).collect();
    a2store::put_file(&mut pro,"DATA.BIN",&dat,ItemType::Binary,None).expect("put failed");
    a2store::put_file(&mut pro,"READ.ME",b"HI",ItemType::Text,None).expect("put failed");
    let mut pas = a2store::convert(&mut pro,FsKind::Pascal,280,"MOVED").expect("conversion failed");
    assert_eq!(pas.stat().expect("no stat").fs_name,a2store::fs::A2_PASCAL);
    assert_eq!(a2store::get_file(&mut pas,"DATA.BIN").expect("get failed"),dat);
    assert_eq!(pas.get("READ.ME").expect("get failed").file_type,0x04);
    let mut dos = a2store::convert(&mut pas,FsKind::Dos33,800,"").expect("conversion failed");
    let stat = dos.stat().expect("no stat");
    assert_eq!(stat.fs_name,a2store::fs::A2_DOS);
    assert_eq!(stat.total_blocks,50*32);
    assert_eq!(a2store::get_file(&mut dos,"DATA.BIN").expect("get failed"),dat);
    assert_eq!(a2store::get_file(&mut dos,"READ.ME").expect("get failed"),b"HI".to_vec());
}

#[test]
fn too_small() {
    let mut pro = a2store::create_image(FsKind::ProDOS,DiskKind::A2_525_16,"FULL").expect("could not create");
    for name in ["ONE","TWO","THREE"] {
        a2store::put_file(&mut pro,name,&vec![0x11;45000],ItemType::Binary,Some(0x4000)).expect("put failed");
    }
    // fits on ProDOS, but the DOS headers and track/sector lists push it over
    let err = a2store::convert(&mut pro,FsKind::Dos33,280,"").err().expect("conversion should fail");
    assert_eq!(error_kind(&err),Some(Error::SizeTooSmall));
    // the source is not disturbed
    assert_eq!(pro.stat().expect("no stat").file_count,3);
    a2store::convert(&mut pro,FsKind::Dos33,800,"").expect("large DOS volume should hold it");
}

#[test]
fn incompatible() {
    let mut src = dos_source();
    let err = a2store::convert(&mut src,FsKind::Dos33,500,"").err().expect("odd DOS size accepted");
    assert_eq!(error_kind(&err),Some(Error::IncompatibleFormat));
    let err = a2store::convert(&mut src,FsKind::ProDOS,100,"SMALL").err().expect("tiny volume accepted");
    assert_eq!(error_kind(&err),Some(Error::IncompatibleFormat));
    let err = a2store::convert(&mut src,FsKind::ProDOS,280,"1BAD").err().expect("bad volume name accepted");
    assert_eq!(error_kind(&err),Some(Error::IncompatibleFormat));
    a2store::put_file(&mut src,"MY FILE",&[0],ItemType::Binary,None).expect("put failed");
    let err = a2store::convert(&mut src,FsKind::ProDOS,280,"DEST").err().expect("name with space accepted");
    assert_eq!(error_kind(&err),Some(Error::IncompatibleFormat));
    let err = a2store::convert(&mut src,FsKind::Pascal,280,"DEST").err().expect("name with space accepted");
    assert_eq!(error_kind(&err),Some(Error::IncompatibleFormat));
}

#[test]
fn text_with_null() {
    let mut pro = a2store::create_image(FsKind::ProDOS,DiskKind::A2_525_16,"NULLS").expect("could not create");
    a2store::put_file(&mut pro,"RECORDS",&[0xc1,0x00,0xc2],ItemType::Text,None).expect("put failed");
    // DOS ends text at the first null
    let err = a2store::convert(&mut pro,FsKind::Dos33,280,"").err().expect("conversion should fail");
    assert_eq!(error_kind(&err),Some(Error::IncompatibleFormat));
    let mut pas = a2store::convert(&mut pro,FsKind::Pascal,280,"NULLS").expect("conversion failed");
    assert_eq!(a2store::get_file(&mut pas,"RECORDS").expect("get failed"),vec![0xc1,0x00,0xc2]);
}

#[test]
fn convert_file() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let src_path = dir.path().join("source.do");
    let good_path = dir.path().join("dest.po");
    let bad_path = dir.path().join("never.po");
    let mut src = dos_source();
    a2store::save_img(&mut src,src_path.to_str().unwrap()).expect("save failed");
    a2store::convert_file(src_path.to_str().unwrap(),good_path.to_str().unwrap(),FsKind::ProDOS,280).expect("conversion failed");
    let mut dest = a2store::create_fs_from_file(good_path.to_str().unwrap()).expect("could not open result");
    let stat = dest.stat().expect("no stat");
    assert_eq!(stat.fs_name,a2store::fs::PRODOS);
    // the DOS volume number is not a ProDOS name
    assert_eq!(stat.label,"NEW.DISK");
    assert_eq!(a2store::get_file(&mut dest,"HELLO").expect("get failed"),vec![0xa9,0xc1,0x60]);
    let err = a2store::convert_file(src_path.to_str().unwrap(),bad_path.to_str().unwrap(),FsKind::ProDOS,10).expect_err("conversion should fail");
    assert_eq!(error_kind(&err),Some(Error::IncompatibleFormat));
    assert!(!bad_path.exists());
}

#[test]
fn convert_file_to_2mg() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let src_path = dir.path().join("source.do");
    let dest_path = dir.path().join("dest.2mg");
    let mut src = dos_source();
    a2store::save_img(&mut src,src_path.to_str().unwrap()).expect("save failed");
    a2store::convert_file(src_path.to_str().unwrap(),dest_path.to_str().unwrap(),FsKind::ProDOS,280).expect("conversion failed");
    let bytes = std::fs::read(&dest_path).expect("image not written");
    assert_eq!(bytes.len(),64+143360);
    assert_eq!(&bytes[0..4],b"2IMG");
    // ProDOS ordered
    assert_eq!(&bytes[12..16],&[1,0,0,0]);
    let mut dest = a2store::create_fs_from_file(dest_path.to_str().unwrap()).expect("could not open result");
    assert_eq!(dest.get_img().what_am_i(),a2store::img::DiskImageType::DOT2MG);
    assert_eq!(dest.stat().expect("no stat").file_count,3);
    assert_eq!(a2store::get_file(&mut dest,"HELLO").expect("get failed"),vec![0xa9,0xc1,0x60]);
}
