// test of the AppleSingle transfer container
use a2store::fs::fimg::applesingle;
use a2store::fs::{FileContent,ItemType,Error,error_kind,UNLOCKED_ACCESS};

/// version 1 container holding only a 3 byte data fork
fn minimal_v1() -> Vec<u8> {
    let mut ans = vec![0,5,0x16,0,0,1,0,0];
    ans.extend_from_slice(b"ProDOS          ");
    ans.extend_from_slice(&[0,1]);
    ans.extend_from_slice(&[0,0,0,1, 0,0,0,38, 0,0,0,3]);
    ans.extend_from_slice(&[7,8,9]);
    ans
}

#[test]
fn round_trip() {
    let mut content = FileContent::new("STARTUP",&[0x01,0x08,0x0a,0x00],ItemType::Applesoft,Some(0x801));
    content.access = 0x21;
    let dat = applesingle::encode(&content);
    assert!(applesingle::test(&dat));
    assert_eq!(applesingle::decode(&dat).expect("decode failed"),content);
    content.resource = Some(vec![1,2,3]);
    let dat = applesingle::encode(&content);
    assert_eq!(applesingle::decode(&dat).expect("decode failed"),content);
    content.name = String::new();
    let dat = applesingle::encode(&content);
    assert_eq!(applesingle::decode(&dat).expect("decode failed").name,"");
}

#[test]
fn defaults() {
    let dat = minimal_v1();
    assert!(applesingle::test(&dat));
    let content = applesingle::decode(&dat).expect("decode failed");
    assert_eq!(content.name,"UNTITLED");
    assert_eq!(content.data,vec![7,8,9]);
    assert_eq!(content.file_type,0x06);
    assert_eq!(content.aux_type,0);
    assert_eq!(content.access,UNLOCKED_ACCESS);
}

#[test]
fn malformed() {
    let good = minimal_v1();
    // truncated payload
    let err = applesingle::decode(&good[0..good.len()-1]).expect_err("truncated payload accepted");
    assert_eq!(error_kind(&err),Some(Error::MalformedContainer));
    // bad magic
    let mut bad = good.clone();
    bad[1] = 6;
    assert!(!applesingle::test(&bad));
    let err = applesingle::decode(&bad).expect_err("bad magic accepted");
    assert_eq!(error_kind(&err),Some(Error::MalformedContainer));
    // descriptor claims more entries than there are
    let mut bad = good.clone();
    bad[25] = 40;
    let err = applesingle::decode(&bad).expect_err("missing descriptors accepted");
    assert_eq!(error_kind(&err),Some(Error::MalformedContainer));
    // no data fork
    let mut bad = good.clone();
    bad[29] = 3;
    let err = applesingle::decode(&bad).expect_err("container without data accepted");
    assert_eq!(error_kind(&err),Some(Error::MalformedContainer));
    let err = applesingle::decode(&[0,5]).expect_err("short buffer accepted");
    assert_eq!(error_kind(&err),Some(Error::MalformedContainer));
}
