use filetime::{FileTime, set_file_mtime};
use robust_copy::{Classification, classify};
use std::fs;
use tempfile::tempdir;

#[test]
fn absent_destination_needs_copy() {
    let td = tempdir().unwrap();
    let src = td.path().join("a.bin");
    fs::write(&src, b"payload").unwrap();
    let got = classify(&src, &td.path().join("missing").join("a.bin")).unwrap();
    assert_eq!(got, Classification::NeedsCopy);
}

#[test]
fn same_size_and_mtime_is_a_match_even_when_content_differs() {
    let td = tempdir().unwrap();
    let src = td.path().join("src.txt");
    let dst = td.path().join("dst.txt");
    fs::write(&src, b"aaaa").unwrap();
    fs::write(&dst, b"bbbb").unwrap();
    let t = FileTime::from_unix_time(1_600_000_000, 0);
    set_file_mtime(&src, t).unwrap();
    set_file_mtime(&dst, t).unwrap();
    assert_eq!(classify(&src, &dst).unwrap(), Classification::Match);
}

#[test]
fn size_or_mtime_difference_is_a_mismatch() {
    let td = tempdir().unwrap();
    let src = td.path().join("src.txt");
    let dst = td.path().join("dst.txt");
    let t = FileTime::from_unix_time(1_600_000_000, 0);

    fs::write(&src, b"1234").unwrap();
    fs::write(&dst, b"12345").unwrap();
    set_file_mtime(&src, t).unwrap();
    set_file_mtime(&dst, t).unwrap();
    assert_eq!(classify(&src, &dst).unwrap(), Classification::Mismatch);

    fs::write(&dst, b"1234").unwrap();
    set_file_mtime(&dst, FileTime::from_unix_time(1_600_000_001, 0)).unwrap();
    assert_eq!(classify(&src, &dst).unwrap(), Classification::Mismatch);
}

#[test]
fn classification_is_stable_without_changes() {
    let td = tempdir().unwrap();
    let src = td.path().join("src.txt");
    let dst = td.path().join("dst.txt");
    fs::write(&src, b"x").unwrap();
    fs::write(&dst, b"yy").unwrap();
    let first = classify(&src, &dst).unwrap();
    for _ in 0..5 {
        assert_eq!(classify(&src, &dst).unwrap(), first);
    }
}
