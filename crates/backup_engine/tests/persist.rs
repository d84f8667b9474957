use std::fs;

use backup_engine::{ensure_output_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_download_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("downloads");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn commit_replaces_previous_archive() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let mut first = writer.begin("my_backup.tar.gz").unwrap();
    first.write_chunk(b"old").unwrap();
    let first = first.commit().unwrap();
    assert_eq!(first.file_name().unwrap(), "my_backup.tar.gz");

    let mut second = writer.begin("my_backup.tar.gz").unwrap();
    second.write_chunk(b"new ").unwrap();
    second.write_chunk(b"bytes").unwrap();
    assert_eq!(second.written(), 9);
    let second = second.commit().unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"new bytes");
}

#[test]
fn abandoned_write_leaves_no_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let mut pending = writer.begin("partial.tar.gz").unwrap();
    pending.write_chunk(b"half").unwrap();
    drop(pending);

    assert!(!temp.path().join("partial.tar.gz").exists());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn file_in_place_of_directory_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.begin("archive.tar.gz").is_err());
    assert!(!file_path.with_file_name("archive.tar.gz").exists());
}
