#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests packing real directory trees into containers and
//! reading them back

use mpyq_crypto::{ContentDigest, CryptTable};
use mpyq_formats::archive::constants::HEADER_SIZE;
use mpyq_formats::archive::{ArchiveEntry, ArchiveError, ArchiveHeader, ArchiveReader, ArchiveWriter};
use pretty_assertions::assert_eq;
use std::fs;
use std::io::Cursor;
use std::path::Path;

fn write_file(root: &Path, name: &str, data: &[u8]) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Operation should succeed");
    }
    fs::write(path, data).expect("Operation should succeed");
}

fn pack(table: &CryptTable, source: &Path, output: &Path, names: &[&str]) -> ArchiveHeader {
    let mut writer = ArchiveWriter::new(source, output, table);
    for name in names {
        let entry = writer.stage(name).expect("Operation should succeed");
        writer.add(entry).expect("Operation should succeed");
    }
    writer.finalize().expect("Operation should succeed")
}

// --- Concrete two-file scenario ---

#[test]
fn pack_and_extract_two_files() {
    let table = CryptTable::new();
    let source = tempfile::tempdir().expect("Operation should succeed");
    let out = tempfile::tempdir().expect("Operation should succeed");
    write_file(source.path(), "a.txt", b"hello");
    write_file(source.path(), "sub/b.txt", b"world");

    let container = out.path().join("res.mpq");
    let header = pack(&table, source.path(), &container, &["a.txt", "sub/b.txt"]);

    let mut reader = ArchiveReader::open(&container, &table).expect("Operation should succeed");
    assert_eq!(reader.header(), &header);
    assert_eq!(header.entry_count, 2);

    let table_size: u64 = reader.entries().iter().map(ArchiveEntry::size).sum();
    assert_eq!(u64::from(header.data_offset), HEADER_SIZE as u64 + table_size);
    assert_eq!(
        u64::from(header.archive_size),
        fs::metadata(&container).expect("Operation should succeed").len()
    );

    let names: Vec<&str> = reader.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "sub/b.txt"]);

    let dest = tempfile::tempdir().expect("Operation should succeed");
    let report = reader.extract_all(dest.path());
    assert!(report.is_complete());
    assert_eq!(fs::read(dest.path().join("a.txt")).expect("Operation should succeed"), b"hello");
    assert_eq!(
        fs::read(dest.path().join("sub/b.txt")).expect("Operation should succeed"),
        b"world"
    );
}

// --- Deep trees and binary content ---

#[test]
fn round_trip_nested_tree() {
    let table = CryptTable::new();
    let source = tempfile::tempdir().expect("Operation should succeed");
    let out = tempfile::tempdir().expect("Operation should succeed");

    let big: Vec<u8> = (0..300_000u32).map(|i| (i.wrapping_mul(31) % 256) as u8).collect();
    let files: Vec<(&str, Vec<u8>)> = vec![
        ("root.bin", vec![0, 1, 2, 255]),
        ("empty.dat", Vec::new()),
        ("a/b/c/d/deep.txt", b"deep".to_vec()),
        ("textures/large.raw", big),
        ("scripts/main.lua", b"print('hi')\n".to_vec()),
    ];
    for (name, data) in &files {
        write_file(source.path(), name, data);
    }

    let names: Vec<&str> = files.iter().map(|(n, _)| *n).collect();
    let container = out.path().join("tree.mpq");
    pack(&table, source.path(), &container, &names);

    let mut reader = ArchiveReader::open(&container, &table).expect("Operation should succeed");
    for (name, data) in &files {
        let entry = reader.find(name).expect("entry should exist").clone();
        assert_eq!(entry.digest, ContentDigest::from_data(data).to_hex());
        assert_eq!(&reader.read_bytes(name).expect("Operation should succeed"), data);
    }

    let dest = tempfile::tempdir().expect("Operation should succeed");
    assert!(reader.extract_all(dest.path()).is_complete());
    for (name, data) in &files {
        assert_eq!(&fs::read(dest.path().join(name)).expect("Operation should succeed"), data);
    }
}

#[test]
fn sequence_indices_follow_staging() {
    let table = CryptTable::new();
    let source = tempfile::tempdir().expect("Operation should succeed");
    write_file(source.path(), "one", b"1");
    write_file(source.path(), "two", b"22");
    write_file(source.path(), "three", b"333");

    let mut writer = ArchiveWriter::new(source.path(), source.path().join("unused.mpq"), &table);
    let one = writer.stage("one").expect("Operation should succeed");
    let _skipped = writer.stage("two").expect("Operation should succeed");
    let three = writer.stage("three").expect("Operation should succeed");
    writer.add(one).expect("Operation should succeed");
    writer.add(three).expect("Operation should succeed");

    let mut buffer = Cursor::new(Vec::new());
    writer.finalize_to(&mut buffer).expect("Operation should succeed");

    let mut reader =
        ArchiveReader::new(Cursor::new(buffer.into_inner()), &table).expect("Operation should succeed");
    let indices: Vec<u32> = reader.entries().iter().map(|e| e.sequence_index).collect();
    assert_eq!(indices, vec![1, 3]);
    assert_eq!(reader.read_bytes("three").expect("Operation should succeed"), b"333");
}

// --- Corruption ---

#[test]
fn truncated_entry_table_is_rejected() {
    let table = CryptTable::new();
    let source = tempfile::tempdir().expect("Operation should succeed");
    write_file(source.path(), "a.txt", b"hello");
    write_file(source.path(), "sub/b.txt", b"world");

    let container = source.path().join("res.mpq");
    let header = pack(&table, source.path(), &container, &["a.txt", "sub/b.txt"]);

    let bytes = fs::read(&container).expect("Operation should succeed");
    let truncated = bytes[..header.data_offset as usize - 1].to_vec();

    match ArchiveReader::new(Cursor::new(truncated), &table) {
        Err(ArchiveError::TruncatedRecord { record }) => assert_eq!(record, "entry"),
        Err(other) => panic!("expected TruncatedRecord, got {other}"),
        Ok(_) => panic!("truncated container should not open"),
    }
}

#[test]
fn foreign_file_is_rejected() {
    let table = CryptTable::new();
    let mut bytes = vec![0u8; 64];
    bytes[..4].copy_from_slice(b"PK\x03\x04");

    let err = ArchiveReader::new(Cursor::new(bytes), &table)
        .err()
        .expect("foreign file should not open");
    assert!(matches!(err, ArchiveError::InvalidMagic(_)));
    assert!(err.is_structural());
}
