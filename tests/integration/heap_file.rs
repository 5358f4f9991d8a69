#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pagestore::{
    storage::PAGE_SIZE, FileOptions, HeapFile, IoStats, Record, RecordFile, Result, StoreError,
};
use tempfile::tempdir;

fn paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join("heap.dat"), dir.join("heap.pd"))
}

fn rec(key: i32) -> Record {
    Record::new(key, format!("HeapData{key}"))
}

#[test]
fn twenty_four_keys_fill_two_pages() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    let mut heap = HeapFile::open(&data, &pd)?;
    for key in 1..=24 {
        heap.insert(rec(key))?;
    }

    assert_eq!(heap.page_count(), 2);
    assert_eq!(
        heap.dump()?,
        "Page 0: 1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16\n\
         Page 1: 17,18,19,20,21,22,23,24,X,X,X,X,X,X,X,X"
    );
    assert_eq!(fs::metadata(&data)?.len(), 2 * PAGE_SIZE as u64);
    Ok(())
}

#[test]
fn search_miss_mutates_nothing() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    let mut heap = HeapFile::open(&data, &pd)?;
    for key in [3, 1, 2] {
        heap.insert(rec(key))?;
    }
    let data_before = fs::read(&data)?;
    let pd_before = fs::read(&pd)?;
    let writes_before = heap.stats().snapshot().writes();

    assert!(heap.search(42)?.is_none());
    assert!(!heap.delete(42)?);

    assert_eq!(fs::read(&data)?, data_before);
    assert_eq!(fs::read(&pd)?, pd_before);
    assert_eq!(heap.stats().snapshot().writes(), writes_before);
    Ok(())
}

#[test]
fn records_survive_reopen() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    {
        let mut heap = HeapFile::open(&data, &pd)?;
        for key in 0..20 {
            heap.insert(rec(key))?;
        }
        assert!(heap.delete(5)?);
    }

    let mut heap = HeapFile::open(&data, &pd)?;
    assert_eq!(heap.page_count(), 2);
    assert!(heap.search(5)?.is_none());
    assert_eq!(heap.search(19)?.map(|r| r.data().into_owned()), Some("HeapData19".into()));

    heap.insert(rec(100))?;
    assert!(heap.dump()?.starts_with("Page 0: 0,1,2,3,4,100,6"));
    Ok(())
}

#[test]
fn emptied_pages_stay_allocated() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    let mut heap = HeapFile::open(&data, &pd)?;
    for key in 0..17 {
        heap.insert(rec(key))?;
    }
    assert!(heap.delete(16)?);
    assert_eq!(heap.page_count(), 2);
    assert!(heap.dump()?.ends_with("Page 1: X,X,X,X,X,X,X,X,X,X,X,X,X,X,X,X"));
    assert_eq!(heap.range_search(i32::MIN, i32::MAX)?.len(), 16);
    Ok(())
}

#[test]
fn shared_stats_aggregate_across_files() -> Result<()> {
    let dir = tempdir()?;
    let stats = Arc::new(IoStats::new());
    let options = FileOptions::new().stats(Arc::clone(&stats));
    let mut a = HeapFile::open_with_options(
        dir.path().join("a.dat"),
        dir.path().join("a.pd"),
        options.clone(),
    )?;
    let mut b =
        HeapFile::open_with_options(dir.path().join("b.dat"), dir.path().join("b.pd"), options)?;

    a.insert(rec(1))?;
    b.insert(rec(2))?;
    let snap = stats.snapshot();
    assert_eq!(snap.page_writes, 2);
    assert_eq!(snap.directory_writes, 2);

    stats.reset();
    assert!(a.search(1)?.is_some());
    assert_eq!(stats.snapshot().page_reads, 1);
    Ok(())
}

#[test]
fn synced_writes_behave_the_same() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    let mut heap =
        HeapFile::open_with_options(&data, &pd, FileOptions::new().sync_writes(true))?;
    heap.insert(rec(7))?;
    assert_eq!(heap.search(7)?.map(|r| r.key()), Some(7));
    Ok(())
}

#[test]
fn corrupt_directory_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    {
        let mut heap = HeapFile::open(&data, &pd)?;
        heap.insert(rec(1))?;
    }
    let mut bytes = fs::read(&pd)?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&pd, bytes)?;

    let err = HeapFile::open(&data, &pd).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)), "got {err:?}");
    Ok(())
}

#[test]
fn missing_data_file_is_an_io_error() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    {
        let mut heap = HeapFile::open(&data, &pd)?;
        heap.insert(rec(1))?;
    }
    fs::remove_file(&data)?;

    let err = HeapFile::open(&data, &pd).unwrap_err();
    match err {
        StoreError::Io(inner) => assert_eq!(inner.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn truncated_data_file_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    {
        let mut heap = HeapFile::open(&data, &pd)?;
        for key in 0..17 {
            heap.insert(rec(key))?;
        }
    }
    let bytes = fs::read(&data)?;
    fs::write(&data, &bytes[..PAGE_SIZE])?;

    assert!(matches!(
        HeapFile::open(&data, &pd),
        Err(StoreError::Corrupt(_))
    ));
    Ok(())
}
