#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use pagestore::{storage::HALF_FULL, Record, RecordFile, Result, SortedFile};
use tempfile::tempdir;

const SHUFFLED: [i32; 24] = [
    120, 40, 200, 90, 160, 230, 170, 240, 50, 130, 10, 220, 180, 60, 210, 70, 150, 80, 110, 30,
    190, 20, 100, 140,
];

fn paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join("sorted.dat"), dir.join("sorted.pd"))
}

fn rec(key: i32) -> Record {
    Record::new(key, format!("SortedData{key}"))
}

fn all_keys(file: &SortedFile) -> Result<Vec<i32>> {
    Ok(file
        .range_search(i32::MIN, i32::MAX)?
        .iter()
        .map(Record::key)
        .collect())
}

#[test]
fn shuffled_keys_answer_range_queries() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    let mut file = SortedFile::open(&data, &pd)?;
    for key in SHUFFLED {
        file.insert(rec(key))?;
    }

    let keys: Vec<i32> = file.range_search(40, 80)?.iter().map(Record::key).collect();
    assert_eq!(keys, vec![40, 50, 60, 70, 80]);

    let mut expected = SHUFFLED.to_vec();
    expected.sort_unstable();
    assert_eq!(all_keys(&file)?, expected);
    assert_eq!(file.search(230)?.map(|r| r.data().into_owned()), Some("SortedData230".into()));
    Ok(())
}

#[test]
fn delete_then_reinsert_keeps_pages_packed() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    let mut file = SortedFile::open(&data, &pd)?;
    for key in SHUFFLED {
        file.insert(rec(key))?;
    }
    for key in (20..=240).step_by(20) {
        assert!(file.delete(key)?);
    }
    for key in (20..=240).step_by(20) {
        file.insert(rec(key - 5))?;
    }

    let keys = all_keys(&file)?;
    assert_eq!(keys.len(), 24);
    assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));

    // Every page lists its used slots first.
    for line in file.dump()?.lines() {
        let (_, slots) = line.split_once(": ").unwrap_or_default();
        let cells: Vec<&str> = slots.split(',').collect();
        let used = cells.iter().take_while(|cell| **cell != "X").count();
        assert!(cells[used..].iter().all(|cell| *cell == "X"), "{line}");
    }
    Ok(())
}

#[test]
fn same_key_reinsert_after_rebalance() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    let mut file = SortedFile::open(&data, &pd)?;
    for key in 1..=24 {
        file.insert(rec(key))?;
    }
    for key in 1..=9 {
        assert!(file.delete(key)?);
    }
    let settled = file.dump()?;
    assert_eq!(
        settled,
        "Page 0: 10,11,12,13,14,15,16,17,X,X,X,X,X,X,X,X\n\
         Page 1: 18,19,20,21,22,23,24,X,X,X,X,X,X,X,X,X"
    );

    // 20 sits in page 1 slot 2; deleting and re-inserting it restores the layout.
    assert!(file.delete(20)?);
    assert_eq!(
        file.dump()?.lines().nth(1),
        Some("Page 1: 18,19,21,22,23,24,X,X,X,X,X,X,X,X,X,X")
    );
    file.insert(rec(20))?;
    assert_eq!(file.dump()?, settled);

    file.insert(rec(5))?;
    assert_eq!(
        file.dump()?.lines().next(),
        Some("Page 0: 5,10,11,12,13,14,15,16,17,X,X,X,X,X,X,X")
    );
    assert!(file.delete(5)?);
    assert_eq!(file.dump()?, settled);
    assert_eq!(file.search(20)?.map(|r| r.key()), Some(20));
    Ok(())
}

#[test]
fn pages_before_the_last_stay_half_full() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    let mut file = SortedFile::open(&data, &pd)?;
    for key in 0..64 {
        file.insert(rec(key))?;
    }
    for key in (0..64).filter(|key| key % 3 != 0) {
        assert!(file.delete(key)?);
    }

    let dump = file.dump()?;
    let counts: Vec<usize> = dump
        .lines()
        .map(|line| line.split(',').filter(|cell| !cell.ends_with('X')).count())
        .collect();
    let last_non_empty = counts.iter().rposition(|count| *count > 0).unwrap_or(0);
    for count in &counts[..last_non_empty] {
        assert!(*count >= HALF_FULL, "{dump}");
    }
    assert_eq!(all_keys(&file)?, (0..64).filter(|key| key % 3 == 0).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn absent_delete_leaves_files_identical() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    let mut file = SortedFile::open(&data, &pd)?;
    for key in SHUFFLED {
        file.insert(rec(key))?;
    }
    let data_before = fs::read(&data)?;
    let pd_before = fs::read(&pd)?;

    assert!(!file.delete(45)?);
    assert!(!file.delete(1_000)?);
    assert!(!file.delete(-1)?);

    assert_eq!(fs::read(&data)?, data_before);
    assert_eq!(fs::read(&pd)?, pd_before);
    Ok(())
}

#[test]
fn order_survives_reopen() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    {
        let mut file = SortedFile::open(&data, &pd)?;
        for key in (0..50).rev() {
            file.insert(rec(key))?;
        }
    }
    let mut file = SortedFile::open(&data, &pd)?;
    assert_eq!(file.stats().snapshot().directory_reads, 1);
    file.insert(rec(25))?;
    let keys = all_keys(&file)?;
    assert_eq!(keys.len(), 51);
    assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
    Ok(())
}

#[test]
fn search_stops_at_pages_past_the_key() -> Result<()> {
    let dir = tempdir()?;
    let (data, pd) = paths(dir.path());
    let mut file = SortedFile::open(&data, &pd)?;
    for key in 0..48 {
        file.insert(rec(key))?;
    }
    file.stats().reset();
    assert!(file.search(-5)?.is_none());
    assert_eq!(file.stats().snapshot().page_reads, 1);
    Ok(())
}
