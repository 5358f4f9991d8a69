#![forbid(unsafe_code)]

//! Positioned block I/O against files that are opened per access.
//!
//! Nothing here keeps a handle alive between calls: each read or write opens
//! the file, transfers one block and closes it again.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, ErrorKind},
    path::Path,
};

use tracing::trace;

use crate::types::Result;

#[cfg(unix)]
/// Unix-specific positioned I/O using POSIX `pread`/`pwrite` semantics.
pub mod stdio_unix {
    use std::{
        fs::File,
        io::{self, ErrorKind},
        os::unix::fs::FileExt,
    };

    /// Reads exactly `dst.len()` bytes at `off`.
    pub fn read_exact(file: &File, mut off: u64, mut dst: &mut [u8]) -> io::Result<()> {
        while !dst.is_empty() {
            let read = file.read_at(dst, off)?;
            if read == 0 {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "read_at reached EOF",
                ));
            }
            let (_, tail) = dst.split_at_mut(read);
            dst = tail;
            off += read as u64;
        }
        Ok(())
    }

    /// Writes all of `src` at `off`.
    pub fn write_all(file: &File, mut off: u64, mut src: &[u8]) -> io::Result<()> {
        while !src.is_empty() {
            let written = file.write_at(src, off)?;
            if written == 0 {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "write_at wrote zero bytes",
                ));
            }
            src = &src[written..];
            off += written as u64;
        }
        Ok(())
    }
}

#[cfg(windows)]
/// Windows-specific positioned I/O using `seek_read`/`seek_write`.
pub mod stdio_win {
    use std::{
        fs::File,
        io::{self, ErrorKind},
        os::windows::fs::FileExt,
    };

    /// Reads exactly `dst.len()` bytes at `off`.
    pub fn read_exact(file: &File, mut off: u64, mut dst: &mut [u8]) -> io::Result<()> {
        while !dst.is_empty() {
            let read = file.seek_read(dst, off)?;
            if read == 0 {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "seek_read reached EOF",
                ));
            }
            let (_, tail) = dst.split_at_mut(read);
            dst = tail;
            off += read as u64;
        }
        Ok(())
    }

    /// Writes all of `src` at `off`.
    pub fn write_all(file: &File, mut off: u64, mut src: &[u8]) -> io::Result<()> {
        while !src.is_empty() {
            let written = file.seek_write(src, off)?;
            if written == 0 {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "seek_write wrote zero bytes",
                ));
            }
            src = &src[written..];
            off += written as u64;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn pread(file: &File, off: u64, dst: &mut [u8]) -> io::Result<()> {
    stdio_unix::read_exact(file, off, dst)
}

#[cfg(windows)]
fn pread(file: &File, off: u64, dst: &mut [u8]) -> io::Result<()> {
    stdio_win::read_exact(file, off, dst)
}

#[cfg(not(any(unix, windows)))]
fn pread(mut file: &File, off: u64, dst: &mut [u8]) -> io::Result<()> {
    use std::io::{Read, Seek, SeekFrom};
    file.seek(SeekFrom::Start(off))?;
    file.read_exact(dst)
}

#[cfg(unix)]
fn pwrite(file: &File, off: u64, src: &[u8]) -> io::Result<()> {
    stdio_unix::write_all(file, off, src)
}

#[cfg(windows)]
fn pwrite(file: &File, off: u64, src: &[u8]) -> io::Result<()> {
    stdio_win::write_all(file, off, src)
}

#[cfg(not(any(unix, windows)))]
fn pwrite(mut file: &File, off: u64, src: &[u8]) -> io::Result<()> {
    use std::io::{Seek, SeekFrom, Write};
    file.seek(SeekFrom::Start(off))?;
    file.write_all(src)
}

/// Opens `path` read-only and fills `dst` from byte offset `off`.
///
/// A missing file or a short read surfaces as [`crate::types::StoreError::Io`].
pub fn read_block(path: &Path, off: u64, dst: &mut [u8]) -> Result<()> {
    let file = File::open(path)?;
    pread(&file, off, dst)?;
    trace!(path = %path.display(), off, len = dst.len(), "io.read_block");
    Ok(())
}

/// Opens (creating if needed) `path` and writes `src` at byte offset `off`.
pub fn write_block(path: &Path, off: u64, src: &[u8], sync: bool) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    pwrite(&file, off, src)?;
    if sync {
        file.sync_data()?;
    }
    trace!(path = %path.display(), off, len = src.len(), sync, "io.write_block");
    Ok(())
}

/// Reads a whole file, or `None` when it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Replaces the contents of `path` with `bytes`.
pub fn replace_file(path: &Path, bytes: &[u8], sync: bool) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    pwrite(&file, 0, bytes)?;
    if sync {
        file.sync_all()?;
    }
    Ok(())
}

/// Returns the length of `path` in bytes, treating a missing file as empty.
pub fn file_len(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
        Err(err) => Err(err.into()),
    }
}
