//! Random-access byte sources the engine reads from.
//!
//! Probing re-reads header regions and looping re-reads payload, so sources
//! must support reads at arbitrary offsets rather than a one-way stream. The
//! engine assumes the bytes do not change while a stream is open.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// An immutable, randomly readable range of bytes.
pub trait ByteSource {
    /// Fills `buf` with the bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the range cannot be read in full, including reads
    /// that run past [`size`](ByteSource::size).
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Total length in bytes.
    fn size(&self) -> u64;

    /// Identifier used in diagnostics, usually a path.
    fn name(&self) -> &str;

    /// Reads `len` bytes starting at `offset` into a new buffer.
    fn read(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_at(offset, buf)
    }

    #[inline]
    fn size(&self) -> u64 {
        (**self).size()
    }

    #[inline]
    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_at(offset, buf)
    }

    #[inline]
    fn size(&self) -> u64 {
        (**self).size()
    }

    #[inline]
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Typed reads on top of [`ByteSource`], used by header parsers.
pub trait ByteSourceExt: ByteSource {
    /// Reads one byte.
    fn read_u8(&mut self, offset: u64) -> Result<u8> {
        let mut buf = [0; 1];
        self.read_at(offset, &mut buf)?;
        Ok(buf[0])
    }

    /// Reads a big-endian `u16`.
    fn read_u16_be(&mut self, offset: u64) -> Result<u16> {
        let mut buf = [0; 2];
        self.read_at(offset, &mut buf)?;
        Ok(BigEndian::read_u16(&buf))
    }

    /// Reads a big-endian `u32`.
    fn read_u32_be(&mut self, offset: u64) -> Result<u32> {
        let mut buf = [0; 4];
        self.read_at(offset, &mut buf)?;
        Ok(BigEndian::read_u32(&buf))
    }

    /// Reads a little-endian `u16`.
    fn read_u16_le(&mut self, offset: u64) -> Result<u16> {
        let mut buf = [0; 2];
        self.read_at(offset, &mut buf)?;
        Ok(LittleEndian::read_u16(&buf))
    }

    /// Reads a little-endian `u32`.
    fn read_u32_le(&mut self, offset: u64) -> Result<u32> {
        let mut buf = [0; 4];
        self.read_at(offset, &mut buf)?;
        Ok(LittleEndian::read_u32(&buf))
    }

    /// Returns true if the bytes at `offset` equal `id`. Short sources compare false.
    fn has_id(&mut self, offset: u64, id: &[u8]) -> bool {
        if offset.saturating_add(id.len() as u64) > self.size() {
            return false;
        }
        let mut buf = vec![0; id.len()];
        self.read_at(offset, &mut buf).is_ok() && buf == id
    }
}

impl<S: ByteSource + ?Sized> ByteSourceExt for S {}

fn out_of_range(name: &str, offset: u64, len: usize, size: u64) -> Error {
    Error::io(
        name,
        offset,
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("read of {len} bytes past end of {size}-byte source"),
        ),
    )
}

/// Bytes held in memory.
///
/// Clones share the same allocation, so one buffer can back several streams.
#[derive(Clone, Debug)]
pub struct MemorySource {
    name: String,
    data: Arc<[u8]>,
}

impl MemorySource {
    /// Wraps `data`, naming the source `name`.
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// The bytes backing this source.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl ByteSource for MemorySource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset.checked_add(buf.len() as u64);
        match end {
            Some(end) if end <= self.data.len() as u64 => {
                let start = offset as usize;
                buf.copy_from_slice(&self.data[start..start + buf.len()]);
                Ok(())
            }
            _ => Err(out_of_range(&self.name, offset, buf.len(), self.size())),
        }
    }

    #[inline]
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }
}

/// A file on disk.
#[derive(Debug)]
pub struct FileSource {
    name: String,
    file: File,
    len: u64,
}

impl FileSource {
    /// Opens the file at `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened or its length queried.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::io(&name, 0, e))?;
        let len = file.metadata().map_err(|e| Error::io(&name, 0, e))?.len();
        Ok(Self { name, file, len })
    }
}

impl ByteSource for FileSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        if offset.saturating_add(buf.len() as u64) > self.len {
            return Err(out_of_range(&self.name, offset, buf.len(), self.len));
        }
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|e| Error::io(&self.name, offset, e))
    }

    #[inline]
    fn size(&self) -> u64 {
        self.len
    }

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }
}

/// A window into another source, such as one member of an archive.
///
/// Offsets passed to [`read_at`](ByteSource::read_at) are relative to the
/// start of the window; reads may not leave it.
#[derive(Debug)]
pub struct SubSource<S> {
    inner: S,
    offset: u64,
    len: u64,
    name: String,
}

impl<S: ByteSource> SubSource<S> {
    /// Exposes `len` bytes of `inner` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the window does not fit in `inner`.
    pub fn new(inner: S, offset: u64, len: u64, name: impl Into<String>) -> Result<Self> {
        match offset.checked_add(len) {
            Some(end) if end <= inner.size() => Ok(Self {
                inner,
                offset,
                len,
                name: name.into(),
            }),
            _ => Err(Error::InvalidArgument(format!(
                "window {offset:#x}+{len:#x} exceeds '{}' ({} bytes)",
                inner.name(),
                inner.size()
            ))),
        }
    }

    /// Returns the wrapped source.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ByteSource> ByteSource for SubSource<S> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        if offset.saturating_add(buf.len() as u64) > self.len {
            return Err(out_of_range(&self.name, offset, buf.len(), self.len));
        }
        self.inner.read_at(self.offset + offset, buf)
    }

    #[inline]
    fn size(&self) -> u64 {
        self.len
    }

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }
}
