//! Random-access byte sources the decoder reads from.
//!
//! A source reports its total length and hands out bounds-checked ranges.
//! Reads never clamp: an offset at or past the end, an empty read, or a range
//! running off the end is an [`DecodingError::InvalidRange`].

use std::borrow::Cow;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::trace;

use crate::error::{DecodingError, Result};

pub trait ByteSource {
    /// Total number of bytes in the source.
    fn length(&mut self) -> Result<usize>;

    /// Bytes in `[offset, offset + length)`.
    fn read(&mut self, offset: usize, length: usize) -> Result<Cow<'_, [u8]>>;

    fn read_byte(&mut self, offset: usize) -> Result<u8> {
        let bytes = self.read(offset, 1)?;
        bytes.first().copied().ok_or(DecodingError::InvalidRange { offset, length: 1 })
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn length(&mut self) -> Result<usize> {
        (**self).length()
    }

    fn read(&mut self, offset: usize, length: usize) -> Result<Cow<'_, [u8]>> {
        (**self).read(offset, length)
    }

    fn read_byte(&mut self, offset: usize) -> Result<u8> {
        (**self).read_byte(offset)
    }
}

fn check_range(offset: usize, length: usize, total: usize) -> Result<()> {
    let in_bounds = length >= 1
        && offset < total
        && offset.checked_add(length).is_some_and(|end| end <= total);
    if in_bounds {
        Ok(())
    } else {
        Err(DecodingError::InvalidRange { offset, length })
    }
}

/// A source over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct BufferSource<B> {
    buf: B,
}

impl<B: AsRef<[u8]>> BufferSource<B> {
    pub fn new(buf: B) -> Self {
        BufferSource { buf }
    }
}

impl<B: AsRef<[u8]>> ByteSource for BufferSource<B> {
    fn length(&mut self) -> Result<usize> {
        Ok(self.buf.as_ref().len())
    }

    fn read(&mut self, offset: usize, length: usize) -> Result<Cow<'_, [u8]>> {
        let bytes = self.buf.as_ref();
        check_range(offset, length, bytes.len())?;
        Ok(Cow::Borrowed(&bytes[offset..offset + length]))
    }

    fn read_byte(&mut self, offset: usize) -> Result<u8> {
        self.buf
            .as_ref()
            .get(offset)
            .copied()
            .ok_or(DecodingError::InvalidRange { offset, length: 1 })
    }
}

/// A source over an owned file handle.
///
/// Every read seeks the handle, so one instance must only serve one decode at
/// a time. Open a second handle to decode the same file concurrently.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    length: Option<usize>,
}

impl FileSource {
    pub fn new(file: File) -> Self {
        FileSource { file, length: None }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        File::open(path).map(FileSource::new)
    }

    fn seek_to(&mut self, offset: usize) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset as u64))
            .map(|_| ())
            .map_err(|e| DecodingError::io(&e, offset))
    }
}

fn file_length(len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| DecodingError::Io { kind: ErrorKind::InvalidData, offset: 0 })
}

impl ByteSource for FileSource {
    fn length(&mut self) -> Result<usize> {
        if let Some(length) = self.length {
            return Ok(length);
        }
        let metadata = self.file.metadata().map_err(|e| DecodingError::io(&e, 0))?;
        let length = file_length(metadata.len())?;
        trace!(length, "file source length");
        self.length = Some(length);
        Ok(length)
    }

    fn read(&mut self, offset: usize, length: usize) -> Result<Cow<'_, [u8]>> {
        let total = self.length()?;
        check_range(offset, length, total)?;
        trace!(offset, length, "file source read");

        self.seek_to(offset)?;
        let mut buf = vec![0; length];
        self.file.read_exact(&mut buf).map_err(|e| DecodingError::io(&e, offset))?;
        Ok(Cow::Owned(buf))
    }

    fn read_byte(&mut self, offset: usize) -> Result<u8> {
        let total = self.length()?;
        check_range(offset, 1, total)?;

        self.seek_to(offset)?;
        let mut byte = [0u8; 1];
        self.file.read_exact(&mut byte).map_err(|e| DecodingError::io(&e, offset))?;
        Ok(byte[0])
    }
}
