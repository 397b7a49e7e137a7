//! Byte container with independent read and write cursors.
//!
//! A [`Buffer`] is either growable (writes extend it) or fixed (writes past
//! the end fail). Rows are held in fixed buffers sized to the row length, and
//! session YAML is staged in growable ones.

use std::io::{self, Read, Write};

use crate::{Result, TelemetryError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
    fixed: bool,
}

impl Buffer {
    /// Empty growable buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty growable buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity), ..Self::default() }
    }

    /// Zero-filled buffer of exactly `size` bytes that never grows.
    pub fn fixed(size: usize) -> Self {
        Self { data: vec![0; size], read_pos: 0, write_pos: 0, fixed: true }
    }

    /// Growable buffer holding `data`, with the write cursor at the end.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let write_pos = data.len();
        Self { data, read_pos: 0, write_pos, fixed: false }
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.write_pos
    }

    pub fn is_empty(&self) -> bool {
        self.write_pos == 0
    }

    /// Allocated size; for fixed buffers this is the hard limit.
    pub fn capacity(&self) -> usize {
        if self.fixed { self.data.len() } else { self.data.capacity() }
    }

    /// Bytes written but not yet read.
    pub fn remaining(&self) -> usize {
        self.write_pos - self.read_pos
    }

    pub fn read_position(&self) -> usize {
        self.read_pos
    }

    pub fn write_position(&self) -> usize {
        self.write_pos
    }

    /// Move the read cursor; it may not pass the write cursor.
    pub fn set_read_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.write_pos {
            return Err(TelemetryError::buffer_operation_error(format!(
                "read position {} beyond written length {}",
                pos, self.write_pos
            )));
        }
        self.read_pos = pos;
        Ok(())
    }

    /// Move the write cursor. Growable buffers zero-extend; fixed buffers
    /// reject positions past their size.
    pub fn set_write_position(&mut self, pos: usize) -> Result<()> {
        self.ensure_room(pos)?;
        self.write_pos = pos;
        self.read_pos = self.read_pos.min(pos);
        Ok(())
    }

    /// Written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.write_pos]
    }

    /// Whole backing store; for fixed buffers this is the full row.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Append at the write cursor.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.write_pos + bytes.len();
        self.ensure_room(end)?;
        self.data[self.write_pos..end].copy_from_slice(bytes);
        self.write_pos = end;
        Ok(())
    }

    /// Copy unread bytes into `out`, returning how many were copied.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.remaining());
        out[..n].copy_from_slice(&self.data[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        n
    }

    /// Read exactly `len` bytes from `reader` at the write cursor.
    pub fn fill_from<R: Read>(&mut self, reader: &mut R, len: usize) -> Result<()> {
        let start = self.write_pos;
        let end = start + len;
        self.ensure_room(end)?;
        reader.read_exact(&mut self.data[start..end])?;
        self.write_pos = end;
        Ok(())
    }

    /// Rewind both cursors. Fixed buffers keep their contents and size.
    pub fn reset(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Rewind both cursors and drop growable contents.
    pub fn clear(&mut self) {
        self.reset();
        if self.fixed {
            self.data.fill(0);
        } else {
            self.data.clear();
        }
    }

    /// Written bytes as text, stopping at the first NUL.
    pub fn to_string_lossy(&self) -> String {
        let bytes = self.as_slice();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    fn ensure_room(&mut self, end: usize) -> Result<()> {
        if end <= self.data.len() {
            return Ok(());
        }
        if self.fixed {
            return Err(TelemetryError::buffer_operation_error(format!(
                "write to {} exceeds fixed size {}",
                end,
                self.data.len()
            )));
        }
        self.data.resize(end, 0);
        Ok(())
    }
}

impl Read for Buffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf))
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = if self.fixed { self.data.len() - self.write_pos } else { buf.len() };
        let n = buf.len().min(room);
        if n == 0 && !buf.is_empty() {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "fixed buffer is full"));
        }
        self.write_bytes(&buf[..n]).map_err(|e| io::Error::other(e.to_string()))?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
