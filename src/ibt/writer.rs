//! Recording rows into the `.ibt` layout.
//!
//! [`IbtWriter`] lays a file out as header, disk sub-header, variable table,
//! session YAML and rows. The disk sub-header is kept in memory and updated
//! as rows arrive (sample count, lap count, start and end time); the headers
//! at the start of the file are rewritten by [`IbtWriter::flush_headers`] and
//! [`IbtWriter::finish`].

use std::io::{Seek, SeekFrom, Write};
use std::sync::Arc;
use tracing::{debug, trace};

use super::format::{DISK_SUB_HEADER_OFFSET, DISK_SUB_HEADER_SIZE, DiskSubHeader};
use crate::schema::header::{DataHeader, IRSDK_STATUS_CONNECTED, IRSDK_VER, VarBufDescriptor};
use crate::schema::variables::VAR_HEADER_SIZE;
use crate::schema::VariableTable;
use crate::{KnownVar, Result, TelemetryError, Value, VarData};

/// Assembles one row from named channel values.
#[derive(Debug, Clone)]
pub struct RowBuilder<'a> {
    table: &'a VariableTable,
    row: Vec<u8>,
}

impl<'a> RowBuilder<'a> {
    pub fn new(table: &'a VariableTable) -> Self {
        Self { table, row: vec![0; table.buf_len()] }
    }

    /// Set entry 0 of `name`, coercing `value` to the channel type.
    pub fn set(&mut self, name: &str, value: Value) -> Result<&mut Self> {
        self.set_entry(name, 0, value)
    }

    pub fn set_known(&mut self, var: KnownVar, value: Value) -> Result<&mut Self> {
        self.set_entry(var.name(), 0, value)
    }

    pub fn set_entry(&mut self, name: &str, entry: usize, value: Value) -> Result<&mut Self> {
        let header = self
            .table
            .by_name(name)
            .ok_or_else(|| TelemetryError::not_found(format!("channel '{}'", name)))?;
        let offset = header.entry_offset(entry).ok_or_else(|| {
            TelemetryError::not_found(format!("entry {} of '{}' (count {})", entry, name, header.count))
        })?;
        value.coerce_to(header.var_type).encode(&mut self.row[offset..]);
        Ok(self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.row
    }

    pub fn build(&self) -> Vec<u8> {
        self.row.clone()
    }
}

/// Writes an `.ibt` recording to any seekable sink.
pub struct IbtWriter<W: Write + Seek> {
    inner: W,
    header: DataHeader,
    disk: DiskSubHeader,
    table: Arc<VariableTable>,
    rows_offset: u64,
}

impl<W: Write + Seek> IbtWriter<W> {
    /// Write the provisional headers, the variable table and the session YAML.
    pub fn create(
        mut inner: W,
        table: Arc<VariableTable>,
        session_yaml: &str,
        tick_rate: i32,
    ) -> Result<Self> {
        let var_header_offset = DISK_SUB_HEADER_OFFSET + DISK_SUB_HEADER_SIZE;
        let session_offset = var_header_offset + table.len() * VAR_HEADER_SIZE;
        // terminating NUL is part of the region
        let session_len = session_yaml.len() + 1;
        let rows_offset = session_offset + session_len;

        let mut var_buf = [VarBufDescriptor::default(); 4];
        var_buf[0].buf_offset = rows_offset as i32;

        let mut header = DataHeader {
            version: IRSDK_VER,
            status: IRSDK_STATUS_CONNECTED,
            tick_rate,
            num_vars: table.len() as i32,
            var_header_offset: var_header_offset as i32,
            num_buf: 1,
            buf_len: table.buf_len() as i32,
            var_buf,
            ..DataHeader::default()
        };
        header.session.count = 1;
        header.session.len = session_len as i32;
        header.session.offset = session_offset as i32;

        let disk = DiskSubHeader::default();

        inner.seek(SeekFrom::Start(0))?;
        inner.write_all(&header.encode())?;
        inner.write_all(&disk.encode())?;
        inner.write_all(&table.encode())?;
        inner.write_all(session_yaml.as_bytes())?;
        inner.write_all(&[0])?;

        debug!(
            num_vars = table.len(),
            buf_len = table.buf_len(),
            rows_offset,
            "Created IBT recording"
        );

        Ok(Self { inner, header, disk, table, rows_offset: rows_offset as u64 })
    }

    pub fn set_start_date(&mut self, unix_seconds: i64) {
        self.disk.start_date = unix_seconds;
    }

    pub fn table(&self) -> &Arc<VariableTable> {
        &self.table
    }

    pub fn header(&self) -> &DataHeader {
        &self.header
    }

    pub fn disk_sub_header(&self) -> &DiskSubHeader {
        &self.disk
    }

    /// Append one row and fold it into the running disk sub-header.
    pub fn append_row(&mut self, row: &[u8]) -> Result<()> {
        if row.len() != self.table.buf_len() {
            return Err(TelemetryError::buffer_operation_error(format!(
                "row is {} bytes, table expects {}",
                row.len(),
                self.table.buf_len()
            )));
        }

        let offset = self.rows_offset + self.disk.sample_count as u64 * row.len() as u64;
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(row)?;

        let read = |var: KnownVar| -> Option<Value> {
            let idx = self.table.index_of(var.name())?;
            self.table.read_value(row, idx, 0)
        };
        if let Some(tick) = read(KnownVar::SessionTick) {
            self.header.var_buf[0].tick_count = i32::from_value(tick);
        }
        if let Some(time) = read(KnownVar::SessionTime).map(f64::from_value) {
            if self.disk.sample_count == 0 {
                self.disk.start_time = time;
            }
            self.disk.end_time = time;
        }
        if let Some(lap) = read(KnownVar::Lap).map(i32::from_value) {
            self.disk.lap_count = self.disk.lap_count.max(lap);
        }
        self.disk.sample_count += 1;

        trace!(sample_count = self.disk.sample_count, "Appended IBT row");
        Ok(())
    }

    /// Rewrite the data header and disk sub-header in place.
    pub fn flush_headers(&mut self) -> Result<()> {
        let end = self.inner.stream_position()?;
        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(&self.header.encode())?;
        self.inner.write_all(&self.disk.encode())?;
        self.inner.seek(SeekFrom::Start(end))?;
        self.inner.flush()?;
        Ok(())
    }

    /// Rewrite the headers and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.flush_headers()?;
        debug!(
            samples = self.disk.sample_count,
            laps = self.disk.lap_count,
            "Finished IBT recording"
        );
        Ok(self.inner)
    }
}
