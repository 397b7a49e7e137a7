//! An in-process [`TelemetrySource`].
//!
//! [`MemorySource`] lays a segment out the way the sim does (header,
//! variable table, session string, `num_buf` row slots) and offers the
//! producer side as methods: publish a row into the oldest slot, replace the
//! session string, flip the connected bit, or swap the whole layout for a
//! new session. Waiting readers are woken through a condition variable.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::trace;

use super::TelemetrySource;
use crate::broadcast::BroadcastMessage;
use crate::schema::header::{
    ConnectionStatus, DATA_HEADER_SIZE, DataHeader, IRSDK_MAX_BUFS, IRSDK_STATUS_CONNECTED,
    IRSDK_VER, VarBufDescriptor,
};
use crate::schema::VariableTable;
use crate::{Result, Sample, TelemetryError};

/// Room reserved for the session string unless configured otherwise.
pub const DEFAULT_SESSION_CAPACITY: usize = 64 * 1024;

pub struct MemorySource {
    segment: Mutex<Vec<u8>>,
    session_capacity: usize,
    pending: Mutex<bool>,
    ready: Condvar,
    broadcasts: Mutex<Vec<BroadcastMessage>>,
}

impl MemorySource {
    /// Connected segment for `table` with three row slots at 60 Hz.
    pub fn new(table: &VariableTable) -> Self {
        Self::with_layout(table, 3, DEFAULT_SESSION_CAPACITY, 60)
    }

    pub fn with_layout(
        table: &VariableTable,
        num_buf: usize,
        session_capacity: usize,
        tick_rate: i32,
    ) -> Self {
        Self {
            segment: Mutex::new(build_segment(table, num_buf, session_capacity, tick_rate, 0)),
            session_capacity,
            pending: Mutex::new(false),
            ready: Condvar::new(),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    /// A segment whose producer has not connected yet: a zeroed header.
    pub fn disconnected() -> Self {
        Self {
            segment: Mutex::new(vec![0; DATA_HEADER_SIZE]),
            session_capacity: 0,
            pending: Mutex::new(false),
            ready: Condvar::new(),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    pub fn header(&self) -> Result<DataHeader> {
        DataHeader::parse(&self.segment.lock())
    }

    /// Write `row` into the slot holding the oldest tick and signal readers.
    pub fn publish_row(&self, tick: i32, row: &[u8]) -> Result<()> {
        {
            let mut segment = self.segment.lock();
            let mut header = DataHeader::parse(&segment)?;
            if row.len() != header.buf_len.max(0) as usize {
                return Err(TelemetryError::buffer_operation_error(format!(
                    "row is {} bytes, segment rows are {}",
                    row.len(),
                    header.buf_len
                )));
            }
            let slot = header
                .active_buffers()
                .iter()
                .enumerate()
                .min_by_key(|(_, buf)| buf.tick_count)
                .map(|(idx, _)| idx)
                .ok_or_else(|| TelemetryError::buffer_operation_error("segment has no row slots"))?;

            let start = header.var_buf[slot].buf_offset as usize;
            segment[start..start + row.len()].copy_from_slice(row);
            header.var_buf[slot].tick_count = tick;
            segment[..DATA_HEADER_SIZE].copy_from_slice(&header.encode());
            trace!(tick, slot, "Published row");
        }
        self.signal();
        Ok(())
    }

    pub fn publish_sample(&self, sample: &Sample) -> Result<()> {
        self.publish_row(sample.tick, &sample.data)
    }

    /// Replace the session string and bump its update counter.
    pub fn set_session_info(&self, yaml: &str) -> Result<()> {
        let mut segment = self.segment.lock();
        let mut header = DataHeader::parse(&segment)?;
        if yaml.len() + 1 > self.session_capacity {
            return Err(TelemetryError::buffer_operation_error(format!(
                "session string of {} bytes exceeds capacity {}",
                yaml.len(),
                self.session_capacity
            )));
        }
        let start = header.session.offset as usize;
        let region = &mut segment[start..start + self.session_capacity];
        region.fill(0);
        region[..yaml.len()].copy_from_slice(yaml.as_bytes());
        header.session.count += 1;
        segment[..DATA_HEADER_SIZE].copy_from_slice(&header.encode());
        trace!(count = header.session.count, len = yaml.len(), "Updated session string");
        Ok(())
    }

    pub fn set_connected(&self, connected: bool) -> Result<()> {
        {
            let mut segment = self.segment.lock();
            let mut header = DataHeader::parse(&segment)?;
            header.set_connection_status(if connected {
                ConnectionStatus::Connected
            } else {
                ConnectionStatus::NotConnected
            });
            segment[..DATA_HEADER_SIZE].copy_from_slice(&header.encode());
        }
        self.signal();
        Ok(())
    }

    /// Rebuild the segment around a new table, as the sim does when a new
    /// session starts with a different channel set. The session string is
    /// cleared; its update counter keeps counting.
    pub fn reset_layout(&self, table: &VariableTable) -> Result<()> {
        {
            let mut segment = self.segment.lock();
            let old = DataHeader::parse(&segment)?;
            let num_buf = old.num_buf.clamp(1, IRSDK_MAX_BUFS as i32) as usize;
            *segment =
                build_segment(table, num_buf, self.session_capacity, old.tick_rate, old.session.count);
        }
        self.signal();
        Ok(())
    }

    /// Commands received through [`TelemetrySource::broadcast`].
    pub fn broadcasts(&self) -> Vec<BroadcastMessage> {
        self.broadcasts.lock().clone()
    }

    /// Wake one waiting reader.
    pub fn signal(&self) {
        *self.pending.lock() = true;
        self.ready.notify_all();
    }
}

fn build_segment(
    table: &VariableTable,
    num_buf: usize,
    session_capacity: usize,
    tick_rate: i32,
    session_count: i32,
) -> Vec<u8> {
    let num_buf = num_buf.clamp(1, IRSDK_MAX_BUFS);
    let var_header_offset = DATA_HEADER_SIZE;
    let session_offset = var_header_offset + table.encode().len();
    let rows_offset = session_offset + session_capacity;
    let total = rows_offset + num_buf * table.buf_len();

    let mut var_buf = [VarBufDescriptor::default(); IRSDK_MAX_BUFS];
    for (idx, slot) in var_buf.iter_mut().take(num_buf).enumerate() {
        // negative ticks mark slots never written
        *slot = VarBufDescriptor {
            tick_count: -1,
            buf_offset: (rows_offset + idx * table.buf_len()) as i32,
        };
    }

    let mut header = DataHeader {
        version: IRSDK_VER,
        status: IRSDK_STATUS_CONNECTED,
        tick_rate,
        num_vars: table.len() as i32,
        var_header_offset: var_header_offset as i32,
        num_buf: num_buf as i32,
        buf_len: table.buf_len() as i32,
        var_buf,
        ..DataHeader::default()
    };
    header.session.count = session_count;
    header.session.len = session_capacity as i32;
    header.session.offset = session_offset as i32;

    let mut segment = vec![0u8; total];
    segment[..DATA_HEADER_SIZE].copy_from_slice(&header.encode());
    segment[var_header_offset..session_offset].copy_from_slice(&table.encode());
    segment
}

impl TelemetrySource for MemorySource {
    fn wait_for_data(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.pending.lock();
        while !*pending {
            if self.ready.wait_until(&mut pending, deadline).timed_out() {
                break;
            }
        }
        std::mem::replace(&mut *pending, false)
    }

    fn len(&self) -> usize {
        self.segment.lock().len()
    }

    fn read_at(&self, offset: usize, out: &mut [u8]) -> bool {
        let segment = self.segment.lock();
        match segment.get(offset..offset + out.len()) {
            Some(bytes) => {
                out.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    fn broadcast(&self, message: BroadcastMessage) -> Result<()> {
        self.broadcasts.lock().push(message);
        Ok(())
    }
}

impl std::fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySource").field("len", &self.len()).finish_non_exhaustive()
    }
}
