//! IBT file layout
//!
//! An `.ibt` file is the shared-memory layout frozen to disk:
//!
//! 1. **Data header** (112 bytes) - [`DataHeader`] at offset 0
//! 2. **Disk sub-header** (32 bytes) - [`DiskSubHeader`] immediately after
//! 3. **Variable headers** - `numVars` entries of 144 bytes at `varHeaderOffset`
//! 4. **Session info** - YAML at `session.offset`, `session.len` bytes
//! 5. **Rows** - `sampleCount` rows of `bufLen` bytes from `varBuf[0].bufOffset`
//!
//! All integers are little-endian.

use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::{trace, warn};

use crate::schema::header::DataHeader;
use crate::schema::layout::{read_f64_le, read_i32_le, read_i64_le, write_f64_le, write_i32_le, write_i64_le};
use crate::{Result, TelemetryError};

/// Encoded size of [`DiskSubHeader`] in bytes
pub const DISK_SUB_HEADER_SIZE: usize = 32;

/// Byte offset of the disk sub-header within a file
pub const DISK_SUB_HEADER_OFFSET: usize = DataHeader::SIZE;

/// `irsdk_diskSubHeader`
/// ```c
/// struct irsdk_diskSubHeader {
///   time_t sessionStartDate;   // 8 bytes
///   double sessionStartTime;   // 8 bytes
///   double sessionEndTime;     // 8 bytes
///   int sessionLapCount;       // 4 bytes
///   int sessionRecordCount;    // 4 bytes
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiskSubHeader {
    /// Unix timestamp of the session start
    pub start_date: i64,
    /// Session time of the first row, seconds
    pub start_time: f64,
    /// Session time of the last row, seconds
    pub end_time: f64,
    pub lap_count: i32,
    /// Number of rows in the file
    pub sample_count: i32,
}

impl DiskSubHeader {
    pub const SIZE: usize = DISK_SUB_HEADER_SIZE;

    pub fn parse(data: &[u8]) -> Result<Self> {
        Ok(Self {
            start_date: read_i64_le(data, 0)?,
            start_time: read_f64_le(data, 8)?,
            end_time: read_f64_le(data, 16)?,
            lap_count: read_i32_le(data, 24)?,
            sample_count: read_i32_le(data, 28)?,
        })
    }

    pub fn parse_from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut raw = [0u8; DISK_SUB_HEADER_SIZE];
        reader.read_exact(&mut raw).map_err(|e| TelemetryError::Parse {
            context: "Disk sub-header reading".to_string(),
            details: format!("Failed to read {} bytes: {}", DISK_SUB_HEADER_SIZE, e),
        })?;
        let disk = Self::parse(&raw)?;
        trace!(
            start_date = disk.start_date,
            laps = disk.lap_count,
            samples = disk.sample_count,
            "Parsed disk sub-header"
        );
        if disk.sample_count < 0 {
            return Err(TelemetryError::Parse {
                context: "Disk sub-header".to_string(),
                details: format!("Negative sample count: {}", disk.sample_count),
            });
        }
        Ok(disk)
    }

    pub fn encode(&self) -> [u8; DISK_SUB_HEADER_SIZE] {
        let mut out = [0u8; DISK_SUB_HEADER_SIZE];
        write_i64_le(&mut out, 0, self.start_date);
        write_f64_le(&mut out, 8, self.start_time);
        write_f64_le(&mut out, 16, self.end_time);
        write_i32_le(&mut out, 24, self.lap_count);
        write_i32_le(&mut out, 28, self.sample_count);
        out
    }
}

/// Byte offset of row 0.
///
/// Recorders store it in `varBuf[0].bufOffset`. Files that leave it zero put
/// the rows straight after whichever of the variable table and the session
/// YAML ends last.
pub fn sample_data_offset(header: &DataHeader) -> u64 {
    let declared = header.var_buf[0].buf_offset;
    if declared > 0 {
        return declared as u64;
    }
    let fallback = header
        .var_table_end()
        .max(header.session_end())
        .max((DISK_SUB_HEADER_OFFSET + DISK_SUB_HEADER_SIZE) as u64);
    warn!(fallback, "Row offset missing from header, deriving from layout");
    fallback
}

/// Number of whole rows actually present in a file of `file_len` bytes.
pub fn rows_present(file_len: u64, header: &DataHeader) -> u64 {
    let row_len = header.buf_len.max(0) as u64;
    if row_len == 0 {
        return 0;
    }
    file_len.saturating_sub(sample_data_offset(header)) / row_len
}

/// Verify the file is long enough for every row the sub-header announces.
pub fn verify_min_length(file_len: u64, header: &DataHeader, disk: &DiskSubHeader) -> Result<()> {
    let rows = (disk.sample_count.max(0) as u64).saturating_mul(header.buf_len.max(0) as u64);
    let min_end = sample_data_offset(header).saturating_add(rows);
    if file_len < min_end {
        return Err(TelemetryError::Parse {
            context: "IBT length verification".to_string(),
            details: format!(
                "File too small: len={} < required_min={} (samples={}, buf_len={})",
                file_len, min_end, disk.sample_count, header.buf_len
            ),
        });
    }
    Ok(())
}
