//! The `irsdk_header` block that opens both the shared-memory segment and every
//! `.ibt` file.
//!
//! ```c
//! typedef struct irsdk_header
//! {
//!     int ver;                    // offset 0, api version (2)
//!     int status;                 // offset 4, bitfield, bit 0 = connected
//!     int tickRate;               // offset 8, ticks per second
//!     int sessionInfoUpdate;      // offset 12, incremented when session info changes
//!     int sessionInfoLen;         // offset 16
//!     int sessionInfoOffset;      // offset 20
//!     int numVars;                // offset 24
//!     int varHeaderOffset;        // offset 28
//!     int numBuf;                 // offset 32
//!     int bufLen;                 // offset 36
//!     int pad1[2];                // offset 40
//!     irsdk_varBuf varBuf[4];     // offset 48, 16 bytes each
//! } irsdk_header;                 // 112 bytes
//! ```
//!
//! The session triple (`sessionInfoUpdate`, `sessionInfoLen`,
//! `sessionInfoOffset`) is grouped into [`SessionDetails`]; each `varBuf`
//! entry is a [`VarBufDescriptor`].

use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::{debug, trace};

use super::layout::{read_i32_le, write_i32_le};
use super::variables::VAR_HEADER_SIZE;
use crate::{Result, TelemetryError};

/// The expected iRacing SDK version
pub const IRSDK_VER: i32 = 2;

/// Status flag indicating that the simulator is actively publishing telemetry
pub const IRSDK_STATUS_CONNECTED: i32 = 0x1;

/// Maximum number of row buffers described by a header
pub const IRSDK_MAX_BUFS: usize = 4;

/// Encoded size of [`DataHeader`] in bytes
pub const DATA_HEADER_SIZE: usize = 112;

const VAR_BUF_BASE: usize = 48;
const VAR_BUF_STRIDE: usize = 16;

/// Connection status decoded from the header status bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    NotConnected,
    Connected,
}

/// Location and version of the embedded session YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionDetails {
    /// `sessionInfoUpdate`, bumped by the producer on every rewrite
    pub count: i32,
    /// Length in bytes of the YAML region
    pub len: i32,
    /// Byte offset of the YAML region from the start of the segment or file
    pub offset: i32,
}

/// One `irsdk_varBuf` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VarBufDescriptor {
    /// Tick at which the producer last finished writing this slot
    pub tick_count: i32,
    /// Byte offset of the row from the start of the segment or file
    pub buf_offset: i32,
}

/// Decoded `irsdk_header`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataHeader {
    pub version: i32,
    /// Raw status bitfield
    pub status: i32,
    pub tick_rate: i32,
    pub session: SessionDetails,
    pub num_vars: i32,
    pub var_header_offset: i32,
    pub num_buf: i32,
    /// Size in bytes of one sample row
    pub buf_len: i32,
    pub var_buf: [VarBufDescriptor; IRSDK_MAX_BUFS],
}

impl DataHeader {
    pub const SIZE: usize = DATA_HEADER_SIZE;

    /// Decode a header from the first [`DATA_HEADER_SIZE`] bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        trace!(len = data.len(), "Parsing data header");
        if data.len() < DATA_HEADER_SIZE {
            return Err(TelemetryError::Parse {
                context: "Data header".to_string(),
                details: format!(
                    "Need {} bytes for header, have {}",
                    DATA_HEADER_SIZE,
                    data.len()
                ),
            });
        }

        let mut var_buf = [VarBufDescriptor::default(); IRSDK_MAX_BUFS];
        for (i, slot) in var_buf.iter_mut().enumerate() {
            let base = VAR_BUF_BASE + i * VAR_BUF_STRIDE;
            slot.tick_count = read_i32_le(data, base)?;
            slot.buf_offset = read_i32_le(data, base + 4)?;
        }

        let header = Self {
            version: read_i32_le(data, 0)?,
            status: read_i32_le(data, 4)?,
            tick_rate: read_i32_le(data, 8)?,
            session: SessionDetails {
                count: read_i32_le(data, 12)?,
                len: read_i32_le(data, 16)?,
                offset: read_i32_le(data, 20)?,
            },
            num_vars: read_i32_le(data, 24)?,
            var_header_offset: read_i32_le(data, 28)?,
            num_buf: read_i32_le(data, 32)?,
            buf_len: read_i32_le(data, 36)?,
            var_buf,
        };

        debug!(
            version = header.version,
            status = header.status,
            tick_rate = header.tick_rate,
            session_update = header.session.count,
            num_vars = header.num_vars,
            num_buf = header.num_buf,
            buf_len = header.buf_len,
            "Parsed data header"
        );
        Ok(header)
    }

    pub fn parse_from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut raw = [0u8; DATA_HEADER_SIZE];
        reader.read_exact(&mut raw).map_err(|e| TelemetryError::Parse {
            context: "Data header reading".to_string(),
            details: format!("Failed to read {} header bytes: {}", DATA_HEADER_SIZE, e),
        })?;
        Self::parse(&raw)
    }

    /// Encode into the exact on-wire byte layout.
    pub fn encode(&self) -> [u8; DATA_HEADER_SIZE] {
        let mut out = [0u8; DATA_HEADER_SIZE];
        write_i32_le(&mut out, 0, self.version);
        write_i32_le(&mut out, 4, self.status);
        write_i32_le(&mut out, 8, self.tick_rate);
        write_i32_le(&mut out, 12, self.session.count);
        write_i32_le(&mut out, 16, self.session.len);
        write_i32_le(&mut out, 20, self.session.offset);
        write_i32_le(&mut out, 24, self.num_vars);
        write_i32_le(&mut out, 28, self.var_header_offset);
        write_i32_le(&mut out, 32, self.num_buf);
        write_i32_le(&mut out, 36, self.buf_len);
        for (i, slot) in self.var_buf.iter().enumerate() {
            let base = VAR_BUF_BASE + i * VAR_BUF_STRIDE;
            write_i32_le(&mut out, base, slot.tick_count);
            write_i32_le(&mut out, base + 4, slot.buf_offset);
        }
        out
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        if self.status & IRSDK_STATUS_CONNECTED != 0 {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::NotConnected
        }
    }

    /// Returns true when the producer reports the segment is live
    pub fn is_connected(&self) -> bool {
        self.connection_status() == ConnectionStatus::Connected
    }

    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        match status {
            ConnectionStatus::Connected => self.status |= IRSDK_STATUS_CONNECTED,
            ConnectionStatus::NotConnected => self.status &= !IRSDK_STATUS_CONNECTED,
        }
    }

    /// Validate header fields for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.version != IRSDK_VER {
            return Err(TelemetryError::Version {
                expected: IRSDK_VER as u32,
                found: self.version as u32,
            });
        }

        let non_negative = [
            ("num_vars", self.num_vars),
            ("var_header_offset", self.var_header_offset),
            ("buf_len", self.buf_len),
            ("session_info_len", self.session.len),
            ("session_info_offset", self.session.offset),
        ];
        for (name, value) in non_negative {
            if value < 0 {
                return Err(TelemetryError::Parse {
                    context: "Header validation".to_string(),
                    details: format!("{} cannot be negative: {}", name, value),
                });
            }
        }

        if self.num_buf < 0 || self.num_buf as usize > IRSDK_MAX_BUFS {
            return Err(TelemetryError::Parse {
                context: "Header validation".to_string(),
                details: format!("Expected 0-{} buffers, found {}", IRSDK_MAX_BUFS, self.num_buf),
            });
        }

        if self.num_vars > 10_000 {
            return Err(TelemetryError::Parse {
                context: "Header validation".to_string(),
                details: "Number of variables is unreasonably large".to_string(),
            });
        }

        if self.buf_len > 100_000_000 {
            return Err(TelemetryError::Parse {
                context: "Header validation".to_string(),
                details: "Buffer length is unreasonably large".to_string(),
            });
        }

        Ok(())
    }

    /// Check `varHeaderOffset + numVars * sizeof(VarDataHeader) <= total_len`.
    pub fn validate_table_bounds(&self, total_len: u64) -> Result<()> {
        let end = self.var_table_end();
        if end > total_len {
            return Err(TelemetryError::Parse {
                context: "Variable table bounds".to_string(),
                details: format!(
                    "Variable table ends at {} but source is only {} bytes (vars={}, offset={})",
                    end, total_len, self.num_vars, self.var_header_offset
                ),
            });
        }
        Ok(())
    }

    /// First byte after the variable header table.
    pub fn var_table_end(&self) -> u64 {
        (self.var_header_offset.max(0) as u64)
            .saturating_add((self.num_vars.max(0) as u64).saturating_mul(VAR_HEADER_SIZE as u64))
    }

    /// First byte after the embedded session YAML region.
    pub fn session_end(&self) -> u64 {
        (self.session.offset.max(0) as u64).saturating_add(self.session.len.max(0) as u64)
    }

    /// The buffer descriptors actually in use.
    pub fn active_buffers(&self) -> &[VarBufDescriptor] {
        let count = self.num_buf.clamp(0, IRSDK_MAX_BUFS as i32) as usize;
        &self.var_buf[..count]
    }

    /// Select the freshest row slot: highest tick wins, ties go to the lowest
    /// slot index.
    pub fn freshest_buffer(&self) -> Option<(usize, VarBufDescriptor)> {
        let mut best: Option<(usize, VarBufDescriptor)> = None;
        for (idx, slot) in self.active_buffers().iter().enumerate() {
            match best {
                Some((_, current)) if slot.tick_count <= current.tick_count => {}
                _ => best = Some((idx, *slot)),
            }
        }
        best
    }
}
