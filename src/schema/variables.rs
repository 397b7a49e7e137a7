//! The `irsdk_varHeader` table: one self-describing entry per channel.
//!
//! ```c
//! typedef struct irsdk_varHeader
//! {
//!     int type;                           // offset 0, irsdk_VarType
//!     int offset;                         // offset 4, byte offset within a row
//!     int count;                          // offset 8, array length (1 for scalars)
//!     bool countAsTime;                   // offset 12, followed by 3 pad bytes
//!     char name[IRSDK_MAX_STRING];        // offset 16, 32 bytes
//!     char desc[IRSDK_MAX_DESC];          // offset 48, 64 bytes
//!     char unit[IRSDK_MAX_STRING];        // offset 112, 32 bytes
//! } irsdk_varHeader;                      // 144 bytes
//! ```
//!
//! [`VariableTable`] is read once per connection or file and is immutable
//! afterwards. Indices into it are stable for the lifetime of the table, so
//! callers resolve a name once and read by index on every row.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace, warn};

use super::header::DataHeader;
use super::layout::{read_c_string, read_i32_le, write_c_string, write_i32_le};
use crate::{Result, TelemetryError, Value, VariableType};

pub const IRSDK_MAX_STRING: usize = 32;
pub const IRSDK_MAX_DESC: usize = 64;
/// Encoded size of one [`VarHeader`] in bytes
pub const VAR_HEADER_SIZE: usize = 144;

const NAME_OFFSET: usize = 16;
const DESC_OFFSET: usize = NAME_OFFSET + IRSDK_MAX_STRING;
const UNIT_OFFSET: usize = DESC_OFFSET + IRSDK_MAX_DESC;

/// Description of one telemetry channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarHeader {
    pub var_type: VariableType,
    /// Byte offset within a sample row
    pub offset: usize,
    /// Number of entries (1 for scalars)
    pub count: usize,
    /// Whether the simulator treats the count as elapsed time
    pub count_as_time: bool,
    pub name: String,
    pub desc: String,
    pub unit: String,
}

impl VarHeader {
    pub fn new(name: impl Into<String>, var_type: VariableType, offset: usize, count: usize) -> Self {
        Self {
            var_type,
            offset,
            count,
            count_as_time: false,
            name: name.into(),
            desc: String::new(),
            unit: String::new(),
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_count_as_time(mut self, count_as_time: bool) -> Self {
        self.count_as_time = count_as_time;
        self
    }

    /// Decode one 144-byte entry.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < VAR_HEADER_SIZE {
            return Err(TelemetryError::Parse {
                context: "Variable header".to_string(),
                details: format!("Need {} bytes, have {}", VAR_HEADER_SIZE, data.len()),
            });
        }

        let raw_type = read_i32_le(data, 0)?;
        let offset = read_i32_le(data, 4)?;
        let count = read_i32_le(data, 8)?;
        let name = read_c_string(&data[NAME_OFFSET..NAME_OFFSET + IRSDK_MAX_STRING]);

        let var_type = VariableType::from_raw(raw_type).ok_or_else(|| TelemetryError::Parse {
            context: "Variable header".to_string(),
            details: format!("Unknown type {} for '{}'", raw_type, name),
        })?;

        if offset < 0 || count < 1 {
            return Err(TelemetryError::Parse {
                context: "Variable header".to_string(),
                details: format!("Invalid offset {} or count {} for '{}'", offset, count, name),
            });
        }

        Ok(Self {
            var_type,
            offset: offset as usize,
            count: count as usize,
            count_as_time: data[12] != 0,
            desc: read_c_string(&data[DESC_OFFSET..DESC_OFFSET + IRSDK_MAX_DESC]),
            unit: read_c_string(&data[UNIT_OFFSET..UNIT_OFFSET + IRSDK_MAX_STRING]),
            name,
        })
    }

    /// Encode into the on-wire layout, truncating overlong strings.
    pub fn encode(&self) -> [u8; VAR_HEADER_SIZE] {
        let mut out = [0u8; VAR_HEADER_SIZE];
        write_i32_le(&mut out, 0, self.var_type.as_raw());
        write_i32_le(&mut out, 4, self.offset as i32);
        write_i32_le(&mut out, 8, self.count as i32);
        out[12] = u8::from(self.count_as_time);
        write_c_string(&mut out[NAME_OFFSET..NAME_OFFSET + IRSDK_MAX_STRING], &self.name);
        write_c_string(&mut out[DESC_OFFSET..DESC_OFFSET + IRSDK_MAX_DESC], &self.desc);
        write_c_string(&mut out[UNIT_OFFSET..UNIT_OFFSET + IRSDK_MAX_STRING], &self.unit);
        out
    }

    /// Bytes this channel occupies in a row.
    pub fn byte_len(&self) -> usize {
        self.var_type.size() * self.count
    }

    /// Row offset of array entry `entry`, or `None` when out of range.
    pub fn entry_offset(&self, entry: usize) -> Option<usize> {
        (entry < self.count).then(|| self.offset + entry * self.var_type.size())
    }

    /// Decode array entry `entry` from `row`.
    pub fn read(&self, row: &[u8], entry: usize) -> Option<Value> {
        let offset = self.entry_offset(entry)?;
        Value::decode(self.var_type, row.get(offset..)?)
    }
}

/// The immutable channel table for one connection or file.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableTable {
    headers: Vec<VarHeader>,
    index: HashMap<String, usize>,
    buf_len: usize,
}

impl VariableTable {
    /// Build a table and check every channel fits within `buf_len`.
    pub fn new(headers: Vec<VarHeader>, buf_len: usize) -> Result<Self> {
        let mut index = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            let end = header.offset + header.byte_len();
            if end > buf_len {
                return Err(TelemetryError::Parse {
                    context: "Variable table".to_string(),
                    details: format!(
                        "'{}' ends at {} beyond row length {}",
                        header.name, end, buf_len
                    ),
                });
            }
            if index.contains_key(&header.name) {
                warn!(name = %header.name, idx, "Duplicate channel name, keeping first");
                continue;
            }
            index.insert(header.name.clone(), idx);
        }
        Ok(Self { headers, index, buf_len })
    }

    /// Lay out `channels` back to back and build the table. Used when
    /// producing rows rather than reading them.
    pub fn from_layout<I, S>(channels: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, VariableType, usize)>,
        S: Into<String>,
    {
        let mut offset = 0;
        let mut headers = Vec::new();
        for (name, var_type, count) in channels {
            let header = VarHeader::new(name, var_type, offset, count.max(1));
            offset += header.byte_len();
            headers.push(header);
        }
        Self::new(headers, offset)
    }

    /// Read `header.num_vars` entries at `header.var_header_offset`.
    pub fn parse_from_reader<R: Read + Seek>(reader: &mut R, header: &DataHeader) -> Result<Self> {
        debug!(num_vars = header.num_vars, offset = header.var_header_offset, "Reading variable table");
        reader.seek(SeekFrom::Start(header.var_header_offset as u64)).map_err(|e| {
            TelemetryError::Parse {
                context: "Variable table seek".to_string(),
                details: format!("Failed to seek to {}: {}", header.var_header_offset, e),
            }
        })?;

        let mut raw = vec![0u8; header.num_vars.max(0) as usize * VAR_HEADER_SIZE];
        reader.read_exact(&mut raw).map_err(|e| TelemetryError::Parse {
            context: "Variable table reading".to_string(),
            details: format!("Failed to read {} variable headers: {}", header.num_vars, e),
        })?;
        Self::parse_entries(&raw, header.buf_len.max(0) as usize)
    }

    /// Parse the table straight out of a mapped segment.
    pub fn parse_from_memory(memory: &[u8], header: &DataHeader) -> Result<Self> {
        header.validate_table_bounds(memory.len() as u64)?;
        let start = header.var_header_offset as usize;
        let end = header.var_table_end() as usize;
        Self::parse_entries(&memory[start..end], header.buf_len.max(0) as usize)
    }

    /// Decode back-to-back 144-byte entries.
    pub fn parse_entries(raw: &[u8], buf_len: usize) -> Result<Self> {
        let headers = raw
            .chunks_exact(VAR_HEADER_SIZE)
            .enumerate()
            .map(|(idx, chunk)| {
                trace!(idx, "Parsing variable header");
                VarHeader::parse(chunk)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(headers, buf_len)
    }

    /// Encode every entry back to back.
    pub fn encode(&self) -> Vec<u8> {
        self.headers.iter().flat_map(|h| h.encode()).collect()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Size in bytes of one row.
    pub fn buf_len(&self) -> usize {
        self.buf_len
    }

    pub fn headers(&self) -> &[VarHeader] {
        &self.headers
    }

    pub fn get(&self, idx: usize) -> Option<&VarHeader> {
        self.headers.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&VarHeader> {
        self.index_of(name).and_then(|idx| self.get(idx))
    }

    /// Decode `entry` of channel `idx` from `row`.
    pub fn read_value(&self, row: &[u8], idx: usize, entry: usize) -> Option<Value> {
        self.get(idx)?.read(row, entry)
    }
}
