//! Little-endian field access shared by the fixed-size layout types.

use crate::{Result, TelemetryError};

pub(crate) fn read_i32_le(data: &[u8], offset: usize) -> Result<i32> {
    let bytes = field(data, offset, 4, "i32")?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn read_i64_le(data: &[u8], offset: usize) -> Result<i64> {
    let bytes = field(data, offset, 8, "i64")?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(i64::from_le_bytes(raw))
}

pub(crate) fn read_f64_le(data: &[u8], offset: usize) -> Result<f64> {
    let bytes = field(data, offset, 8, "f64")?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(f64::from_le_bytes(raw))
}

pub(crate) fn write_i32_le(out: &mut [u8], offset: usize, value: i32) {
    out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_i64_le(out: &mut [u8], offset: usize, value: i64) {
    out[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_f64_le(out: &mut [u8], offset: usize, value: f64) {
    out[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Decode a NUL-terminated fixed-width C string, replacing invalid UTF-8.
pub(crate) fn read_c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Encode into a fixed-width C string field. Overlong values are truncated so
/// that the last byte always stays NUL.
pub(crate) fn write_c_string(out: &mut [u8], value: &str) {
    out.fill(0);
    let max = out.len().saturating_sub(1);
    let mut len = value.len().min(max);
    while !value.is_char_boundary(len) {
        len -= 1;
    }
    out[..len].copy_from_slice(&value.as_bytes()[..len]);
}

fn field<'a>(data: &'a [u8], offset: usize, width: usize, what: &str) -> Result<&'a [u8]> {
    data.get(offset..offset + width).ok_or_else(|| TelemetryError::Parse {
        context: format!("{} field", what),
        details: format!(
            "Insufficient data at offset {} (need {} bytes, have {})",
            offset,
            width,
            data.len().saturating_sub(offset)
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_strings_truncate_on_char_boundaries() {
        let mut out = [0xFFu8; 6];
        write_c_string(&mut out, "ab\u{e9}cd");
        // 'é' is two bytes; five usable bytes fit "abé" plus 'c'
        assert_eq!(read_c_string(&out), "ab\u{e9}c");
        assert_eq!(out[5], 0);

        let mut out = [0u8; 4];
        write_c_string(&mut out, "a\u{e9}\u{e9}");
        assert_eq!(read_c_string(&out), "a\u{e9}");
    }

    #[test]
    fn short_reads_are_parse_errors() {
        let data = [0u8; 6];
        assert!(read_i32_le(&data, 4).is_err());
        assert!(read_f64_le(&data, 0).is_err());
        assert_eq!(read_i32_le(&data, 2).ok(), Some(0));
    }
}
