//! Telemetry variable type definitions

use serde::{Deserialize, Serialize};

/// Channel storage types.
/// Maps to iRacing SDK's irsdk_VarType enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum VariableType {
    /// 8-bit character (irsdk_char)
    Char = 0,
    /// Boolean stored in one byte (irsdk_bool)
    Bool = 1,
    /// 32-bit signed integer (irsdk_int)
    Int = 2,
    /// 32-bit bitfield (irsdk_bitField)
    Bitmask = 3,
    /// 32-bit floating point (irsdk_float)
    Float = 4,
    /// 64-bit floating point (irsdk_double)
    Double = 5,
}

impl VariableType {
    /// Returns the size in bytes of this data type.
    /// Matches the irsdk_VarTypeBytes array from the iRacing SDK.
    pub const fn size(&self) -> usize {
        match self {
            VariableType::Char | VariableType::Bool => 1,
            VariableType::Int | VariableType::Bitmask | VariableType::Float => 4,
            VariableType::Double => 8,
        }
    }

    /// Map the raw irsdk_VarType value stored in a var header.
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(VariableType::Char),
            1 => Some(VariableType::Bool),
            2 => Some(VariableType::Int),
            3 => Some(VariableType::Bitmask),
            4 => Some(VariableType::Float),
            5 => Some(VariableType::Double),
            _ => None,
        }
    }

    /// Raw irsdk_VarType value.
    pub const fn as_raw(&self) -> i32 {
        *self as i32
    }

    pub const fn is_floating(&self) -> bool {
        matches!(self, VariableType::Float | VariableType::Double)
    }
}

/// One decoded channel entry, still in its stored type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Char(u8),
    Bool(bool),
    Int(i32),
    Bitmask(u32),
    Float(f32),
    Double(f64),
}

impl Value {
    /// Decode one entry of `var_type` from the start of `bytes` (little-endian).
    pub fn decode(var_type: VariableType, bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..var_type.size())?;
        Some(match var_type {
            VariableType::Char => Value::Char(raw[0]),
            VariableType::Bool => Value::Bool(raw[0] != 0),
            VariableType::Int => Value::Int(i32::from_le_bytes(raw.try_into().ok()?)),
            VariableType::Bitmask => Value::Bitmask(u32::from_le_bytes(raw.try_into().ok()?)),
            VariableType::Float => Value::Float(f32::from_le_bytes(raw.try_into().ok()?)),
            VariableType::Double => Value::Double(f64::from_le_bytes(raw.try_into().ok()?)),
        })
    }

    /// Encode this value into `out` using its natural width.
    pub fn encode(&self, out: &mut [u8]) -> bool {
        let bytes: Vec<u8> = match *self {
            Value::Char(v) => vec![v],
            Value::Bool(v) => vec![u8::from(v)],
            Value::Int(v) => v.to_le_bytes().to_vec(),
            Value::Bitmask(v) => v.to_le_bytes().to_vec(),
            Value::Float(v) => v.to_le_bytes().to_vec(),
            Value::Double(v) => v.to_le_bytes().to_vec(),
        };
        match out.get_mut(..bytes.len()) {
            Some(dst) => {
                dst.copy_from_slice(&bytes);
                true
            }
            None => false,
        }
    }

    pub fn var_type(&self) -> VariableType {
        match self {
            Value::Char(_) => VariableType::Char,
            Value::Bool(_) => VariableType::Bool,
            Value::Int(_) => VariableType::Int,
            Value::Bitmask(_) => VariableType::Bitmask,
            Value::Float(_) => VariableType::Float,
            Value::Double(_) => VariableType::Double,
        }
    }
}
