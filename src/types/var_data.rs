//! Numeric coercion from a channel's stored type to the type a caller asks for.
//!
//! Reads never fail on a type mismatch. A `Float` channel read as `i32`
//! truncates toward zero, and a `bool` read tests `>= 1.0` for floating
//! channels but non-zero for integer and char channels. The asymmetric
//! threshold matches what existing overlays and scripts expect from the sim.

use super::{BitField, Value, VariableType};

/// Types a decoded [`Value`] can be coerced into.
pub trait VarData: Sized {
    /// Coerce a value of any stored type into `Self`.
    fn from_value(value: Value) -> Self;
}

impl VarData for bool {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Char(v) => v != 0,
            Value::Bool(v) => v,
            Value::Int(v) => v != 0,
            Value::Bitmask(v) => v != 0,
            Value::Float(v) => v >= 1.0,
            Value::Double(v) => v >= 1.0,
        }
    }
}

impl VarData for i32 {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Char(v) => i32::from(v),
            Value::Bool(v) => i32::from(v),
            Value::Int(v) => v,
            Value::Bitmask(v) => v as i32,
            Value::Float(v) => v as i32,
            Value::Double(v) => v as i32,
        }
    }
}

impl VarData for f32 {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Char(v) => f32::from(v),
            Value::Bool(v) => f32::from(u8::from(v)),
            Value::Int(v) => v as f32,
            Value::Bitmask(v) => v as f32,
            Value::Float(v) => v,
            Value::Double(v) => v as f32,
        }
    }
}

impl VarData for f64 {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Char(v) => f64::from(v),
            Value::Bool(v) => f64::from(u8::from(v)),
            Value::Int(v) => f64::from(v),
            Value::Bitmask(v) => f64::from(v),
            Value::Float(v) => f64::from(v),
            Value::Double(v) => v,
        }
    }
}

impl VarData for u32 {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Bitmask(v) => v,
            Value::Int(v) => v as u32,
            other => i32::from_value(other) as u32,
        }
    }
}

impl VarData for BitField {
    fn from_value(value: Value) -> Self {
        BitField(u32::from_value(value))
    }
}

impl Value {
    /// Convert to `var_type` using the same coercion rules as the typed reads.
    pub fn coerce_to(self, var_type: VariableType) -> Value {
        match var_type {
            VariableType::Char => Value::Char(i32::from_value(self) as u8),
            VariableType::Bool => Value::Bool(bool::from_value(self)),
            VariableType::Int => Value::Int(i32::from_value(self)),
            VariableType::Bitmask => Value::Bitmask(u32::from_value(self)),
            VariableType::Float => Value::Float(f32::from_value(self)),
            VariableType::Double => Value::Double(f64::from_value(self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn float_reads_truncate_and_use_unit_threshold() {
        let v = Value::Float(2.7);
        assert_eq!(i32::from_value(v), 2);
        assert!(bool::from_value(v));
        assert!((f64::from_value(v) - 2.7).abs() < 1e-6);

        assert!(!bool::from_value(Value::Float(0.99)));
        assert!(!bool::from_value(Value::Double(0.5)));
        assert!(bool::from_value(Value::Double(1.0)));
        assert_eq!(i32::from_value(Value::Double(-3.9)), -3);
    }

    #[test]
    fn integer_bool_reads_test_non_zero() {
        assert!(bool::from_value(Value::Int(-1)));
        assert!(bool::from_value(Value::Char(1)));
        assert!(bool::from_value(Value::Bitmask(0x8000_0000)));
        assert!(!bool::from_value(Value::Int(0)));
    }

    #[test]
    fn bitmask_reinterprets_bits() {
        assert_eq!(i32::from_value(Value::Bitmask(0xFFFF_FFFF)), -1);
        assert_eq!(BitField::from_value(Value::Int(-1)).value(), u32::MAX);
        assert_eq!(u32::from_value(Value::Float(3.2)), 3);
    }

    #[test]
    fn coerce_to_matches_channel_type() {
        assert_eq!(Value::Float(3.9).coerce_to(VariableType::Int), Value::Int(3));
        assert_eq!(Value::Int(2).coerce_to(VariableType::Double), Value::Double(2.0));
        assert_eq!(Value::Double(0.4).coerce_to(VariableType::Bool), Value::Bool(false));
        assert_eq!(Value::Int(7).coerce_to(VariableType::Bitmask), Value::Bitmask(7));
    }

    proptest! {
        #[test]
        fn float_coercions_are_consistent(value in -1.0e6f32..1.0e6f32) {
            let v = Value::Float(value);
            prop_assert_eq!(i32::from_value(v), value.trunc() as i32);
            prop_assert_eq!(bool::from_value(v), value >= 1.0);
            prop_assert_eq!(f64::from_value(v), f64::from(value));
            prop_assert_eq!(f32::from_value(v), value);
        }

        #[test]
        fn int_coercions_are_consistent(value in any::<i32>()) {
            let v = Value::Int(value);
            prop_assert_eq!(i32::from_value(v), value);
            prop_assert_eq!(bool::from_value(v), value != 0);
            prop_assert_eq!(f64::from_value(v), f64::from(value));
        }

        #[test]
        fn decoded_bytes_coerce_like_values(value in any::<i32>()) {
            let bytes = value.to_le_bytes();
            let decoded = Value::decode(VariableType::Int, &bytes).unwrap();
            prop_assert_eq!(decoded, Value::Int(value));
            let as_mask = Value::decode(VariableType::Bitmask, &bytes).unwrap();
            prop_assert_eq!(i32::from_value(as_mask), value);
        }
    }
}
