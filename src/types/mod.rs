//! Core types for telemetry data representation.
//!
//! The type system maps directly to iRacing SDK structures:
//! - [`VariableType`] maps to iRacing's `irsdk_VarType` enum with size information
//! - [`Value`] is one decoded channel entry in its stored type
//! - [`VarData`] coerces a [`Value`] into the type a caller asks for
//! - [`BitField`] handles iRacing's bitfield variables with flag operations
//! - [`KnownVar`] names the channels the crate itself relies on
//! - [`Sample`] is an owned copy of one row
//!
//! ```rust
//! use paddock::{Value, VarData, VariableType};
//!
//! let bytes = 2.7f32.to_le_bytes();
//! let value = Value::decode(VariableType::Float, &bytes).unwrap();
//! assert_eq!(i32::from_value(value), 2);
//! assert!(bool::from_value(value));
//! ```

mod bitfield;
pub mod irsdk_flags;
mod known_var;
mod sample;
mod update_rate;
mod var_data;
mod variable_type;

pub use bitfield::{
    BitField, engine_mandatory_repair_needed, engine_optional_repair_needed,
    session_dq_scoring_invalid,
};
pub use known_var::KnownVar;
pub use sample::Sample;
pub use update_rate::UpdateRate;
pub use var_data::VarData;
pub use variable_type::{Value, VariableType};
