//! BitField type for handling iRacing bitfield variables

use serde::{Deserialize, Serialize};

use super::irsdk_flags::{engine_warnings, session_flags};

/// BitField type for handling iRacing bitfield variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitField(pub u32);

impl BitField {
    /// Create a new BitField from a u32 value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Check if a specific bit is set.
    pub fn is_set(&self, bit: u32) -> bool {
        bit < 32 && (self.0 & (1 << bit)) != 0
    }

    /// Check if any bit of `flag` is set.
    pub fn has_flag(&self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Get the raw u32 value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for BitField {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Convenience: check if EngineWarnings indicate mandatory repair needed
pub fn engine_mandatory_repair_needed(bits: BitField) -> bool {
    bits.has_flag(engine_warnings::MAND_REP_NEEDED)
}

/// Convenience: check if EngineWarnings indicate optional repair needed
pub fn engine_optional_repair_needed(bits: BitField) -> bool {
    bits.has_flag(engine_warnings::OPT_REP_NEEDED)
}

/// Convenience: check if SessionFlags indicate disqualification scoring invalid
pub fn session_dq_scoring_invalid(flags: BitField) -> bool {
    flags.has_flag(session_flags::DQ_SCORING_INVALID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bitfield_flag_operations_basic() {
        let bitfield = BitField::new(0b1010);
        assert!(bitfield.is_set(1));
        assert!(!bitfield.is_set(0));
        assert!(bitfield.is_set(3));
        assert!(!bitfield.is_set(40));
        assert!(bitfield.has_flag(0b0010));
        assert!(!bitfield.has_flag(0b0101));
    }

    #[test]
    fn repair_helpers() {
        let flags = BitField::new(engine_warnings::MAND_REP_NEEDED | engine_warnings::OPT_REP_NEEDED);
        assert!(engine_mandatory_repair_needed(flags));
        assert!(engine_optional_repair_needed(flags));
        assert!(!engine_mandatory_repair_needed(BitField::default()));
        assert!(session_dq_scoring_invalid(BitField::new(session_flags::DQ_SCORING_INVALID)));
    }

    proptest! {
        #[test]
        fn has_flag_matches_single_bits(value in any::<u32>(), bit in 0..32u32) {
            let bitfield = BitField::new(value);
            let expected = (value & (1 << bit)) != 0;
            prop_assert_eq!(bitfield.is_set(bit), expected);
            prop_assert_eq!(bitfield.has_flag(1 << bit), expected);
        }
    }
}
