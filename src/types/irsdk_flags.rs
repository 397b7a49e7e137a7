//! Constants and helpers for interpreting IRSDK bitfields
//!
//! Flag constants for SessionFlags, EngineWarnings, PaceFlags and CamCameraState.
//!
//! [`is_flag_set`] and [`is_pace_flag_set`] reproduce the historical helpers
//! bit for bit, including their precedence quirk: they evaluate
//! `flag & (mask > 0)`, so they only ever look at bit 0 of `flag` and ignore
//! which mask was asked for. Code that wants a real mask test should use
//! [`BitField::has_flag`](super::BitField::has_flag).

/// `irsdk_Flags`
pub mod session_flags {
    // global flags
    pub const CHECKERED: u32 = 0x0000_0001;
    pub const WHITE: u32 = 0x0000_0002;
    pub const GREEN: u32 = 0x0000_0004;
    pub const YELLOW: u32 = 0x0000_0008;
    pub const RED: u32 = 0x0000_0010;
    pub const BLUE: u32 = 0x0000_0020;
    pub const DEBRIS: u32 = 0x0000_0040;
    pub const CROSSED: u32 = 0x0000_0080;
    pub const YELLOW_WAVING: u32 = 0x0000_0100;
    pub const ONE_LAP_TO_GREEN: u32 = 0x0000_0200;
    pub const GREEN_HELD: u32 = 0x0000_0400;
    pub const TEN_TO_GO: u32 = 0x0000_0800;
    pub const FIVE_TO_GO: u32 = 0x0000_1000;
    pub const RANDOM_WAVING: u32 = 0x0000_2000;
    pub const CAUTION: u32 = 0x0000_4000;
    pub const CAUTION_WAVING: u32 = 0x0000_8000;

    // drivers black flags
    pub const BLACK: u32 = 0x0001_0000;
    pub const DISQUALIFY: u32 = 0x0002_0000;
    pub const SERVICIBLE: u32 = 0x0004_0000;
    pub const FURLED: u32 = 0x0008_0000;
    pub const REPAIR: u32 = 0x0010_0000;
    pub const DQ_SCORING_INVALID: u32 = 0x0020_0000;

    // start lights
    pub const START_HIDDEN: u32 = 0x1000_0000;
    pub const START_READY: u32 = 0x2000_0000;
    pub const START_SET: u32 = 0x4000_0000;
    pub const START_GO: u32 = 0x8000_0000;
}

/// `irsdk_EngineWarnings`
pub mod engine_warnings {
    pub const WATER_TEMP_WARNING: u32 = 0x0001;
    pub const FUEL_PRESSURE_WARNING: u32 = 0x0002;
    pub const OIL_PRESSURE_WARNING: u32 = 0x0004;
    pub const ENGINE_STALLED: u32 = 0x0008;
    pub const PIT_SPEED_LIMITER: u32 = 0x0010;
    pub const REV_LIMITER_ACTIVE: u32 = 0x0020;
    pub const OIL_TEMP_WARNING: u32 = 0x0040;
    pub const MAND_REP_NEEDED: u32 = 0x0080;
    pub const OPT_REP_NEEDED: u32 = 0x0100;
}

/// `irsdk_PaceFlags`
pub mod pace_flags {
    pub const END_OF_LINE: u32 = 0x01;
    pub const FREE_PASS: u32 = 0x02;
    pub const WAVED_AROUND: u32 = 0x04;
}

/// `irsdk_CameraState`
pub mod camera_state {
    pub const IS_SESSION_SCREEN: u32 = 0x0001;
    pub const IS_SCENIC_ACTIVE: u32 = 0x0002;
    pub const CAM_TOOL_ACTIVE: u32 = 0x0004;
    pub const UI_HIDDEN: u32 = 0x0008;
    pub const USE_AUTO_SHOT_SELECTION: u32 = 0x0010;
    pub const USE_TEMPORARY_EDITS: u32 = 0x0020;
    pub const USE_KEY_ACCELERATION: u32 = 0x0040;
    pub const USE_KEY_10X_ACCELERATION: u32 = 0x0080;
    pub const USE_MOUSE_AIM_MODE: u32 = 0x0100;
}

/// Legacy session-flag test. Evaluates `flag & (mask > 0)`.
pub fn is_flag_set(flag: u32, mask: u32) -> bool {
    flag & u32::from(mask > 0) != 0
}

/// Legacy pace-flag test. Evaluates `flag & (mask > 0)`.
pub fn is_pace_flag_set(flag: u32, mask: u32) -> bool {
    flag & u32::from(mask > 0) != 0
}
