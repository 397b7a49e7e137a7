//! Canonical channel names published by the sim.

use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// Compile-time known channel names. Each variant converts to the exact
/// string the sim uses in its variable table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum KnownVar {
    // session
    SessionTime,
    SessionTick,
    SessionNum,
    SessionState,
    #[strum(serialize = "SessionUniqueID")]
    SessionUniqueId,
    SessionFlags,
    SessionTimeRemain,
    SessionLapsRemain,
    SessionLapsRemainEx,
    SessionTimeOfDay,
    PaceMode,
    PlayerCarIdx,
    PlayerCarPosition,
    PlayerCarClassPosition,
    PlayerCarMyIncidentCount,
    IsOnTrack,
    IsOnTrackCar,
    IsReplayPlaying,
    ReplayFrameNum,
    ReplayFrameNumEnd,
    IsDiskLoggingEnabled,
    IsDiskLoggingActive,

    // per car arrays
    CarIdxLap,
    CarIdxLapCompleted,
    CarIdxLapDistPct,
    CarIdxPosition,
    CarIdxClassPosition,
    CarIdxOnPitRoad,
    CarIdxTrackSurface,
    CarIdxPaceFlags,
    CarIdxSessionFlags,
    CarIdxEstTime,
    CarIdxLastLapTime,
    CarIdxBestLapTime,
    CarIdxGear,
    #[strum(serialize = "CarIdxRPM")]
    CarIdxRpm,
    CarIdxSteer,

    // player car
    OnPitRoad,
    Speed,
    #[strum(serialize = "RPM")]
    Rpm,
    Gear,
    Throttle,
    Brake,
    Clutch,
    SteeringWheelAngle,
    FuelLevel,
    FuelLevelPct,
    FuelUsePerHour,
    Lap,
    LapCompleted,
    LapDist,
    LapDistPct,
    LapCurrentLapTime,
    LapLastLapTime,
    LapBestLapTime,
    LapDeltaToBestLap,
    EngineWarnings,
    WaterTemp,
    OilTemp,
    Voltage,
    LatAccel,
    LongAccel,
    VertAccel,
    Yaw,
    Pitch,
    Roll,
    ShiftIndicatorPct,

    // environment and camera
    AirTemp,
    TrackTempCrew,
    CamCarIdx,
    CamCameraNumber,
    CamGroupNumber,
    CamCameraState,
}

impl KnownVar {
    /// The exact channel name as it appears in the variable table.
    pub fn name(self) -> &'static str {
        self.into()
    }
}
