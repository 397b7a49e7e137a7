//! Remote-control messages sent to the sim.
//!
//! The sim listens for a registered window message (`IRSDK_BROADCASTMSG`)
//! carrying three small integers: the message id and a 16-bit argument
//! packed into `wParam`, and a 32-bit argument in `lParam`. Some commands
//! pack two 16-bit values into `lParam` as well. Delivery is fire and forget;
//! nothing reports whether the sim acted on a command.
//!
//! ```
//! use paddock::broadcast::{BroadcastCommand, PitCommand};
//!
//! let msg = BroadcastCommand::Pit(PitCommand::Fuel(20)).encode();
//! assert_eq!(msg.wparam(), 9 | (2 << 16));
//! assert_eq!(msg.lparam(), 20);
//! ```

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, FromRepr};

/// Name the broadcast window message is registered under.
pub const BROADCAST_MESSAGE_NAME: &str = "IRSDK_BROADCASTMSG";

/// `irsdk_BroadcastMsg`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[repr(u16)]
pub enum BroadcastMsg {
    CamSwitchPos = 0,
    CamSwitchNum = 1,
    CamSetState = 2,
    ReplaySetPlaySpeed = 3,
    ReplaySetPlayPosition = 4,
    ReplaySearch = 5,
    ReplaySetState = 6,
    ReloadTextures = 7,
    ChatCommand = 8,
    PitCommand = 9,
    TelemCommand = 10,
    FfbCommand = 11,
    ReplaySearchSessionTime = 12,
    VideoCapture = 13,
}

/// Camera target: a specific car (by position or number) or one of the
/// sim's automatic targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraFocus {
    Incident,
    Leader,
    Exiting,
    /// Race position for `CamSwitchPos`, car number for `CamSwitchNum`
    Car(u16),
}

impl CameraFocus {
    pub fn raw(self) -> i16 {
        match self {
            CameraFocus::Incident => -3,
            CameraFocus::Leader => -2,
            CameraFocus::Exiting => -1,
            CameraFocus::Car(n) => n as i16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ReplayPositionMode {
    Begin = 0,
    Current = 1,
    End = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ReplaySearchMode {
    ToStart = 0,
    ToEnd = 1,
    PrevSession = 2,
    NextSession = 3,
    PrevLap = 4,
    NextLap = 5,
    PrevFrame = 6,
    NextFrame = 7,
    PrevIncident = 8,
    NextIncident = 9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ReplayStateMode {
    EraseTape = 0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatCommand {
    /// Run chat macro 1-15
    Macro(u8),
    BeginChat,
    Reply,
    Cancel,
}

/// Pit service requests. Pressures are kPa and fuel is litres; zero keeps
/// the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PitCommand {
    Clear,
    Windshield,
    Fuel(i32),
    LeftFront(i32),
    RightFront(i32),
    LeftRear(i32),
    RightRear(i32),
    ClearTires,
    FastRepair,
    ClearWindshield,
    ClearFastRepair,
    ClearFuel,
    TireCompound(i32),
}

impl PitCommand {
    fn mode_and_arg(self) -> (u16, i32) {
        match self {
            PitCommand::Clear => (0, 0),
            PitCommand::Windshield => (1, 0),
            PitCommand::Fuel(litres) => (2, litres),
            PitCommand::LeftFront(kpa) => (3, kpa),
            PitCommand::RightFront(kpa) => (4, kpa),
            PitCommand::LeftRear(kpa) => (5, kpa),
            PitCommand::RightRear(kpa) => (6, kpa),
            PitCommand::ClearTires => (7, 0),
            PitCommand::FastRepair => (8, 0),
            PitCommand::ClearWindshield => (9, 0),
            PitCommand::ClearFastRepair => (10, 0),
            PitCommand::ClearFuel => (11, 0),
            PitCommand::TireCompound(compound) => (12, compound),
        }
    }
}

/// Disk telemetry recording control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum TelemetryCommand {
    Stop = 0,
    Start = 1,
    Restart = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum VideoCaptureMode {
    ScreenShot = 0,
    Start = 1,
    End = 2,
    Toggle = 3,
    ShowTimer = 4,
    HideTimer = 5,
}

/// A command for the sim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BroadcastCommand {
    CamSwitchPos { position: CameraFocus, group: u16, camera: u16 },
    CamSwitchNum { car_number: CameraFocus, group: u16, camera: u16 },
    /// `camera_state` bits
    CamSetState(u32),
    ReplaySetPlaySpeed { speed: i16, slow_motion: bool },
    ReplaySetPlayPosition { mode: ReplayPositionMode, frame: i32 },
    ReplaySearch(ReplaySearchMode),
    ReplaySetState(ReplayStateMode),
    ReloadAllTextures,
    ReloadCarTextures { car_idx: i32 },
    Chat(ChatCommand),
    Pit(PitCommand),
    Telemetry(TelemetryCommand),
    /// Force feedback maximum force in Nm, sent as 16.16 fixed point
    FfbMaxForce(f32),
    ReplaySearchSessionTime { session_num: u16, session_time_ms: i32 },
    VideoCapture(VideoCaptureMode),
}

impl BroadcastCommand {
    pub fn message_id(&self) -> BroadcastMsg {
        match self {
            BroadcastCommand::CamSwitchPos { .. } => BroadcastMsg::CamSwitchPos,
            BroadcastCommand::CamSwitchNum { .. } => BroadcastMsg::CamSwitchNum,
            BroadcastCommand::CamSetState(_) => BroadcastMsg::CamSetState,
            BroadcastCommand::ReplaySetPlaySpeed { .. } => BroadcastMsg::ReplaySetPlaySpeed,
            BroadcastCommand::ReplaySetPlayPosition { .. } => BroadcastMsg::ReplaySetPlayPosition,
            BroadcastCommand::ReplaySearch(_) => BroadcastMsg::ReplaySearch,
            BroadcastCommand::ReplaySetState(_) => BroadcastMsg::ReplaySetState,
            BroadcastCommand::ReloadAllTextures | BroadcastCommand::ReloadCarTextures { .. } => {
                BroadcastMsg::ReloadTextures
            }
            BroadcastCommand::Chat(_) => BroadcastMsg::ChatCommand,
            BroadcastCommand::Pit(_) => BroadcastMsg::PitCommand,
            BroadcastCommand::Telemetry(_) => BroadcastMsg::TelemCommand,
            BroadcastCommand::FfbMaxForce(_) => BroadcastMsg::FfbCommand,
            BroadcastCommand::ReplaySearchSessionTime { .. } => {
                BroadcastMsg::ReplaySearchSessionTime
            }
            BroadcastCommand::VideoCapture(_) => BroadcastMsg::VideoCapture,
        }
    }

    /// Pack into the three fields of the window message.
    pub fn encode(&self) -> BroadcastMessage {
        let (var1, var2): (u16, i32) = match *self {
            BroadcastCommand::CamSwitchPos { position, group, camera } => {
                (position.raw() as u16, make_long(group, camera))
            }
            BroadcastCommand::CamSwitchNum { car_number, group, camera } => {
                (car_number.raw() as u16, make_long(group, camera))
            }
            BroadcastCommand::CamSetState(state) => (state as u16, 0),
            BroadcastCommand::ReplaySetPlaySpeed { speed, slow_motion } => {
                (speed as u16, i32::from(slow_motion))
            }
            BroadcastCommand::ReplaySetPlayPosition { mode, frame } => (mode as u16, frame),
            BroadcastCommand::ReplaySearch(mode) => (mode as u16, 0),
            BroadcastCommand::ReplaySetState(mode) => (mode as u16, 0),
            BroadcastCommand::ReloadAllTextures => (0, 0),
            BroadcastCommand::ReloadCarTextures { car_idx } => (1, car_idx),
            BroadcastCommand::Chat(chat) => match chat {
                // macros are numbered from 1 for users, from 0 on the wire
                ChatCommand::Macro(n) => (0, i32::from(n.saturating_sub(1))),
                ChatCommand::BeginChat => (1, 0),
                ChatCommand::Reply => (2, 0),
                ChatCommand::Cancel => (3, 0),
            },
            BroadcastCommand::Pit(pit) => pit.mode_and_arg(),
            BroadcastCommand::Telemetry(cmd) => (cmd as u16, 0),
            BroadcastCommand::FfbMaxForce(force) => (0, (force * 65536.0) as i32),
            BroadcastCommand::ReplaySearchSessionTime { session_num, session_time_ms } => {
                (session_num, session_time_ms)
            }
            BroadcastCommand::VideoCapture(mode) => (mode as u16, 0),
        };
        BroadcastMessage { msg: self.message_id() as u16, var1, var2 }
    }
}

/// The raw message as posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub msg: u16,
    pub var1: u16,
    pub var2: i32,
}

impl BroadcastMessage {
    /// `MAKELONG(msg, var1)`
    pub fn wparam(&self) -> u32 {
        make_long(self.msg, self.var1) as u32
    }

    pub fn lparam(&self) -> i32 {
        self.var2
    }

    /// Inverse of [`wparam`](Self::wparam)/[`lparam`](Self::lparam).
    pub fn from_params(wparam: u32, lparam: i32) -> Self {
        Self { msg: (wparam & 0xFFFF) as u16, var1: (wparam >> 16) as u16, var2: lparam }
    }

    pub fn message_id(&self) -> Option<BroadcastMsg> {
        BroadcastMsg::from_repr(self.msg)
    }
}

/// `MAKELONG(low, high)`
pub fn make_long(low: u16, high: u16) -> i32 {
    (u32::from(low) | (u32::from(high) << 16)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn message_ids_are_dense() {
        for (idx, msg) in BroadcastMsg::iter().enumerate() {
            assert_eq!(msg as usize, idx);
            assert_eq!(BroadcastMsg::from_repr(idx as u16), Some(msg));
        }
        assert_eq!(BroadcastMsg::from_repr(14), None);
    }

    #[test]
    fn camera_switch_packs_group_and_camera() {
        let msg = BroadcastCommand::CamSwitchPos {
            position: CameraFocus::Leader,
            group: 4,
            camera: 2,
        }
        .encode();
        assert_eq!(msg.msg, 0);
        assert_eq!(msg.var1 as i16, -2);
        assert_eq!(msg.var2, 4 | (2 << 16));
        assert_eq!(msg.wparam(), 0xFFFE_0000);

        let msg = BroadcastCommand::CamSwitchNum {
            car_number: CameraFocus::Car(42),
            group: 1,
            camera: 0,
        }
        .encode();
        assert_eq!((msg.msg, msg.var1, msg.var2), (1, 42, 1));
    }

    #[test]
    fn ffb_force_is_fixed_point() {
        let msg = BroadcastCommand::FfbMaxForce(2.5).encode();
        assert_eq!(msg.msg, BroadcastMsg::FfbCommand as u16);
        assert_eq!(msg.var1, 0);
        assert_eq!(msg.var2, 163_840);
    }

    #[test]
    fn pit_and_chat_modes() {
        assert_eq!(BroadcastCommand::Pit(PitCommand::Clear).encode().var1, 0);
        let msg = BroadcastCommand::Pit(PitCommand::RightRear(180)).encode();
        assert_eq!((msg.var1, msg.var2), (6, 180));
        assert_eq!(BroadcastCommand::Pit(PitCommand::TireCompound(1)).encode().var1, 12);

        let msg = BroadcastCommand::Chat(ChatCommand::Macro(3)).encode();
        assert_eq!((msg.msg, msg.var1, msg.var2), (8, 0, 2));
        assert_eq!(BroadcastCommand::Chat(ChatCommand::Cancel).encode().var1, 3);
    }

    #[test]
    fn replay_commands() {
        let msg = BroadcastCommand::ReplaySetPlaySpeed { speed: -4, slow_motion: true }.encode();
        assert_eq!((msg.var1 as i16, msg.var2), (-4, 1));

        let msg = BroadcastCommand::ReplaySetPlayPosition {
            mode: ReplayPositionMode::End,
            frame: 1200,
        }
        .encode();
        assert_eq!((msg.msg, msg.var1, msg.var2), (4, 2, 1200));

        let msg = BroadcastCommand::ReplaySearch(ReplaySearchMode::NextIncident).encode();
        assert_eq!((msg.msg, msg.var1), (5, 9));

        let msg = BroadcastCommand::ReplaySearchSessionTime {
            session_num: 2,
            session_time_ms: 90_000,
        }
        .encode();
        assert_eq!((msg.msg, msg.var1, msg.var2), (12, 2, 90_000));
    }

    #[test]
    fn params_round_trip() {
        let msg = BroadcastCommand::VideoCapture(VideoCaptureMode::Toggle).encode();
        assert_eq!(BroadcastMessage::from_params(msg.wparam(), msg.lparam()), msg);
        assert_eq!(msg.message_id(), Some(BroadcastMsg::VideoCapture));
    }
}
