//! # Session info
//!
//! The sim publishes a YAML document next to the telemetry rows describing
//! the weekend: track and weather, the session list with running results,
//! the entry list, cameras, radios, sector splits and the car setup. It
//! changes rarely (a few times per session) and every change replaces the
//! whole document.
//!
//! [`SessionInfoMessage`] is the typed tree for that document. Key names are
//! the sim's own PascalCase names and must not change. Every field is
//! optional; unknown keys are ignored, except under `CarSetup` where they are
//! kept as raw YAML values since setup sheets differ per car.
//!
//! The sim's YAML is not always valid (unquoted driver names containing `'`
//! or `:`, stray control bytes), so it goes through
//! [`preprocess_iracing_yaml`](crate::yaml_utils::preprocess_iracing_yaml)
//! in [`YamlSessionInfoParser`] before serde sees it.
//!
//! ```
//! use paddock::{SessionInfoParser, YamlSessionInfoParser};
//!
//! let yaml = "WeekendInfo:\n  TrackName: spa\n  TrackID: 163\n";
//! let info = YamlSessionInfoParser::new().parse(yaml).unwrap();
//! assert_eq!(info.weekend_info.unwrap().track_id, Some(163));
//! ```

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

pub mod camera;
pub mod car_setup;
pub mod driver;
pub mod parser;
pub mod radio;
pub mod session_data;
pub mod timing;
pub mod weekend;

pub use camera::{Camera, CameraGroup, CameraInfo};
pub use car_setup::{BrakesDriveUnit, CarSetup, Chassis, SetupValue, TiresAero};
pub use driver::{Driver, DriverInfo, DriverTire};
pub use parser::{SessionInfoParser, YamlSessionInfoParser};
pub use radio::{Frequency, Radio, RadioInfo};
pub use session_data::{
    QualifyResultsInfo, ResultsFastestLap, ResultsPosition, Session, SessionInfo, SessionResult,
};
pub use timing::{Sector, SplitTimeInfo};
pub use weekend::{TelemetryOptions, WeekendInfo, WeekendOptions};

use crate::Result;

/// The whole session document.
#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct SessionInfoMessage {
    pub weekend_info: Option<WeekendInfo>,
    pub session_info: Option<SessionInfo>,
    pub qualify_results_info: Option<QualifyResultsInfo>,
    pub camera_info: Option<CameraInfo>,
    pub radio_info: Option<RadioInfo>,
    pub driver_info: Option<DriverInfo>,
    pub split_time_info: Option<SplitTimeInfo>,
    pub car_setup: Option<CarSetup>,
}

impl SessionInfoMessage {
    /// Deserialize already-clean YAML. Use a [`SessionInfoParser`] for text
    /// straight from the sim.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Session named by `SessionInfo.CurrentSessionNum`.
    pub fn current_session(&self) -> Option<&Session> {
        self.session_info.as_ref()?.current()
    }

    pub fn driver(&self, car_idx: i32) -> Option<&Driver> {
        self.driver_info.as_ref()?.driver(car_idx)
    }

    pub fn track_name(&self) -> Option<&str> {
        self.weekend_info.as_ref()?.track_name.as_deref()
    }
}
