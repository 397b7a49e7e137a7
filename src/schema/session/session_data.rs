//! `SessionInfo` (the list of practice/qualify/race sessions with their
//! running results) and `QualifyResultsInfo`.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// The `SessionInfo` node: every session of the event.
#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct SessionInfo {
    pub current_session_num: Option<i32>,
    pub sessions: Vec<Session>,
}

impl SessionInfo {
    /// Session with the given `SessionNum`.
    pub fn session(&self, session_num: i32) -> Option<&Session> {
        self.sessions.iter().find(|s| s.session_num == Some(session_num))
    }

    /// Session named by `CurrentSessionNum`.
    pub fn current(&self) -> Option<&Session> {
        self.current_session_num.and_then(|num| self.session(num))
    }
}

/// One session and its results so far.
#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Session {
    pub session_num: Option<i32>,
    /// Lap limit, or "unlimited"
    pub session_laps: Option<String>,
    /// Time limit such as "600.0000 sec", or "unlimited"
    pub session_time: Option<String>,
    pub session_num_laps_to_avg: Option<i32>,
    pub session_type: Option<String>,
    pub session_track_rubber_state: Option<String>,
    pub session_name: Option<String>,
    pub session_sub_type: Option<String>,
    pub session_skipped: Option<i32>,
    pub session_run_groups_used: Option<i32>,
    pub session_enforce_tire_compound_change: Option<i32>,
    pub results_positions: Option<Vec<ResultsPosition>>,
    pub results_fastest_lap: Option<Vec<ResultsFastestLap>>,
    pub results_average_lap_time: Option<f64>,
    pub results_num_caution_flags: Option<i32>,
    pub results_num_caution_laps: Option<i32>,
    pub results_num_lead_changes: Option<i32>,
    pub results_laps_complete: Option<i32>,
    pub results_official: Option<i32>,
}

/// Running classification entry.
#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResultsPosition {
    pub position: Option<i32>,
    pub class_position: Option<i32>,
    pub car_idx: Option<i32>,
    pub lap: Option<i32>,
    pub time: Option<f64>,
    pub fastest_lap: Option<i32>,
    pub fastest_time: Option<f64>,
    pub last_time: Option<f64>,
    pub laps_led: Option<i32>,
    pub laps_complete: Option<i32>,
    pub joker_laps_complete: Option<i32>,
    pub laps_driven: Option<f64>,
    pub incidents: Option<i32>,
    #[serde(rename = "ReasonOutId")]
    pub reason_out_id: Option<i32>,
    pub reason_out_str: Option<String>,
}

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResultsFastestLap {
    pub car_idx: Option<i32>,
    pub fastest_lap: Option<i32>,
    pub fastest_time: Option<f64>,
}

/// Qualifying classification carried into later sessions.
#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct QualifyResultsInfo {
    pub results: Option<Vec<SessionResult>>,
}

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct SessionResult {
    pub position: Option<i32>,
    pub class_position: Option<i32>,
    pub car_idx: Option<i32>,
    pub fastest_lap: Option<i32>,
    pub fastest_time: Option<f64>,
}
