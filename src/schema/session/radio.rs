//! `RadioInfo`: radios and the frequencies each can tune to.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct RadioInfo {
    pub selected_radio_num: Option<i32>,
    pub radios: Option<Vec<Radio>>,
}

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Radio {
    pub radio_num: Option<i32>,
    pub hop_count: Option<i32>,
    pub num_frequencies: Option<i32>,
    pub tuned_to_frequency_num: Option<i32>,
    pub scanning_is_on: Option<i32>,
    pub frequencies: Option<Vec<Frequency>>,
}

/// A channel such as `@ALLTEAMS`, `@RACECONTROL` or a per-car team channel.
#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Frequency {
    pub frequency_num: Option<i32>,
    pub frequency_name: Option<String>,
    pub priority: Option<i32>,
    /// -1 on broadcast channels
    pub car_idx: Option<i32>,
    pub entry_idx: Option<i32>,
    #[serde(rename = "ClubID")]
    pub club_id: Option<i32>,
    pub can_scan: Option<i32>,
    pub can_squawk: Option<i32>,
    pub muted: Option<i32>,
    pub is_mutable: Option<i32>,
    pub is_deletable: Option<i32>,
}
