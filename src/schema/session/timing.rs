//! `SplitTimeInfo`: sector boundaries as fractions of a lap.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct SplitTimeInfo {
    pub sectors: Option<Vec<Sector>>,
}

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Sector {
    pub sector_num: Option<i32>,
    /// 0.0 ..= 1.0
    pub sector_start_pct: Option<f64>,
}
