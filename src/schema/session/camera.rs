//! `CameraInfo`: camera groups and their cameras.
//!
//! Group and camera numbers are what `CamSwitchPos`/`CamSwitchNum`
//! broadcasts expect.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct CameraInfo {
    pub groups: Option<Vec<CameraGroup>>,
}

impl CameraInfo {
    /// Group whose `GroupName` matches, ignoring ASCII case.
    pub fn group_by_name(&self, name: &str) -> Option<&CameraGroup> {
        self.groups
            .as_deref()?
            .iter()
            .find(|g| g.group_name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }
}

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct CameraGroup {
    pub group_num: Option<i32>,
    pub group_name: Option<String>,
    pub is_scenic: Option<bool>,
    pub cameras: Option<Vec<Camera>>,
}

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Camera {
    pub camera_num: Option<i32>,
    pub camera_name: Option<String>,
}
