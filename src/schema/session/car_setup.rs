//! `CarSetup`: the garage setup sheet.
//!
//! Section contents differ from car to car, so only the three sections most
//! cars share are named and their entries are kept as raw YAML values.
//! Anything else lands in [`CarSetup::other`].

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;

pub use serde_yaml_ng::Value as SetupValue;

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct CarSetup {
    pub update_count: Option<i32>,
    pub tires_aero: Option<TiresAero>,
    pub chassis: Option<Chassis>,
    pub brakes_drive_unit: Option<BrakesDriveUnit>,
    #[serde(flatten)]
    pub other: BTreeMap<String, SetupValue>,
}

macro_rules! setup_section {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
        pub struct $name {
            #[serde(flatten)]
            pub entries: BTreeMap<String, SetupValue>,
        }

        impl $name {
            pub fn get(&self, key: &str) -> Option<&SetupValue> {
                self.entries.get(key)
            }
        }
    };
}

setup_section!(
    /// Tyre pressures and temperatures, aero balance.
    TiresAero
);
setup_section!(
    /// Corner weights, springs, dampers.
    Chassis
);
setup_section!(BrakesDriveUnit);
