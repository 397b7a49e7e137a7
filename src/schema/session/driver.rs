//! `DriverInfo`: the local driver's car parameters and the entry list.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct DriverInfo {
    /// Index of the local driver's car in `Drivers` and in `CarIdx*` arrays
    pub driver_car_idx: Option<i32>,
    #[serde(rename = "DriverUserID")]
    pub driver_user_id: Option<i32>,
    pub pace_car_idx: Option<i32>,
    pub driver_head_pos_x: Option<f64>,
    pub driver_head_pos_y: Option<f64>,
    pub driver_head_pos_z: Option<f64>,
    pub driver_car_is_electric: Option<i32>,
    #[serde(rename = "DriverCarIdleRPM")]
    pub driver_car_idle_rpm: Option<f64>,
    pub driver_car_red_line: Option<f64>,
    pub driver_car_eng_cylinder_count: Option<i32>,
    pub driver_car_fuel_kg_per_ltr: Option<f64>,
    pub driver_car_fuel_max_ltr: Option<f64>,
    pub driver_car_max_fuel_pct: Option<f64>,
    pub driver_car_gear_num_forward: Option<i32>,
    pub driver_car_gear_neutral: Option<i32>,
    pub driver_car_gear_reverse: Option<i32>,
    #[serde(rename = "DriverCarSLFirstRPM")]
    pub driver_car_sl_first_rpm: Option<f64>,
    #[serde(rename = "DriverCarSLShiftRPM")]
    pub driver_car_sl_shift_rpm: Option<f64>,
    #[serde(rename = "DriverCarSLLastRPM")]
    pub driver_car_sl_last_rpm: Option<f64>,
    #[serde(rename = "DriverCarSLBlinkRPM")]
    pub driver_car_sl_blink_rpm: Option<f64>,
    pub driver_car_version: Option<String>,
    pub driver_pit_trk_pct: Option<f64>,
    pub driver_car_est_lap_time: Option<f64>,
    pub driver_setup_name: Option<String>,
    pub driver_setup_is_modified: Option<i32>,
    pub driver_setup_load_type_name: Option<String>,
    pub driver_setup_passed_tech: Option<i32>,
    pub driver_incident_count: Option<i32>,
    pub driver_tires: Option<Vec<DriverTire>>,
    pub drivers: Option<Vec<Driver>>,
}

impl DriverInfo {
    /// Entry whose `CarIdx` equals `car_idx`.
    pub fn driver(&self, car_idx: i32) -> Option<&Driver> {
        self.drivers.as_deref()?.iter().find(|d| d.car_idx == Some(car_idx))
    }

    /// The local driver's entry.
    pub fn player(&self) -> Option<&Driver> {
        self.driver(self.driver_car_idx?)
    }
}

#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct DriverTire {
    pub tire_index: Option<i32>,
    pub tire_compound_type: Option<String>,
}

/// One entry of the `Drivers` list.
#[skip_serializing_none]
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Driver {
    pub car_idx: Option<i32>,
    pub user_name: Option<String>,
    pub abbrev_name: Option<String>,
    pub initials: Option<String>,
    #[serde(rename = "UserID")]
    pub user_id: Option<i32>,
    #[serde(rename = "TeamID")]
    pub team_id: Option<i32>,
    pub team_name: Option<String>,
    pub car_number: Option<String>,
    pub car_number_raw: Option<i32>,
    pub car_path: Option<String>,
    #[serde(rename = "CarClassID")]
    pub car_class_id: Option<i32>,
    #[serde(rename = "CarID")]
    pub car_id: Option<i32>,
    pub car_is_pace_car: Option<i32>,
    #[serde(rename = "CarIsAI")]
    pub car_is_ai: Option<i32>,
    pub car_is_electric: Option<i32>,
    pub car_screen_name: Option<String>,
    pub car_screen_name_short: Option<String>,
    pub car_class_short_name: Option<String>,
    pub car_class_rel_speed: Option<i32>,
    pub car_class_license_level: Option<i32>,
    /// Percentage string such as "1.000 %"
    pub car_class_max_fuel_pct: Option<String>,
    pub car_class_weight_penalty: Option<String>,
    pub car_class_power_adjust: Option<String>,
    pub car_class_dry_tire_set_limit: Option<String>,
    pub car_class_color: Option<String>,
    pub car_class_est_lap_time: Option<f64>,
    pub i_rating: Option<i32>,
    pub lic_level: Option<i32>,
    pub lic_sub_level: Option<i32>,
    pub lic_string: Option<String>,
    pub lic_color: Option<String>,
    pub is_spectator: Option<i32>,
    pub car_design_str: Option<String>,
    pub helmet_design_str: Option<String>,
    pub suit_design_str: Option<String>,
    pub car_number_design_str: Option<String>,
    #[serde(rename = "CarSponsor_1")]
    pub car_sponsor_1: Option<i32>,
    #[serde(rename = "CarSponsor_2")]
    pub car_sponsor_2: Option<i32>,
    #[serde(rename = "ClubID")]
    pub club_id: Option<i32>,
    pub club_name: Option<String>,
    #[serde(rename = "DivisionID")]
    pub division_id: Option<i32>,
    pub division_name: Option<String>,
    pub cur_driver_incident_count: Option<i32>,
    pub team_incident_count: Option<i32>,
}
