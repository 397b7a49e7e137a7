//! Synthetic telemetry for tests and benchmarks.
//!
//! Recordings are produced in memory with [`IbtWriter`], so no binary
//! fixtures have to live in the repository.

#![cfg(any(test, feature = "benchmark"))]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ibt::{IbtWriter, RowBuilder};
use crate::schema::{SessionInfoMessage, SessionInfoParser, VariableTable, YamlSessionInfoParser};
use crate::{Result, Value, VariableType};

/// A heap fill pattern the sim leaves in rows it never initialized.
pub const MAGIC_TICK: i32 = 0xCDCD_CDCD_u32 as i32;

/// Session YAML exercising every section, including an unquoted driver name
/// that needs preprocessing.
pub const SAMPLE_SESSION_YAML: &str = r#"---
WeekendInfo:
 TrackName: spa 2024 up
 TrackID: 163
 TrackLength: 6.93 km
 TrackDisplayName: Circuit de Spa-Francorchamps
 TrackDisplayShortName: Spa
 TrackConfigName: Grand Prix Pits
 TrackCity: Stavelot
 TrackCountry: Belgium
 TrackNumTurns: 20
 TrackPitSpeedLimit: 60.00 kph
 TrackType: road course
 TrackSurfaceTemp: 31.20 C
 TrackAirTemp: 22.05 C
 SeriesID: 0
 SeasonID: 0
 SessionID: 0
 SubSessionID: 0
 Official: 0
 EventType: Race
 Category: Road
 SimMode: full
 TeamRacing: 0
 NumCarClasses: 1
 BuildVersion: 2024.09.10.01
 WeekendOptions:
  NumStarters: 20
  StartingGrid: single file
  QualifyScoring: best lap
  CourseCautions: local
  StandingStart: 0
  Restarts: single file
  WeatherType: Static
  TimeOfDay: 2:00 pm
  Date: 2024-05-04
  IncidentLimit: unlimited
 TelemetryOptions:
  TelemetryDiskFile: ""

SessionInfo:
 CurrentSessionNum: 2
 Sessions:
 - SessionNum: 0
   SessionLaps: unlimited
   SessionTime: 600.0000 sec
   SessionType: Practice
   SessionName: PRACTICE
   ResultsPositions:
   ResultsFastestLap:
   - CarIdx: 255
     FastestLap: 0
     FastestTime: -1.0000
 - SessionNum: 1
   SessionLaps: unlimited
   SessionTime: 600.0000 sec
   SessionType: Lone Qualify
   SessionName: QUALIFY
   ResultsPositions:
   - Position: 1
     ClassPosition: 0
     CarIdx: 0
     Lap: 2
     Time: 137.5121
     FastestLap: 2
     FastestTime: 137.5121
     LapsComplete: 3
     Incidents: 0
     ReasonOutId: 0
     ReasonOutStr: Running
 - SessionNum: 2
   SessionLaps: 10
   SessionTime: unlimited
   SessionType: Race
   SessionName: RACE
   ResultsPositions:
   - Position: 1
     ClassPosition: 0
     CarIdx: 1
     Lap: 4
     Time: 0.0000
     FastestLap: 2
     FastestTime: 138.0441
     LastTime: 139.2001
     LapsLed: 4
     LapsComplete: 4
     LapsDriven: 4.0000
     Incidents: 2
     ReasonOutId: 0
     ReasonOutStr: Running
   - Position: 2
     ClassPosition: 1
     CarIdx: 0
     Lap: 4
     Time: 1.2000
     FastestLap: 3
     FastestTime: 138.3002
     LapsComplete: 4
     Incidents: 0
     ReasonOutId: 0
     ReasonOutStr: Running
   ResultsFastestLap:
   - CarIdx: 1
     FastestLap: 2
     FastestTime: 138.0441
   ResultsAverageLapTime: 139.1000
   ResultsNumCautionFlags: 0
   ResultsLapsComplete: 4
   ResultsOfficial: 0

QualifyResultsInfo:
 Results:
 - Position: 0
   ClassPosition: 0
   CarIdx: 0
   FastestLap: 2
   FastestTime: 137.5121
 - Position: 1
   ClassPosition: 1
   CarIdx: 1
   FastestLap: 3
   FastestTime: 137.9000

CameraInfo:
 Groups:
 - GroupNum: 1
   GroupName: Nose
   Cameras:
   - CameraNum: 1
     CameraName: CamNose
 - GroupNum: 2
   GroupName: TV1
   Cameras:
   - CameraNum: 1
     CameraName: CamTV1
   - CameraNum: 2
     CameraName: CamTV2
 - GroupNum: 3
   GroupName: Scenic
   IsScenic: true
   Cameras:
   - CameraNum: 1
     CameraName: CamScenic

RadioInfo:
 SelectedRadioNum: 0
 Radios:
 - RadioNum: 0
   HopCount: 2
   NumFrequencies: 2
   TunedToFrequencyNum: 0
   ScanningIsOn: 1
   Frequencies:
   - FrequencyNum: 0
     FrequencyName: "@ALLTEAMS"
     Priority: 12
     CarIdx: -1
     EntryIdx: -1
     ClubID: 0
     CanScan: 1
     CanSquawk: 1
     Muted: 0
     IsMutable: 1
     IsDeletable: 0
   - FrequencyNum: 1
     FrequencyName: "@DRIVERS"
     Priority: 15
     CarIdx: -1
     EntryIdx: -1
     ClubID: 0
     CanScan: 1
     CanSquawk: 1
     Muted: 0
     IsMutable: 1
     IsDeletable: 0

DriverInfo:
 DriverCarIdx: 0
 DriverUserID: 123456
 PaceCarIdx: -1
 DriverCarIdleRPM: 900.000
 DriverCarRedLine: 8500.000
 DriverCarFuelMaxLtr: 120.000
 DriverCarMaxFuelPct: 1.000
 DriverCarGearNumForward: 6
 DriverCarSLFirstRPM: 7000.000
 DriverCarSLShiftRPM: 7800.000
 DriverCarSLLastRPM: 8200.000
 DriverCarSLBlinkRPM: 8400.000
 DriverCarEstLapTime: 137.1234
 DriverSetupName: baseline.sto
 DriverSetupIsModified: 0
 DriverIncidentCount: 0
 DriverTires:
 - TireIndex: 0
   TireCompoundType: "Hard"
 Drivers:
 - CarIdx: 0
   UserName: Alex Driver
   AbbrevName: Driver, A
   Initials: AD
   UserID: 123456
   TeamID: 0
   TeamName: Alex Driver
   CarNumber: "7"
   CarNumberRaw: 7
   CarPath: porsche992cup
   CarClassID: 0
   CarID: 143
   CarIsPaceCar: 0
   CarIsAI: 0
   CarScreenName: Porsche 911 GT3 Cup (992)
   CarClassShortName:
   CarClassRelSpeed: 0
   CarClassMaxFuelPct: 1.000 %
   CarClassWeightPenalty: 0.000 kg
   CarClassColor: 0xffffff
   IRating: 1350
   LicLevel: 12
   LicSubLevel: 301
   LicString: C 3.01
   LicColor: 0x00cc00
   IsSpectator: 0
   CarDesignStr: 1,ffffff,000000,ff0000
   CarSponsor_1: 0
   CarSponsor_2: 0
   CurDriverIncidentCount: 0
   TeamIncidentCount: 0
 - CarIdx: 1
   UserName: O'Connor, Mike
   AbbrevName: O'Connor, M
   Initials: MO
   UserID: 654321
   TeamID: 0
   TeamName: O'Connor, Mike
   CarNumber: "12"
   CarNumberRaw: 12
   CarPath: porsche992cup
   CarClassID: 0
   CarID: 143
   CarIsPaceCar: 0
   CarIsAI: 1
   CarScreenName: Porsche 911 GT3 Cup (992)
   CarClassMaxFuelPct: 1.000 %
   IRating: 2100
   LicString: B 2.40
   IsSpectator: 0
   CarDesignStr: ,00ff00,ffffff
   CarSponsor_1: 12
   CarSponsor_2: 0
   CurDriverIncidentCount: 2
   TeamIncidentCount: 2

SplitTimeInfo:
 Sectors:
 - SectorNum: 0
   SectorStartPct: 0.000000
 - SectorNum: 1
   SectorStartPct: 0.500000

CarSetup:
 UpdateCount: 3
 TiresAero:
  LeftFront:
   StartingPressure: 165 kPa
   LastHotPressure: 180 kPa
  AeroSettings:
   RearWingSetting: 5
 Chassis:
  Front:
   ArbSetting: 3
  LeftFront:
   CornerWeight: 3620 N
 BrakesDriveUnit:
  BrakeSpec:
   BrakeBias: 54.0%
 Drivetrain:
  Differential:
   PreLoad: 40 Nm

"#;

/// Channels present in every synthetic recording.
pub fn test_table() -> Arc<VariableTable> {
    let table = VariableTable::from_layout([
        ("SessionTick", VariableType::Int, 1),
        ("SessionTime", VariableType::Double, 1),
        ("SessionNum", VariableType::Int, 1),
        ("SessionTimeRemain", VariableType::Double, 1),
        ("SessionUniqueID", VariableType::Int, 1),
        ("SessionFlags", VariableType::Bitmask, 1),
        ("Lap", VariableType::Int, 1),
        ("RPM", VariableType::Float, 1),
        ("Speed", VariableType::Float, 1),
        ("Gear", VariableType::Int, 1),
        ("Throttle", VariableType::Float, 1),
        ("OnPitRoad", VariableType::Bool, 1),
        ("CarIdxLap", VariableType::Int, 4),
    ])
    .expect("static layout is valid");
    Arc::new(table)
}

/// Values for one synthetic row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestRow {
    pub tick: i32,
    pub session_num: i32,
    pub session_unique_id: i32,
    pub session_time: f64,
    pub session_time_remain: f64,
    pub session_flags: u32,
    pub lap: i32,
    pub rpm: f32,
    pub speed: f32,
    pub gear: i32,
    pub throttle: f32,
    pub on_pit_road: bool,
}

impl TestRow {
    /// Row at `tick` in session 0, one minute of session time remaining.
    pub fn at(tick: i32) -> Self {
        Self {
            tick,
            session_num: 0,
            session_unique_id: 1,
            session_time: f64::from(tick) / 60.0,
            session_time_remain: 60.0,
            session_flags: 0,
            lap: tick.max(0) / 600,
            rpm: 3000.0 + tick.max(0) as f32,
            speed: 40.0,
            gear: 3,
            throttle: 0.75,
            on_pit_road: false,
        }
    }

    pub fn in_session(mut self, session_num: i32, time_remain: f64) -> Self {
        self.session_num = session_num;
        self.session_time_remain = time_remain;
        self
    }

    pub fn with_unique_id(mut self, id: i32) -> Self {
        self.session_unique_id = id;
        self
    }

    pub fn encode(&self, table: &VariableTable) -> Vec<u8> {
        let mut row = RowBuilder::new(table);
        row.set("SessionTick", Value::Int(self.tick))
            .and_then(|r| r.set("SessionTime", Value::Double(self.session_time)))
            .and_then(|r| r.set("SessionNum", Value::Int(self.session_num)))
            .and_then(|r| r.set("SessionTimeRemain", Value::Double(self.session_time_remain)))
            .and_then(|r| r.set("SessionUniqueID", Value::Int(self.session_unique_id)))
            .and_then(|r| r.set("SessionFlags", Value::Bitmask(self.session_flags)))
            .and_then(|r| r.set("Lap", Value::Int(self.lap)))
            .and_then(|r| r.set("RPM", Value::Float(self.rpm)))
            .and_then(|r| r.set("Speed", Value::Float(self.speed)))
            .and_then(|r| r.set("Gear", Value::Int(self.gear)))
            .and_then(|r| r.set("Throttle", Value::Float(self.throttle)))
            .and_then(|r| r.set("OnPitRoad", Value::Bool(self.on_pit_road)))
            .and_then(|r| r.set_entry("CarIdxLap", 1, Value::Int(self.lap)))
            .expect("test table has every channel");
        row.build()
    }
}

/// Rows with consecutive ticks `start..start + count`.
pub fn consecutive_rows(start: i32, count: usize) -> Vec<TestRow> {
    (0..count as i32).map(|i| TestRow::at(start + i)).collect()
}

/// A complete `.ibt` image.
pub fn ibt_bytes(rows: &[TestRow], session_yaml: &str) -> Result<Vec<u8>> {
    let table = test_table();
    let mut writer = IbtWriter::create(Cursor::new(Vec::new()), table.clone(), session_yaml, 60)?;
    writer.set_start_date(1_714_831_200);
    for row in rows {
        writer.append_row(&row.encode(&table))?;
    }
    Ok(writer.finish()?.into_inner())
}

/// A `.ibt` image over an arbitrary table, one row per value map of
/// `(channel, value)` pairs.
pub fn ibt_with_layout(table: Arc<VariableTable>, rows: &[Vec<(&str, Value)>]) -> Result<Vec<u8>> {
    let mut writer = IbtWriter::create(Cursor::new(Vec::new()), table.clone(), "", 60)?;
    for values in rows {
        let mut row = RowBuilder::new(&table);
        for (name, value) in values {
            row.set(name, *value)?;
        }
        writer.append_row(&row.build())?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Write an `.ibt` image to `path`.
pub fn write_ibt(path: &Path, rows: &[TestRow], session_yaml: &str) -> Result<()> {
    let bytes = ibt_bytes(rows, session_yaml)?;
    std::fs::write(path, bytes).map_err(|e| crate::TelemetryError::file_error(path.to_path_buf(), e))
}

/// Parser that counts invocations and delegates to [`YamlSessionInfoParser`].
#[derive(Debug, Default)]
pub struct CountingParser {
    calls: AtomicUsize,
    inner: YamlSessionInfoParser,
}

impl CountingParser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SessionInfoParser for CountingParser {
    fn parse(&self, yaml: &str) -> Result<SessionInfoMessage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.parse(yaml)
    }
}

/// Minimal session YAML naming `track`, used to tell overrides apart.
pub fn track_yaml(track: &str) -> String {
    format!("WeekendInfo:\n TrackName: {track}\nSessionInfo:\n Sessions:\n - SessionNum: 0\n")
}
