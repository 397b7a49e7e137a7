//! Recordings built through the public writer API.

#![allow(dead_code)]

use paddock::ibt::{IbtWriter, RowBuilder};
use paddock::{KnownVar, Value, VariableTable, VariableType};
use std::path::Path;
use std::sync::Arc;

pub const SESSION_YAML: &str = "WeekendInfo:
 TrackName: monza full
 TrackID: 239
SessionInfo:
 Sessions:
 - SessionNum: 0
   SessionType: Practice
 - SessionNum: 1
   SessionType: Race
DriverInfo:
 DriverCarIdx: 0
 Drivers:
 - CarIdx: 0
   UserName: Jan O'Hara
   CarNumber: \"7\"
";

pub fn table() -> Arc<VariableTable> {
    Arc::new(
        VariableTable::from_layout([
            ("SessionTick", VariableType::Int, 1),
            ("SessionNum", VariableType::Int, 1),
            ("SessionTimeRemain", VariableType::Double, 1),
            ("SessionUniqueID", VariableType::Int, 1),
            ("RPM", VariableType::Float, 1),
            ("Speed", VariableType::Float, 1),
            ("Gear", VariableType::Int, 1),
            ("OnPitRoad", VariableType::Bool, 1),
            ("CarIdxLap", VariableType::Int, 3),
        ])
        .expect("layout"),
    )
}

/// One row: `tick`, in `session_num`, RPM rising with the tick.
pub fn row(table: &VariableTable, tick: i32, session_num: i32, unique_id: i32) -> Vec<u8> {
    let mut row = RowBuilder::new(table);
    row.set_known(KnownVar::SessionTick, Value::Int(tick))
        .and_then(|r| r.set_known(KnownVar::SessionNum, Value::Int(session_num)))
        .and_then(|r| r.set_known(KnownVar::SessionTimeRemain, Value::Double(120.0)))
        .and_then(|r| r.set_known(KnownVar::SessionUniqueId, Value::Int(unique_id)))
        .and_then(|r| r.set_known(KnownVar::Rpm, Value::Float(4000.0 + tick as f32)))
        .and_then(|r| r.set_known(KnownVar::Speed, Value::Float(55.5)))
        .and_then(|r| r.set_known(KnownVar::Gear, Value::Int(4)))
        .and_then(|r| r.set_known(KnownVar::OnPitRoad, Value::Bool(tick % 2 == 0)))
        .and_then(|r| r.set_entry("CarIdxLap", 2, Value::Int(tick / 10)))
        .expect("channels exist");
    row.build()
}

/// Two garbage rows, then `practice` rows of session 0 followed by `race`
/// rows of session 1, ticks counting up from 100.
pub fn write_recording(path: &Path, practice: usize, race: usize) -> anyhow::Result<()> {
    let table = table();
    let file = std::fs::File::create(path)?;
    let mut writer = IbtWriter::create(file, table.clone(), SESSION_YAML, 60)?;
    writer.append_row(&row(&table, -1, 0, 1))?;
    writer.append_row(&row(&table, 0xDEAD_BEEF_u32 as i32, 0, 1))?;
    let mut tick = 100;
    for _ in 0..practice {
        writer.append_row(&row(&table, tick, 0, 1))?;
        tick += 1;
    }
    for _ in 0..race {
        writer.append_row(&row(&table, tick, 1, 1))?;
        tick += 1;
    }
    writer.finish()?;
    Ok(())
}
