//! Owned snapshots of a single telemetry row.

use std::sync::Arc;

use super::{KnownVar, Value, VarData};
use crate::schema::VariableTable;

/// One row copied out of a client, together with the table that describes it.
///
/// A `Sample` stays valid after the client moves on to the next row, which
/// makes it the unit handed out by the async streams.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Row bytes, exactly `table.buf_len()` long
    pub data: Arc<[u8]>,

    /// `SessionTick` of the row, or the slot tick for live rows
    pub tick: i32,

    /// Schema generation of the client when the row was captured
    pub generation: u64,

    /// Channel table for decoding `data`
    pub table: Arc<VariableTable>,
}

impl Sample {
    pub fn new(data: Vec<u8>, tick: i32, generation: u64, table: Arc<VariableTable>) -> Self {
        Self { data: data.into(), tick, generation, table }
    }

    /// Decoded value of `name[entry]` in its stored type.
    pub fn value(&self, name: &str, entry: usize) -> Option<Value> {
        let idx = self.table.index_of(name)?;
        self.table.read_value(&self.data, idx, entry)
    }

    /// Coerced value of `name[entry]`.
    pub fn get<T: VarData>(&self, name: &str, entry: usize) -> Option<T> {
        self.value(name, entry).map(T::from_value)
    }

    pub fn get_known<T: VarData>(&self, var: KnownVar, entry: usize) -> Option<T> {
        self.get(var.name(), entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VariableType;

    #[test]
    fn sample_reads_by_name_with_coercion() {
        let table = Arc::new(
            VariableTable::from_layout([
                ("SessionTick", VariableType::Int, 1),
                ("RPM", VariableType::Float, 1),
            ])
            .unwrap(),
        );
        let mut row = vec![0u8; table.buf_len()];
        row[0..4].copy_from_slice(&42i32.to_le_bytes());
        row[4..8].copy_from_slice(&6500.5f32.to_le_bytes());

        let sample = Sample::new(row, 42, 1, table);
        assert_eq!(sample.get_known::<i32>(KnownVar::SessionTick, 0), Some(42));
        assert_eq!(sample.get::<i32>("RPM", 0), Some(6500));
        assert_eq!(sample.get::<f64>("RPM", 1), None);
        assert_eq!(sample.value("Nope", 0), None);
    }
}
