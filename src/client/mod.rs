//! The uniform contract over live and recorded telemetry.
//!
//! Both sources describe their rows with a [`VariableTable`] and publish a
//! session YAML document. [`Client`] exposes exactly that: channel lookup,
//! typed reads of the current row and access to the parsed session info.
//! Lookups that miss (unknown name, index or entry out of range, nothing
//! read yet) return `None` rather than an error, since callers poll many
//! channels per frame and treat missing ones as absent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::broadcast::BroadcastCommand;
use crate::schema::{SessionInfoMessage, VarHeader, VariableTable};
use crate::{BitField, KnownVar, Result, Sample, TelemetryError, Value, VarData, VariableType};

pub mod disk;
pub mod live;
pub mod manager;

pub use disk::{DiskClient, DiskClientOptions, SessionInfoOverride};
pub use live::{LiveClient, LiveClientOptions, LiveStatus, MemorySource, TelemetrySource};
pub use manager::{ClientHandle, ClientManager};

/// Name a client is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Capabilities shared by every telemetry source.
///
/// Implementors provide the table, the current row and the session info;
/// the lookup and typed-read methods are derived from those.
pub trait Client: Send + Sync {
    fn client_id(&self) -> ClientId;

    /// Header and table have been read and the source is still open.
    fn is_available(&self) -> bool;

    fn var_table(&self) -> Option<Arc<VariableTable>>;

    /// Entry `entry` of channel `idx` in the current row.
    fn read_value(&self, idx: usize, entry: usize) -> Option<Value>;

    /// Increments every time the table or session identity changes, so
    /// cached channel indices can be invalidated.
    fn schema_generation(&self) -> u64;

    /// The raw session YAML. `NotFound` until one has been captured.
    fn session_info_str(&self) -> Result<String>;

    /// The parsed session info, or a dangling `Weak` when there is none.
    fn session_info(&self) -> Weak<SessionInfoMessage>;

    fn session_info_with_update_count(&self) -> Option<(u64, Weak<SessionInfoMessage>)>;

    fn num_vars(&self) -> Option<usize> {
        self.var_table().map(|t| t.len())
    }

    fn var_headers(&self) -> Vec<VarHeader> {
        self.var_table().map(|t| t.headers().to_vec()).unwrap_or_default()
    }

    fn var_idx(&self, name: &str) -> Option<usize> {
        self.var_table()?.index_of(name)
    }

    fn var_idx_known(&self, var: KnownVar) -> Option<usize> {
        self.var_idx(var.name())
    }

    fn var_type(&self, idx: usize) -> Option<VariableType> {
        self.var_table()?.get(idx).map(|h| h.var_type)
    }

    fn var_count(&self, idx: usize) -> Option<usize> {
        self.var_table()?.get(idx).map(|h| h.count)
    }

    fn var_name(&self, idx: usize) -> Option<String> {
        self.var_table()?.get(idx).map(|h| h.name.clone())
    }

    fn var_desc(&self, idx: usize) -> Option<String> {
        self.var_table()?.get(idx).map(|h| h.desc.clone())
    }

    fn var_unit(&self, idx: usize) -> Option<String> {
        self.var_table()?.get(idx).map(|h| h.unit.clone())
    }

    fn get_var_bool(&self, idx: usize, entry: usize) -> Option<bool> {
        self.read_value(idx, entry).map(bool::from_value)
    }

    fn get_var_int(&self, idx: usize, entry: usize) -> Option<i32> {
        self.read_value(idx, entry).map(i32::from_value)
    }

    fn get_var_float(&self, idx: usize, entry: usize) -> Option<f32> {
        self.read_value(idx, entry).map(f32::from_value)
    }

    fn get_var_double(&self, idx: usize, entry: usize) -> Option<f64> {
        self.read_value(idx, entry).map(f64::from_value)
    }

    fn get_var_bitfield(&self, idx: usize, entry: usize) -> Option<BitField> {
        self.read_value(idx, entry).map(BitField::from_value)
    }
}

/// Typed read by name, for any client.
pub fn read_var<T: VarData>(client: &dyn Client, name: &str, entry: usize) -> Option<T> {
    let idx = client.var_idx(name)?;
    client.read_value(idx, entry).map(T::from_value)
}

/// The closed set of client variants.
///
/// Common operations go through [`Client`]; the variant-specific ones are
/// offered here and fail with `NotImplemented` on the other variant.
#[derive(Clone)]
pub enum AnyClient {
    Live(Arc<LiveClient>),
    Disk(Arc<DiskClient>),
}

impl AnyClient {
    fn inner(&self) -> &dyn Client {
        match self {
            AnyClient::Live(live) => live.as_ref() as &dyn Client,
            AnyClient::Disk(disk) => disk.as_ref() as &dyn Client,
        }
    }

    fn variant(&self) -> &'static str {
        match self {
            AnyClient::Live(_) => "LiveClient",
            AnyClient::Disk(_) => "DiskClient",
        }
    }

    /// Shared handle usable with [`ClientManager`].
    pub fn as_dyn(&self) -> Arc<dyn Client> {
        match self {
            AnyClient::Live(live) => live.clone() as Arc<dyn Client>,
            AnyClient::Disk(disk) => disk.clone() as Arc<dyn Client>,
        }
    }

    pub fn downgrade(&self) -> Weak<dyn Client> {
        Arc::downgrade(&self.as_dyn())
    }

    pub fn as_live(&self) -> Option<&Arc<LiveClient>> {
        match self {
            AnyClient::Live(live) => Some(live),
            AnyClient::Disk(_) => None,
        }
    }

    pub fn as_disk(&self) -> Option<&Arc<DiskClient>> {
        match self {
            AnyClient::Disk(disk) => Some(disk),
            AnyClient::Live(_) => None,
        }
    }

    pub fn sample(&self) -> Option<Sample> {
        match self {
            AnyClient::Live(live) => live.sample(),
            AnyClient::Disk(disk) => disk.sample(),
        }
    }

    pub fn wait_for_data(&self, timeout: Duration) -> Result<bool> {
        match self {
            AnyClient::Live(live) => Ok(live.wait_for_data(timeout)),
            AnyClient::Disk(_) => Err(self.unsupported("wait_for_data")),
        }
    }

    pub fn broadcast(&self, command: BroadcastCommand) -> Result<()> {
        match self {
            AnyClient::Live(live) => live.broadcast(command),
            AnyClient::Disk(_) => Err(self.unsupported("broadcast")),
        }
    }

    pub fn next(&self, read_only: bool) -> Result<bool> {
        match self {
            AnyClient::Disk(disk) => disk.next(read_only),
            AnyClient::Live(_) => Err(self.unsupported("next")),
        }
    }

    pub fn seek(&self, sample_index: usize, skip_read: bool) -> Result<()> {
        match self {
            AnyClient::Disk(disk) => disk.seek(sample_index, skip_read),
            AnyClient::Live(_) => Err(self.unsupported("seek")),
        }
    }

    pub fn seek_to_session_num(&self, session_num: i32) -> Result<()> {
        match self {
            AnyClient::Disk(disk) => disk.seek_to_session_num(session_num),
            AnyClient::Live(_) => Err(self.unsupported("seek_to_session_num")),
        }
    }

    fn unsupported(&self, operation: &str) -> TelemetryError {
        TelemetryError::not_implemented(operation, self.variant())
    }
}

impl fmt::Debug for AnyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(self.variant()).field(&self.client_id()).finish()
    }
}

impl From<Arc<LiveClient>> for AnyClient {
    fn from(client: Arc<LiveClient>) -> Self {
        AnyClient::Live(client)
    }
}

impl From<Arc<DiskClient>> for AnyClient {
    fn from(client: Arc<DiskClient>) -> Self {
        AnyClient::Disk(client)
    }
}

impl Client for AnyClient {
    fn client_id(&self) -> ClientId {
        self.inner().client_id()
    }

    fn is_available(&self) -> bool {
        self.inner().is_available()
    }

    fn var_table(&self) -> Option<Arc<VariableTable>> {
        self.inner().var_table()
    }

    fn read_value(&self, idx: usize, entry: usize) -> Option<Value> {
        self.inner().read_value(idx, entry)
    }

    fn schema_generation(&self) -> u64 {
        self.inner().schema_generation()
    }

    fn session_info_str(&self) -> Result<String> {
        self.inner().session_info_str()
    }

    fn session_info(&self) -> Weak<SessionInfoMessage> {
        self.inner().session_info()
    }

    fn session_info_with_update_count(&self) -> Option<(u64, Weak<SessionInfoMessage>)> {
        self.inner().session_info_with_update_count()
    }
}
