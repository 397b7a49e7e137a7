//! The live client: rows copied out of a producer's shared segment.
//!
//! The producer rotates rows through `numBuf` slots without telling readers
//! which one they may still be reading, so every successful
//! [`LiveClient::wait_for_data`] copies the freshest slot into a private row
//! buffer and verifies the slot was not recycled during the copy. All reads
//! of the current row are served from that private copy.
//!
//! A change of layout, a tick that runs backwards or a new `SessionUniqueID`
//! is treated as a fresh connection: the schema generation is bumped and the
//! cached session info is dropped. Re-registering with a
//! [`ClientManager`](super::ClientManager) stays the caller's job.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use strum::Display;
use tracing::{debug, info, trace, warn};

use super::{Client, ClientId};
use crate::broadcast::BroadcastCommand;
use crate::buffer::Buffer;
use crate::schema::header::{DATA_HEADER_SIZE, DataHeader};
use crate::schema::{SessionInfoMessage, SessionInfoParser, VariableTable, YamlSessionInfoParser};
use crate::yaml_utils::yaml_from_bytes;
use crate::{KnownVar, Result, Sample, TelemetryError, Value, VarData};

mod memory;
#[cfg(windows)]
mod shared_memory;
mod source;

pub use memory::{DEFAULT_SESSION_CAPACITY, MemorySource};
#[cfg(windows)]
pub use shared_memory::SharedMemorySource;
pub use source::TelemetrySource;

/// Attempts at copying a slot before giving up on this signal.
const COPY_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
pub enum LiveStatus {
    #[default]
    Uninitialized,
    Connected,
    Disconnected,
}

/// Settings for a [`LiveClient`].
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveClientOptions {
    pub client_id: ClientId,

    /// Used by [`LiveClient::poll`]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub default_timeout: Duration,

    /// How long after the last copied row [`LiveClient::is_connected`]
    /// keeps reporting a connection
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub connection_timeout: Duration,
}

impl Default for LiveClientOptions {
    fn default() -> Self {
        Self {
            client_id: ClientId::new("live"),
            default_timeout: Duration::from_millis(16),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

impl LiveClientOptions {
    pub fn with_client_id(mut self, id: impl Into<ClientId>) -> Self {
        self.client_id = id.into();
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

#[derive(Debug, Default)]
struct LiveState {
    status: LiveStatus,
    closed: bool,
    header: Option<DataHeader>,
    table: Option<Arc<VariableTable>>,
    row: Buffer,
    scratch: Buffer,
    last_tick: Option<i32>,
    last_valid: Option<Instant>,
    generation: u64,
    session_unique_id: Option<i32>,
}

#[derive(Debug, Default)]
struct SessionCache {
    /// `sessionInfoUpdate` of the string currently held
    source_count: Option<i32>,
    raw: Option<String>,
    parsed: Option<Arc<SessionInfoMessage>>,
    update_count: u64,
}

enum CopyOutcome {
    Copied,
    NoNewData,
    Torn,
    Disconnected,
}

pub struct LiveClient {
    id: ClientId,
    options: LiveClientOptions,
    source: Arc<dyn TelemetrySource>,
    parser: Arc<dyn SessionInfoParser>,
    state: RwLock<LiveState>,
    session: RwLock<SessionCache>,
}

impl LiveClient {
    pub fn new(source: Arc<dyn TelemetrySource>, options: LiveClientOptions) -> Self {
        Self::with_parser(source, Arc::new(YamlSessionInfoParser::new()), options)
    }

    pub fn with_parser(
        source: Arc<dyn TelemetrySource>,
        parser: Arc<dyn SessionInfoParser>,
        options: LiveClientOptions,
    ) -> Self {
        Self {
            id: options.client_id.clone(),
            options,
            source,
            parser,
            state: RwLock::new(LiveState::default()),
            session: RwLock::new(SessionCache::default()),
        }
    }

    /// Attach to the running sim's shared memory.
    #[cfg(windows)]
    pub fn connect_shared_memory(options: LiveClientOptions) -> Result<Self> {
        let source = SharedMemorySource::open()?;
        let client = Self::new(Arc::new(source), options);
        if let Err(e) = client.initialize() {
            warn!(error = %e, "Shared memory opened but header is not usable yet");
        }
        Ok(client)
    }

    #[cfg(not(windows))]
    pub fn connect_shared_memory(_options: LiveClientOptions) -> Result<Self> {
        Err(TelemetryError::unsupported_platform("Shared memory telemetry", "Windows"))
    }

    pub fn options(&self) -> &LiveClientOptions {
        &self.options
    }

    pub fn status(&self) -> LiveStatus {
        self.state.read().status
    }

    /// Header captured with the current layout.
    pub fn header(&self) -> Option<DataHeader> {
        self.state.read().header
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// Tick of the row currently held.
    pub fn last_tick(&self) -> Option<i32> {
        self.state.read().last_tick
    }

    /// Read the header and, when the producer is connected, the variable
    /// table. Returns `false` while there is nothing to connect to.
    pub fn initialize(&self) -> Result<bool> {
        if self.state.read().closed {
            return Ok(false);
        }
        let header = self.read_header()?;
        if !header.is_connected() {
            trace!("Producer not connected yet");
            return Ok(false);
        }
        header.validate()?;
        self.install_layout(&header)?;
        if let Err(e) = self.refresh_session_info(&header) {
            warn!(error = %e, "Failed to parse session info");
        }
        Ok(true)
    }

    /// Block up to `timeout` for a new row and copy it. Returns whether a
    /// new row was copied; `false` is not an error.
    pub fn wait_for_data(&self, timeout: Duration) -> bool {
        if self.state.read().closed {
            return false;
        }
        if self.ensure_initialized() && self.copy_latest() {
            return true;
        }
        self.source.wait_for_data(timeout) && self.ensure_initialized() && self.copy_latest()
    }

    /// [`wait_for_data`](Self::wait_for_data) with the configured default
    /// timeout.
    pub fn poll(&self) -> bool {
        self.wait_for_data(self.options.default_timeout)
    }

    /// Run the blocking wait on tokio's blocking pool.
    pub async fn wait_for_data_async(self: &Arc<Self>, timeout: Duration) -> Result<bool> {
        let client = Arc::clone(self);
        tokio::task::spawn_blocking(move || client.wait_for_data(timeout))
            .await
            .map_err(|e| TelemetryError::buffer_operation_error(format!("wait task failed: {e}")))
    }

    /// Connected and a row was copied within the connection timeout.
    pub fn is_connected(&self) -> bool {
        let state = self.state.read();
        state.status == LiveStatus::Connected
            && state.last_valid.is_none_or(|t| t.elapsed() < self.options.connection_timeout)
    }

    /// Re-read the session string if the producer bumped its counter.
    pub fn update_session_info(&self) -> Result<bool> {
        let header = self.read_header()?;
        self.refresh_session_info(&header)
    }

    pub fn broadcast(&self, command: BroadcastCommand) -> Result<()> {
        let message = command.encode();
        debug!(command = ?command, wparam = message.wparam(), lparam = message.lparam(), "Broadcasting");
        self.source.broadcast(message)
    }

    /// Owned copy of the current row.
    pub fn sample(&self) -> Option<Sample> {
        let state = self.state.read();
        let table = state.table.clone()?;
        if state.row.is_empty() {
            return None;
        }
        Some(Sample::new(state.row.as_slice().to_vec(), state.last_tick?, state.generation, table))
    }

    /// Stop serving rows. Later waits return `false` immediately.
    pub fn close(&self) {
        {
            let mut state = self.state.write();
            state.closed = true;
            state.status = LiveStatus::Disconnected;
            state.table = None;
            state.row = Buffer::new();
        }
        self.clear_session();
        info!(client = %self.id, "Live client closed");
    }

    fn ensure_initialized(&self) -> bool {
        if self.state.read().table.is_some() {
            return true;
        }
        match self.initialize() {
            Ok(ready) => ready,
            Err(e) => {
                warn!(error = %e, "Failed to initialize live client");
                false
            }
        }
    }

    fn read_header(&self) -> Result<DataHeader> {
        let mut raw = [0u8; DATA_HEADER_SIZE];
        if !self.source.read_at(0, &mut raw) {
            return Err(TelemetryError::memory_access_error(0));
        }
        DataHeader::parse(&raw)
    }

    fn install_layout(&self, header: &DataHeader) -> Result<()> {
        header.validate_table_bounds(self.source.len() as u64)?;
        let start = header.var_header_offset as usize;
        let mut raw = vec![0u8; header.var_table_end() as usize - start];
        if !self.source.read_at(start, &mut raw) {
            return Err(TelemetryError::memory_access_error(start));
        }
        let buf_len = header.buf_len.max(0) as usize;
        let table = Arc::new(VariableTable::parse_entries(&raw, buf_len)?);

        let generation = {
            let mut state = self.state.write();
            let reconnect = state.status == LiveStatus::Disconnected;
            state.status = LiveStatus::Connected;
            state.header = Some(*header);
            state.table = Some(table.clone());
            state.row = Buffer::fixed(buf_len);
            state.scratch = Buffer::fixed(buf_len);
            state.last_tick = None;
            state.last_valid = None;
            state.session_unique_id = None;
            state.generation += 1;
            if reconnect {
                info!(client = %self.id, "Producer reconnected");
            }
            state.generation
        };
        self.clear_session();
        info!(
            client = %self.id,
            num_vars = table.len(),
            buf_len,
            num_buf = header.num_buf,
            tick_rate = header.tick_rate,
            generation,
            "Live telemetry layout installed"
        );
        Ok(())
    }

    fn copy_latest(&self) -> bool {
        for attempt in 0..COPY_ATTEMPTS {
            match self.try_copy_latest() {
                Ok(CopyOutcome::Copied) => return true,
                Ok(CopyOutcome::NoNewData) | Ok(CopyOutcome::Disconnected) => return false,
                Ok(CopyOutcome::Torn) => debug!(attempt, "Slot rewritten during copy"),
                Err(e) => {
                    warn!(error = %e, "Failed to copy live row");
                    return false;
                }
            }
        }
        false
    }

    fn try_copy_latest(&self) -> Result<CopyOutcome> {
        let header = self.read_header()?;
        if !header.is_connected() {
            self.mark_disconnected();
            return Ok(CopyOutcome::Disconnected);
        }

        let layout_changed = self.state.read().header.is_none_or(|current| {
            current.buf_len != header.buf_len
                || current.num_vars != header.num_vars
                || current.var_header_offset != header.var_header_offset
        });
        if layout_changed {
            info!(buf_len = header.buf_len, num_vars = header.num_vars, "Live layout changed");
            header.validate()?;
            self.install_layout(&header)?;
        }

        let Some((slot, buf)) = header.freshest_buffer() else {
            return Ok(CopyOutcome::NoNewData);
        };
        if buf.tick_count < 0 {
            return Ok(CopyOutcome::NoNewData);
        }

        let mut state = self.state.write();
        let Some(table) = state.table.clone() else {
            return Ok(CopyOutcome::NoNewData);
        };
        let mut reset = false;
        match state.last_tick {
            Some(last) if last == buf.tick_count => return Ok(CopyOutcome::NoNewData),
            Some(last) if buf.tick_count < last => {
                info!(last, tick = buf.tick_count, "Tick went backwards, treating as new session");
                reset = true;
            }
            _ => {}
        }

        let offset = buf.buf_offset.max(0) as usize;
        let len = table.buf_len();
        state.scratch.reset();
        if !self.source.read_at(offset, &mut state.scratch.as_mut_slice()[..len]) {
            return Err(TelemetryError::memory_access_error(offset));
        }
        let after = self.read_header()?;
        if after.var_buf[slot].tick_count != buf.tick_count {
            return Ok(CopyOutcome::Torn);
        }
        state.scratch.set_write_position(len)?;
        let LiveState { row, scratch, .. } = &mut *state;
        std::mem::swap(row, scratch);

        let unique_id = table
            .index_of(KnownVar::SessionUniqueId.name())
            .and_then(|idx| table.read_value(state.row.as_slice(), idx, 0))
            .map(i32::from_value);
        if let (Some(previous), Some(current)) = (state.session_unique_id, unique_id) {
            if previous != current {
                info!(previous, current, "Session id changed, treating as new session");
                reset = true;
            }
        }
        state.session_unique_id = unique_id;
        if reset {
            state.generation += 1;
        }
        state.status = LiveStatus::Connected;
        state.last_tick = Some(buf.tick_count);
        state.last_valid = Some(Instant::now());
        trace!(tick = buf.tick_count, slot, "Copied live row");
        drop(state);

        if reset {
            self.clear_session();
        }
        if let Err(e) = self.refresh_session_info(&after) {
            warn!(error = %e, "Failed to parse session info");
        }
        Ok(CopyOutcome::Copied)
    }

    fn mark_disconnected(&self) {
        {
            let mut state = self.state.write();
            if state.status != LiveStatus::Connected {
                return;
            }
            state.status = LiveStatus::Disconnected;
            state.table = None;
            state.header = None;
            state.row.reset();
            state.last_tick = None;
        }
        info!(client = %self.id, "Producer disconnected");
    }

    fn clear_session(&self) {
        let mut session = self.session.write();
        session.source_count = None;
        session.raw = None;
        session.parsed = None;
    }

    /// Parse the segment's session string when its counter moved. The raw
    /// string is kept even when parsing fails.
    fn refresh_session_info(&self, header: &DataHeader) -> Result<bool> {
        let count = header.session.count;
        if count <= 0 || header.session.len <= 0 {
            return Ok(false);
        }
        if self.session.read().source_count == Some(count) {
            return Ok(false);
        }

        let offset = header.session.offset.max(0) as usize;
        let mut raw = vec![0u8; header.session.len as usize];
        if !self.source.read_at(offset, &mut raw) {
            return Err(TelemetryError::memory_access_error(offset));
        }
        let yaml = yaml_from_bytes(&raw);

        let mut session = self.session.write();
        if session.source_count == Some(count) {
            return Ok(false);
        }
        session.source_count = Some(count);
        let parsed = self.parser.parse(&yaml);
        session.raw = Some(yaml);
        let message = parsed?;
        session.parsed = Some(Arc::new(message));
        session.update_count += 1;
        debug!(source_count = count, update_count = session.update_count, "Session info updated");
        Ok(true)
    }
}

impl Client for LiveClient {
    fn client_id(&self) -> ClientId {
        self.id.clone()
    }

    fn is_available(&self) -> bool {
        let state = self.state.read();
        !state.closed && state.status == LiveStatus::Connected && state.table.is_some()
    }

    fn var_table(&self) -> Option<Arc<VariableTable>> {
        self.state.read().table.clone()
    }

    fn read_value(&self, idx: usize, entry: usize) -> Option<Value> {
        let state = self.state.read();
        if state.row.is_empty() {
            return None;
        }
        state.table.as_ref()?.read_value(state.row.as_slice(), idx, entry)
    }

    fn schema_generation(&self) -> u64 {
        self.state.read().generation
    }

    fn session_info_str(&self) -> Result<String> {
        self.session.read().raw.clone().ok_or_else(|| TelemetryError::not_found("session info string"))
    }

    fn session_info(&self) -> Weak<SessionInfoMessage> {
        self.session.read().parsed.as_ref().map(Arc::downgrade).unwrap_or_default()
    }

    fn session_info_with_update_count(&self) -> Option<(u64, Weak<SessionInfoMessage>)> {
        let session = self.session.read();
        session.parsed.as_ref().map(|parsed| (session.update_count, Arc::downgrade(parsed)))
    }
}

impl std::fmt::Debug for LiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("LiveClient")
            .field("id", &self.id)
            .field("status", &state.status)
            .field("last_tick", &state.last_tick)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}
