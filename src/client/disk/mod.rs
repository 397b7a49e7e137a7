//! The disk client: playback of `.ibt` recordings.
//!
//! ```rust,no_run
//! use paddock::{Client, DiskClient, KnownVar};
//!
//! fn laps(path: &str) -> paddock::Result<()> {
//!     let client = DiskClient::open(path)?;
//!     let lap = client.var_idx_known(KnownVar::Lap);
//!     while client.next(false)? {
//!         if let Some(lap) = lap.and_then(|idx| client.get_var_int(idx, 0)) {
//!             println!("lap {lap}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Rows before the first one carrying a real `SessionTick` are never served:
//! recorders sometimes leave uninitialized rows at the head of a file, and
//! every seek is clamped past them.

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

use super::{Client, ClientId};
use crate::buffer::Buffer;
use crate::ibt::format::{DISK_SUB_HEADER_OFFSET, rows_present, sample_data_offset, verify_min_length};
use crate::ibt::DiskSubHeader;
use crate::schema::{DataHeader, SessionInfoMessage, SessionInfoParser, VariableTable, YamlSessionInfoParser};
use crate::yaml_utils::yaml_from_bytes;
use crate::{KnownVar, Result, Sample, TelemetryError, Value, VarData};

mod overrides;

pub use overrides::{SessionInfoOverride, select_override};

/// Fill patterns of uninitialized or freed heap memory, as they appear when
/// read back as a tick.
pub const MAGIC_TICKS: [i32; 5] = [
    0xCDCD_CDCD_u32 as i32,
    0xBAAD_F00D_u32 as i32,
    0xFEEE_FEEE_u32 as i32,
    0xDDDD_DDDD_u32 as i32,
    0xDEAD_BEEF_u32 as i32,
];

pub fn is_magic_tick(tick: i32) -> bool {
    MAGIC_TICKS.contains(&tick)
}

/// Settings for a [`DiskClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskClientOptions {
    pub client_id: ClientId,

    /// Session strings to use instead of the embedded one. Empty means the
    /// embedded string is used.
    pub session_overrides: Vec<SessionInfoOverride>,

    /// Reject files shorter than their sub-header's sample count. When off,
    /// playback is limited to the rows actually present.
    pub validate_sample_count: bool,
}

impl Default for DiskClientOptions {
    fn default() -> Self {
        Self {
            client_id: ClientId::new("disk"),
            session_overrides: Vec::new(),
            validate_sample_count: true,
        }
    }
}

impl DiskClientOptions {
    pub fn with_client_id(mut self, id: impl Into<ClientId>) -> Self {
        self.client_id = id.into();
        self
    }

    pub fn with_session_override(mut self, session_override: SessionInfoOverride) -> Self {
        self.session_overrides.push(session_override);
        self
    }

    pub fn with_session_overrides(mut self, overrides: Vec<SessionInfoOverride>) -> Self {
        self.session_overrides = overrides;
        self
    }

    pub fn with_validate_sample_count(mut self, validate: bool) -> Self {
        self.validate_sample_count = validate;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionSource {
    Embedded,
    /// Override selected by its tick
    Override(i32),
}

#[derive(Debug, Default)]
struct DiskSession {
    selected: Option<SessionSource>,
    raw: Option<String>,
    parsed: Option<Arc<SessionInfoMessage>>,
    update_count: u64,
}

struct DiskState<R> {
    reader: R,
    row: Buffer,
    /// Row the next `next()` reads
    sample_index: usize,
    /// Row held in `row`
    row_index: Option<usize>,
    closed: bool,
    session: DiskSession,
}

/// A `.ibt` recording opened for playback.
///
/// Cursor operations are serialized by one re-entrant lock per client;
/// separate clients over the same file share nothing.
pub struct DiskClient<R = BufReader<File>> {
    id: ClientId,
    path: Option<PathBuf>,
    header: DataHeader,
    disk: DiskSubHeader,
    table: Arc<VariableTable>,
    data_offset: u64,
    sample_count: usize,
    sample_index_valid_offset: usize,
    tick_sample_index_offset: i32,
    embedded_yaml: Option<String>,
    overrides: Vec<SessionInfoOverride>,
    parser: Arc<dyn SessionInfoParser>,
    state: ReentrantMutex<RefCell<DiskState<R>>>,
}

impl DiskClient {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, DiskClientOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: DiskClientOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TelemetryError::not_found(format!("telemetry file {}", path.display())));
        }
        let file = File::open(path).map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        let mut client = Self::from_reader(BufReader::new(file), options)?;
        client.path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            samples = client.sample_count,
            first_valid = client.sample_index_valid_offset,
            "Opened telemetry file"
        );
        Ok(client)
    }
}

impl<R: Read + Seek> DiskClient<R> {
    /// Open a recording from any seekable byte source.
    pub fn from_reader(mut reader: R, options: DiskClientOptions) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let header = DataHeader::parse_from_reader(&mut reader)?;
        header.validate()?;
        reader.seek(SeekFrom::Start(DISK_SUB_HEADER_OFFSET as u64))?;
        let disk = DiskSubHeader::parse_from_reader(&mut reader)?;
        header.validate_table_bounds(file_len)?;
        let table = Arc::new(VariableTable::parse_from_reader(&mut reader, &header)?);

        let data_offset = sample_data_offset(&header);
        let sample_count = if options.validate_sample_count {
            verify_min_length(file_len, &header, &disk)?;
            disk.sample_count.max(0) as usize
        } else {
            let present = rows_present(file_len, &header) as usize;
            let declared = disk.sample_count.max(0) as usize;
            if declared != present {
                warn!(declared, present, "Sample count disagrees with file length");
            }
            if declared == 0 { present } else { declared.min(present) }
        };

        let embedded_yaml = Self::read_embedded_yaml(&mut reader, &header, file_len)?;

        let state = DiskState {
            reader,
            row: Buffer::fixed(table.buf_len()),
            sample_index: 0,
            row_index: None,
            closed: false,
            session: DiskSession::default(),
        };
        let mut client = Self {
            id: options.client_id,
            path: None,
            header,
            disk,
            table,
            data_offset,
            sample_count,
            sample_index_valid_offset: 0,
            tick_sample_index_offset: 0,
            embedded_yaml,
            overrides: options.session_overrides,
            parser: Arc::new(YamlSessionInfoParser::new()),
            state: ReentrantMutex::new(RefCell::new(state)),
        };
        client.resolve_first_valid_sample()?;
        debug!(
            num_vars = client.table.len(),
            buf_len = client.table.buf_len(),
            samples = client.sample_count,
            overrides = client.overrides.len(),
            "Disk client ready"
        );
        Ok(client)
    }

    /// Replace the session string parser.
    pub fn with_parser(mut self, parser: Arc<dyn SessionInfoParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn header(&self) -> &DataHeader {
        &self.header
    }

    pub fn disk_sub_header(&self) -> &DiskSubHeader {
        &self.disk
    }

    pub fn tick_rate(&self) -> i32 {
        self.header.tick_rate
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Logical cursor: the row the next [`next`](Self::next) reads.
    pub fn sample_index(&self) -> usize {
        self.state.lock().borrow().sample_index
    }

    /// Index of the first row with a usable tick.
    pub fn sample_index_valid_offset(&self) -> usize {
        self.sample_index_valid_offset
    }

    /// `SessionTick` of that first usable row.
    pub fn tick_sample_index_offset(&self) -> i32 {
        self.tick_sample_index_offset
    }

    pub fn has_next(&self) -> bool {
        self.sample_index() < self.sample_count
    }

    /// Read the row at the cursor. Unless `read_only`, the cursor moves on
    /// by one. Returns `false` at the end of the recording.
    pub fn next(&self, read_only: bool) -> Result<bool> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if state.closed || state.sample_index >= self.sample_count {
            return Ok(false);
        }
        let idx = state.sample_index;
        self.read_row(&mut state, idx)?;
        if !read_only {
            state.sample_index += 1;
        }
        Ok(true)
    }

    /// Move the cursor to `sample_index`, clamped to the first valid row, and
    /// load that row unless `skip_read`.
    pub fn seek(&self, sample_index: usize, skip_read: bool) -> Result<()> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let target = sample_index.max(self.sample_index_valid_offset);
        if target > self.sample_count || (target == self.sample_count && !skip_read) {
            return Err(TelemetryError::not_found(format!(
                "sample {} (recording has {})",
                sample_index, self.sample_count
            )));
        }
        if target != sample_index {
            trace!(requested = sample_index, target, "Seek clamped to first valid sample");
        }
        state.sample_index = target;
        if !skip_read {
            self.read_row(&mut state, target)?;
        }
        Ok(())
    }

    /// Scan forward from the cursor to the first row of session
    /// `session_num` that still has time remaining, and load it. The cursor
    /// is left untouched when no such row exists.
    pub fn seek_to_session_num(&self, session_num: i32) -> Result<()> {
        let num_idx = self.known_idx(KnownVar::SessionNum)?;
        let remain_idx = self.known_idx(KnownVar::SessionTimeRemain)?;

        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let start = state.sample_index;
        let previous_row = state.row_index;

        for idx in start.max(self.sample_index_valid_offset)..self.sample_count {
            self.read_row(&mut state, idx)?;
            let num = self.row_value(&state, num_idx).map(i32::from_value);
            let remain = self.row_value(&state, remain_idx).map(f64::from_value);
            if num == Some(session_num) && remain.is_some_and(|r| r > 0.0) {
                state.sample_index = idx;
                debug!(session_num, sample_index = idx, "Seeked to session");
                return Ok(());
            }
        }

        state.sample_index = start;
        if let Some(previous) = previous_row {
            self.read_row(&mut state, previous)?;
        }
        Err(TelemetryError::not_found(format!("session {} with time remaining", session_num)))
    }

    /// Re-evaluate which session string applies to the current row and parse
    /// it if the choice changed. Returns whether a new tree was installed.
    pub fn update_session_info(&self) -> Result<bool> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let (source, yaml) = match self.select_session_source(&state) {
            Some(selected) => selected,
            None => return Ok(false),
        };
        if state.session.selected == Some(source) {
            return Ok(false);
        }

        let session = &mut state.session;
        session.selected = Some(source);
        session.raw = Some(yaml.to_owned());
        let message = self.parser.parse(yaml)?;
        session.parsed = Some(Arc::new(message));
        session.update_count += 1;
        debug!(source = ?source, update_count = session.update_count, "Session info updated");
        Ok(true)
    }

    /// Owned copy of the row held.
    pub fn sample(&self) -> Option<Sample> {
        let guard = self.state.lock();
        let state = guard.borrow();
        let row_index = state.row_index?;
        // recordings without SessionTick are stamped with their row index
        let tick = self
            .table
            .index_of(KnownVar::SessionTick.name())
            .and_then(|idx| self.row_value(&state, idx))
            .map_or(row_index as i32, i32::from_value);
        Some(Sample::new(state.row.as_slice().to_vec(), tick, 0, self.table.clone()))
    }

    /// Stop serving rows.
    pub fn close(&self) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.closed = true;
        state.row.reset();
        state.row_index = None;
        state.session = DiskSession { update_count: state.session.update_count, ..DiskSession::default() };
        info!(client = %self.id, "Disk client closed");
    }

    fn read_embedded_yaml(reader: &mut R, header: &DataHeader, file_len: u64) -> Result<Option<String>> {
        if header.session.len <= 0 {
            return Ok(None);
        }
        if header.session_end() > file_len {
            return Err(TelemetryError::parse_error(
                "Session info",
                format!("region ends at {} beyond file length {}", header.session_end(), file_len),
            ));
        }
        reader.seek(SeekFrom::Start(header.session.offset as u64))?;
        let mut raw = vec![0u8; header.session.len as usize];
        reader.read_exact(&mut raw)?;
        let yaml = yaml_from_bytes(&raw);
        Ok((!yaml.trim().is_empty()).then_some(yaml))
    }

    fn resolve_first_valid_sample(&mut self) -> Result<()> {
        let Some(tick_idx) = self.table.index_of(KnownVar::SessionTick.name()) else {
            warn!("Recording has no SessionTick channel, every row counts as valid");
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            if self.sample_count > 0 {
                self.read_row(&mut state, 0)?;
            }
            return Ok(());
        };

        let found = {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            let mut found = None;
            for idx in 0..self.sample_count {
                self.read_row(&mut state, idx)?;
                let tick = self.row_value(&state, tick_idx).map(i32::from_value);
                match tick {
                    Some(tick) if tick >= 0 && !is_magic_tick(tick) => {
                        found = Some((idx, tick));
                        break;
                    }
                    Some(tick) if is_magic_tick(tick) => {
                        debug!(idx, tick = format_args!("{:#010x}", tick), "Skipping row with magic tick")
                    }
                    _ => trace!(idx, tick, "Skipping row with invalid tick"),
                }
            }
            if let Some((idx, _)) = found {
                state.sample_index = idx;
            }
            found
        };

        let Some((idx, tick)) = found else {
            return Err(TelemetryError::parse_error(
                "First valid sample",
                format!("none of {} rows carries a valid SessionTick", self.sample_count),
            ));
        };
        if idx > 0 {
            warn!(skipped = idx, tick, "Skipped leading rows without a valid tick");
        }
        self.sample_index_valid_offset = idx;
        self.tick_sample_index_offset = tick;
        Ok(())
    }

    fn read_row(&self, state: &mut DiskState<R>, idx: usize) -> Result<()> {
        let len = self.table.buf_len();
        let offset = self.data_offset + (idx as u64) * len as u64;
        let DiskState { reader, row, row_index, .. } = state;
        *row_index = None;
        reader.seek(SeekFrom::Start(offset))?;
        row.reset();
        row.fill_from(reader, len).map_err(|e| {
            TelemetryError::parse_error("Sample row", format!("row {} at {}: {}", idx, offset, e))
        })?;
        *row_index = Some(idx);
        Ok(())
    }

    fn row_value(&self, state: &DiskState<R>, idx: usize) -> Option<Value> {
        state.row_index?;
        self.table.read_value(state.row.as_slice(), idx, 0)
    }

    fn known_idx(&self, var: KnownVar) -> Result<usize> {
        self.table
            .index_of(var.name())
            .ok_or_else(|| TelemetryError::not_found(format!("{} channel", var.name())))
    }

    /// Session string for the current row, with the key it is cached under.
    fn select_session_source<'a>(&'a self, state: &DiskState<R>) -> Option<(SessionSource, &'a str)> {
        if self.overrides.is_empty() {
            return self.embedded_yaml.as_deref().map(|yaml| (SessionSource::Embedded, yaml));
        }

        let tick = self
            .table
            .index_of(KnownVar::SessionTick.name())
            .and_then(|idx| self.row_value(state, idx))
            .map(i32::from_value);
        let idx = match tick {
            Some(tick) if !is_magic_tick(tick) => select_override(&self.overrides, tick)?,
            other => {
                warn!(tick = ?other, "No usable tick for session override selection");
                if state.session.selected.is_some() {
                    return None;
                }
                0
            }
        };
        let chosen = &self.overrides[idx];
        trace!(tick = ?tick, override_tick = chosen.tick, file = %chosen.file_name, "Selected session override");
        Some((SessionSource::Override(chosen.tick), chosen.yaml.as_str()))
    }

    fn ensure_session_info(&self) {
        if let Err(e) = self.update_session_info() {
            warn!(client = %self.id, error = %e, "Failed to parse session info");
        }
    }
}

impl<R: Read + Seek + Send> Client for DiskClient<R> {
    fn client_id(&self) -> ClientId {
        self.id.clone()
    }

    fn is_available(&self) -> bool {
        !self.state.lock().borrow().closed
    }

    fn var_table(&self) -> Option<Arc<VariableTable>> {
        Some(self.table.clone())
    }

    fn read_value(&self, idx: usize, entry: usize) -> Option<Value> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.row_index?;
        self.table.read_value(state.row.as_slice(), idx, entry)
    }

    fn schema_generation(&self) -> u64 {
        // the table of a recording never changes
        0
    }

    fn session_info_str(&self) -> Result<String> {
        self.ensure_session_info();
        let guard = self.state.lock();
        let raw = guard.borrow().session.raw.clone();
        raw.ok_or_else(|| TelemetryError::not_found("session info string"))
    }

    fn session_info(&self) -> Weak<SessionInfoMessage> {
        self.ensure_session_info();
        let guard = self.state.lock();
        let state = guard.borrow();
        state.session.parsed.as_ref().map(Arc::downgrade).unwrap_or_default()
    }

    fn session_info_with_update_count(&self) -> Option<(u64, Weak<SessionInfoMessage>)> {
        self.ensure_session_info();
        let guard = self.state.lock();
        let state = guard.borrow();
        let session = &state.session;
        session.parsed.as_ref().map(|parsed| (session.update_count, Arc::downgrade(parsed)))
    }
}

impl<R> std::fmt::Debug for DiskClient<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskClient")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("sample_count", &self.sample_count)
            .field("sample_index_valid_offset", &self.sample_index_valid_offset)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        CountingParser, MAGIC_TICK, SAMPLE_SESSION_YAML, TestRow, consecutive_rows, ibt_bytes, ibt_with_layout,
        track_yaml,
    };
    use crate::{ErrorKind, VariableType};
    use proptest::prelude::*;
    use std::io::Cursor;

    type MemoryClient = DiskClient<Cursor<Vec<u8>>>;

    fn client(rows: &[TestRow], options: DiskClientOptions) -> MemoryClient {
        let bytes = ibt_bytes(rows, SAMPLE_SESSION_YAML).unwrap();
        DiskClient::from_reader(Cursor::new(bytes), options).unwrap()
    }

    fn tick(client: &MemoryClient) -> Option<i32> {
        client.get_var_int(client.var_idx_known(KnownVar::SessionTick)?, 0)
    }

    fn with_leading_garbage(count: usize) -> Vec<TestRow> {
        let mut rows = vec![TestRow::at(MAGIC_TICK), TestRow::at(-1), TestRow::at(MAGIC_TICK)];
        rows.extend(consecutive_rows(100, count));
        rows
    }

    #[test]
    fn skips_leading_rows_with_sentinel_ticks() {
        let _ = tracing_subscriber::fmt::try_init();
        let client = client(&with_leading_garbage(5), DiskClientOptions::default());
        assert_eq!(client.sample_count(), 8);
        assert_eq!(client.sample_index_valid_offset(), 3);
        assert_eq!(client.tick_sample_index_offset(), 100);
        assert_eq!(client.sample_index(), 3);
        assert_eq!(tick(&client), Some(100));
    }

    #[test]
    fn next_advances_only_when_not_read_only() {
        let client = client(&consecutive_rows(0, 4), DiskClientOptions::default());
        assert!(client.next(true).unwrap());
        assert!(client.next(true).unwrap());
        assert_eq!(client.sample_index(), 0);

        assert!(client.next(false).unwrap());
        assert_eq!(client.sample_index(), 1);
        assert_eq!(tick(&client), Some(0));

        let mut seen = vec![];
        while client.next(false).unwrap() {
            seen.push(tick(&client).unwrap());
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(!client.has_next());
        assert!(!client.next(true).unwrap());
    }

    #[test]
    fn seek_clamps_to_first_valid_row() {
        let client = client(&with_leading_garbage(5), DiskClientOptions::default());
        client.seek(0, false).unwrap();
        assert_eq!(client.sample_index(), 3);
        assert_eq!(tick(&client), Some(100));

        client.seek(6, false).unwrap();
        assert_eq!(tick(&client), Some(103));

        // skip_read moves the cursor but keeps the loaded row
        client.seek(4, true).unwrap();
        assert_eq!(client.sample_index(), 4);
        assert_eq!(tick(&client), Some(103));
        assert!(client.next(false).unwrap());
        assert_eq!(tick(&client), Some(101));
    }

    #[test]
    fn seek_past_end_fails() {
        let client = client(&consecutive_rows(0, 3), DiskClientOptions::default());
        assert_eq!(client.seek(4, true).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(client.seek(3, false).is_err());
        client.seek(3, true).unwrap();
        assert!(!client.has_next());
    }

    #[test]
    fn seek_to_session_requires_time_remaining() {
        let mut rows = consecutive_rows(0, 4);
        rows.extend((4..6).map(|t| TestRow::at(t).in_session(1, 0.0)));
        rows.extend((6..9).map(|t| TestRow::at(t).in_session(1, 30.0)));
        let client = client(&rows, DiskClientOptions::default());

        client.seek_to_session_num(1).unwrap();
        assert_eq!(client.sample_index(), 6);
        assert_eq!(tick(&client), Some(6));

        let err = client.seek_to_session_num(3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(client.sample_index(), 6);
        assert_eq!(tick(&client), Some(6));
    }

    #[test]
    fn seek_to_session_scans_forward_only() {
        let mut rows: Vec<_> = (0..3).map(|t| TestRow::at(t).in_session(0, 10.0)).collect();
        rows.extend((3..6).map(|t| TestRow::at(t).in_session(1, 10.0)));
        let client = client(&rows, DiskClientOptions::default());
        client.seek(4, true).unwrap();
        assert!(client.seek_to_session_num(0).is_err());
        client.seek(0, true).unwrap();
        client.seek_to_session_num(0).unwrap();
        assert_eq!(client.sample_index(), 0);
    }

    #[test]
    fn embedded_session_info_is_parsed_once() {
        let parser = CountingParser::new();
        let client = client(&consecutive_rows(0, 3), DiskClientOptions::default()).with_parser(parser.clone());
        assert_eq!(parser.calls(), 0);

        let info = client.session_info().upgrade().unwrap();
        assert_eq!(info.track_name(), Some("spa 2024 up"));
        client.next(false).unwrap();
        let (count, _) = client.session_info_with_update_count().unwrap();
        assert_eq!(count, 1);
        assert_eq!(parser.calls(), 1);
        assert!(client.session_info_str().unwrap().contains("WeekendInfo"));
    }

    #[test]
    fn overrides_follow_current_tick() {
        let parser = CountingParser::new();
        let options = DiskClientOptions::default().with_session_overrides(vec![
            SessionInfoOverride::new(10, "a.yaml", track_yaml("Alpha")),
            SessionInfoOverride::new(50, "b.yaml", track_yaml("Bravo")),
            SessionInfoOverride::new(100, "c.yaml", track_yaml("Charlie")),
        ]);
        let client = client(&consecutive_rows(0, 120), options).with_parser(parser.clone());
        let track = |c: &MemoryClient| {
            c.session_info().upgrade().and_then(|s| s.track_name().map(str::to_owned))
        };

        client.seek(73, false).unwrap();
        assert_eq!(track(&client).as_deref(), Some("Bravo"));
        client.seek(5, false).unwrap();
        assert_eq!(track(&client).as_deref(), Some("Alpha"));
        client.seek(105, false).unwrap();
        assert_eq!(track(&client).as_deref(), Some("Charlie"));
        assert_eq!(parser.calls(), 3);

        // same override again: no reparse
        client.seek(110, false).unwrap();
        assert_eq!(track(&client).as_deref(), Some("Charlie"));
        assert!(!client.update_session_info().unwrap());
        assert_eq!(parser.calls(), 3);
        assert_eq!(client.session_info_with_update_count().unwrap().0, 3);
    }

    #[test]
    fn magic_tick_keeps_selected_override() {
        let rows = vec![TestRow::at(60), TestRow::at(MAGIC_TICK), TestRow::at(62)];
        let options = DiskClientOptions::default().with_session_overrides(vec![
            SessionInfoOverride::new(0, "a.yaml", track_yaml("Alpha")),
            SessionInfoOverride::new(61, "b.yaml", track_yaml("Bravo")),
        ]);
        let client = client(&rows, options);
        client.next(false).unwrap();
        assert!(client.update_session_info().unwrap());

        client.next(false).unwrap();
        assert_eq!(tick(&client), Some(MAGIC_TICK));
        assert!(!client.update_session_info().unwrap());
        assert_eq!(client.session_info().upgrade().unwrap().track_name(), Some("Alpha"));

        client.next(false).unwrap();
        assert!(client.update_session_info().unwrap());
        assert_eq!(client.session_info().upgrade().unwrap().track_name(), Some("Bravo"));
    }

    #[test]
    fn magic_tick_before_any_selection_uses_first_override() {
        let rows = vec![TestRow::at(60), TestRow::at(MAGIC_TICK), TestRow::at(62)];
        let options = DiskClientOptions::default().with_session_overrides(vec![
            SessionInfoOverride::new(10, "a.yaml", track_yaml("Alpha")),
            SessionInfoOverride::new(61, "b.yaml", track_yaml("Bravo")),
        ]);
        let client = client(&rows, options);
        client.seek(1, false).unwrap();
        assert_eq!(tick(&client), Some(MAGIC_TICK));

        assert!(client.update_session_info().unwrap());
        assert_eq!(client.session_info().upgrade().unwrap().track_name(), Some("Alpha"));
        assert!(!client.update_session_info().unwrap());
    }

    #[test]
    fn recordings_without_tick_channel_still_yield_samples() {
        let table = Arc::new(VariableTable::from_layout([("Speed", VariableType::Float, 1)]).unwrap());
        let rows: Vec<_> = [10.0f32, 20.0, 30.0]
            .iter()
            .map(|speed| vec![("Speed", Value::Float(*speed))])
            .collect();
        let bytes = ibt_with_layout(table, &rows).unwrap();
        let client = DiskClient::from_reader(Cursor::new(bytes), DiskClientOptions::default()).unwrap();
        assert_eq!(client.sample_count(), 3);

        let mut speeds = Vec::new();
        let mut ticks = Vec::new();
        while client.next(false).unwrap() {
            let sample = client.sample().unwrap();
            speeds.push(sample.get::<f32>("Speed", 0).unwrap());
            ticks.push(sample.tick);
        }
        assert_eq!(speeds, vec![10.0, 20.0, 30.0]);
        assert_eq!(ticks, vec![0, 1, 2]);
    }

    #[test]
    fn override_parse_failure_is_a_parse_error() {
        let options = DiskClientOptions::default()
            .with_session_override(SessionInfoOverride::new(0, "bad.yaml", "WeekendInfo: [oops"));
        let client = client(&consecutive_rows(0, 2), options);
        let err = client.update_session_info().unwrap_err();
        assert!(matches!(err, TelemetryError::Parse { .. }));
        assert_eq!(client.session_info_str().unwrap(), "WeekendInfo: [oops");
        assert!(client.session_info().upgrade().is_none());
        // the failed selection is not retried every frame
        assert!(!client.update_session_info().unwrap());
    }

    #[test]
    fn typed_reads_through_client_trait() {
        let mut row = TestRow::at(7);
        row.rpm = 2.7;
        row.on_pit_road = true;
        let client = client(&[row], DiskClientOptions::default());

        let rpm = client.var_idx("RPM").unwrap();
        assert_eq!(client.get_var_int(rpm, 0), Some(2));
        assert_eq!(client.get_var_bool(rpm, 0), Some(true));
        assert_eq!(client.get_var_double(rpm, 0).map(|v| v as f32), Some(2.7));
        assert_eq!(client.var_type(client.var_idx("OnPitRoad").unwrap()), Some(VariableType::Bool));
        assert_eq!(client.get_var_bool(client.var_idx("OnPitRoad").unwrap(), 0), Some(true));
        assert_eq!(client.get_var_int(client.var_idx("CarIdxLap").unwrap(), 4), None);
        assert_eq!(client.var_name(rpm).as_deref(), Some("RPM"));
        assert_eq!(client.var_desc(999), None);
        assert!(client.is_available());
        client.close();
        assert!(!client.is_available());
        assert_eq!(client.get_var_int(rpm, 0), None);
    }

    #[test]
    fn truncated_file_is_rejected_when_validating() {
        let mut bytes = ibt_bytes(&consecutive_rows(0, 4), "").unwrap();
        let row_len = crate::test_utils::test_table().buf_len();
        bytes.truncate(bytes.len() - row_len / 2);

        let err = DiskClient::from_reader(Cursor::new(bytes.clone()), DiskClientOptions::default()).unwrap_err();
        assert!(matches!(err, TelemetryError::Parse { .. }));

        let lenient = DiskClient::from_reader(
            Cursor::new(bytes),
            DiskClientOptions::default().with_validate_sample_count(false),
        )
        .unwrap();
        assert_eq!(lenient.sample_count(), 3);
        assert_eq!(lenient.session_info_str().unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn recording_without_valid_rows_fails_to_open() {
        let bytes = ibt_bytes(&[TestRow::at(MAGIC_TICK), TestRow::at(-5)], "").unwrap();
        let err = DiskClient::from_reader(Cursor::new(bytes), DiskClientOptions::default()).unwrap_err();
        assert!(matches!(err, TelemetryError::Parse { .. }));
    }

    #[test]
    fn garbage_is_a_domain_error() {
        let err = DiskClient::from_reader(Cursor::new(vec![0xFFu8; 64]), DiskClientOptions::default())
            .unwrap_err();
        assert!(matches!(err, TelemetryError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = DiskClient::open("/definitely/not/here.ibt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn opens_from_disk() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("spa.ibt");
        crate::test_utils::write_ibt(&path, &consecutive_rows(0, 10), SAMPLE_SESSION_YAML)?;
        let client = DiskClient::open(&path)?;
        assert_eq!(client.path(), Some(path.as_path()));
        assert_eq!(client.sample_count(), 10);
        assert_eq!(client.tick_rate(), 60);
        assert_eq!(client.disk_sub_header().sample_count, 10);
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_read_only_next_never_moves_cursor(target in 0usize..11, reads in 1usize..4) {
            let client = client(&with_leading_garbage(8), DiskClientOptions::default());
            client.seek(target, false).unwrap();
            let expected = target.max(3);
            prop_assert_eq!(client.sample_index(), expected);
            for _ in 0..reads {
                prop_assert!(client.next(true).unwrap());
                prop_assert_eq!(client.sample_index(), expected);
            }
            prop_assert!(client.next(false).unwrap());
            prop_assert_eq!(client.sample_index(), expected + 1);
        }
    }
}
