//! Type-safe access to iRacing telemetry, live or recorded.
//!
//! Paddock reads the sim's shared-memory telemetry (Windows) and `.ibt`
//! recordings (any platform) through one [`Client`] interface: channel
//! lookup by name, typed reads of the current row and the parsed session
//! info YAML.
//!
//! # Features
//!
//! - **Live telemetry**: triple-buffered rows copied tear-free from the
//!   sim, with session reset detection
//! - **Disk playback**: cursor, seek and session lookup over `.ibt` files,
//!   with optional tick-stamped session info overrides
//! - **Best-effort probes**: [`VarHolder`] keeps reading the active client
//!   across client swaps and returns `None` instead of failing
//! - **Async streams**: [`stream`] turns either client into a throttled
//!   `Stream` of [`Sample`]s
//!
//! ## Example (IBT playback)
//!
//! ```rust,no_run
//! use paddock::{Client, DiskClient, KnownVar};
//!
//! fn main() -> paddock::Result<()> {
//!     let client = DiskClient::open("/path/to/session.ibt")?;
//!     let speed = client.var_idx_known(KnownVar::Speed);
//!     while client.next(false)? {
//!         if let Some(speed) = speed.and_then(|idx| client.get_var_float(idx, 0)) {
//!             println!("{speed:.1} m/s");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Example (streaming)
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use paddock::{DiskClient, KnownVar, UpdateRate, stream};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(DiskClient::open("/path/to/session.ibt")?);
//!     let mut samples = stream::disk_samples(client, UpdateRate::Max(10));
//!     while let Some(sample) = samples.next().await {
//!         println!("{:?}", sample.get_known::<f32>(KnownVar::Rpm, 0));
//!     }
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod buffer;
pub mod client;
pub mod context;
mod error;
pub mod ibt;
pub mod logging;
pub mod schema;
pub mod stream;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;
pub mod var_holder;
mod yaml_utils;

pub use error::*;
pub use types::*;

pub use broadcast::BroadcastCommand;
pub use buffer::Buffer;
pub use client::{
    AnyClient, Client, ClientHandle, ClientId, ClientManager, DiskClient, DiskClientOptions,
    LiveClient, LiveClientOptions, LiveStatus, MemorySource, SessionInfoOverride, TelemetrySource,
    read_var,
};
pub use context::TelemetryContext;
pub use schema::{
    DataHeader, SessionInfoMessage, SessionInfoParser, VarHeader, VariableTable,
    YamlSessionInfoParser,
};
pub use var_holder::VarHolder;
