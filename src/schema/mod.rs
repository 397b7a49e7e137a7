//! Self-describing telemetry layout.
//!
//! Shared memory and `.ibt` files share one layout: a fixed [`DataHeader`],
//! a table of [`VarHeader`] entries that describes every channel's type and
//! position within a row, the session YAML, and the rows themselves. The
//! table is read once per connection or file and never changes afterwards;
//! rows are meaningless without it.

pub mod header;
pub(crate) mod layout;
pub mod session;
pub mod variables;

pub use header::{ConnectionStatus, DataHeader, SessionDetails, VarBufDescriptor};
pub use session::{SessionInfoMessage, SessionInfoParser, YamlSessionInfoParser};
pub use variables::{VarHeader, VariableTable};
