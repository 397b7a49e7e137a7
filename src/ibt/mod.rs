//! IBT file layout and recording support (cross-platform)
//!
//! Reading is done by [`DiskClient`](crate::client::disk::DiskClient); this
//! module owns the on-disk structures and the [`IbtWriter`] that produces them.

pub mod format;
pub mod writer;

pub use format::DiskSubHeader;
pub use writer::{IbtWriter, RowBuilder};
