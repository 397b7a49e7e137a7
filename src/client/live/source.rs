//! Where a [`LiveClient`](super::LiveClient) gets its bytes from.

use std::time::Duration;

use crate::Result;
use crate::broadcast::BroadcastMessage;

/// A header-prefixed telemetry segment plus its "new data" signal.
///
/// Implementations: the sim's shared memory on Windows, and
/// [`MemorySource`](super::MemorySource) in process.
pub trait TelemetrySource: Send + Sync {
    /// Block until the producer signals new data or `timeout` elapses.
    /// Returns whether the signal fired.
    fn wait_for_data(&self, timeout: Duration) -> bool;

    /// Size of the segment in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `out.len()` bytes starting at `offset`. Returns `false` without
    /// copying when the range falls outside the segment.
    fn read_at(&self, offset: usize, out: &mut [u8]) -> bool;

    /// Post a command to the sim.
    fn broadcast(&self, message: BroadcastMessage) -> Result<()>;
}
