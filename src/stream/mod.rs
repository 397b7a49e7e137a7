//! Async sample streams over the blocking clients.
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use paddock::{DiskClient, UpdateRate, stream};
//! use std::sync::Arc;
//!
//! # async fn run() -> paddock::Result<()> {
//! let client = Arc::new(DiskClient::open("race.ibt")?);
//! let mut samples = stream::disk_samples(client, UpdateRate::Max(10));
//! while let Some(sample) = samples.next().await {
//!     println!("{:?}", sample.get::<f32>("Speed", 0));
//! }
//! # Ok(())
//! # }
//! ```

use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{DiskClient, LiveClient};
use crate::{Sample, UpdateRate};

mod throttle;

pub use throttle::{Throttle, ThrottleExt};

/// Boxed stream of row snapshots.
pub type SampleStream = BoxStream<'static, Sample>;

/// Tick rate assumed before a live header has been read.
const DEFAULT_TICK_RATE: i32 = 60;

/// Samples from a live client, waiting on the blocking pool. Ends when the
/// client is closed. With `UpdateRate::Max` the latest sample of each
/// interval is kept.
pub fn live_samples(client: Arc<LiveClient>, rate: UpdateRate) -> SampleStream {
    let tick_rate = client.header().map_or(DEFAULT_TICK_RATE, |h| h.tick_rate);
    let samples = stream::unfold(client, |client| async move {
        loop {
            if client.is_closed() {
                debug!("Live client closed, ending sample stream");
                return None;
            }
            let timeout = client.options().default_timeout;
            match client.wait_for_data_async(timeout).await {
                Ok(true) => {
                    if let Some(sample) = client.sample() {
                        return Some((sample, client));
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "Live sample stream failed");
                    return None;
                }
            }
        }
    });
    throttled(samples, rate, tick_rate)
}

/// Samples from a disk client, read from its cursor to the end. With
/// `UpdateRate::Max` rows are decimated to the requested rate of recorded
/// time rather than paced in wall time.
pub fn disk_samples(client: Arc<DiskClient>, rate: UpdateRate) -> SampleStream {
    let stride = match rate.normalize(client.tick_rate()) {
        UpdateRate::Native => 1,
        UpdateRate::Max(hz) => (client.tick_rate().max(1) as u32 / hz).max(1) as usize,
    };
    stream::unfold(client, move |client| async move {
        for _ in 1..stride {
            match client.next(false) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    warn!(error = %e, "Disk sample stream failed");
                    return None;
                }
            }
        }
        match client.next(false) {
            Ok(true) => client.sample().map(|sample| (sample, client)),
            Ok(false) => None,
            Err(e) => {
                warn!(error = %e, "Disk sample stream failed");
                None
            }
        }
    })
    .boxed()
}

fn throttled<S>(samples: S, rate: UpdateRate, tick_rate: i32) -> SampleStream
where
    S: Stream<Item = Sample> + Send + 'static,
{
    match rate.throttle_interval(tick_rate) {
        Some(interval) => samples.throttle(interval).boxed(),
        None => samples.boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DiskClientOptions, LiveClientOptions, MemorySource};
    use crate::schema::VariableTable;
    use crate::test_utils::{TestRow, consecutive_rows, ibt_bytes, ibt_with_layout, test_table};
    use crate::{KnownVar, Value, VariableType};
    use std::io::Cursor;

    fn disk(rows: usize) -> Arc<DiskClient<Cursor<Vec<u8>>>> {
        let bytes = ibt_bytes(&consecutive_rows(0, rows), "").unwrap();
        Arc::new(DiskClient::from_reader(Cursor::new(bytes), DiskClientOptions::default()).unwrap())
    }

    #[tokio::test]
    async fn disk_stream_decimates_by_tick_rate() -> anyhow::Result<()> {
        let bytes = ibt_bytes(&consecutive_rows(0, 120), "")?;
        let path = tempfile::NamedTempFile::new()?;
        std::fs::write(path.path(), bytes)?;
        let client = Arc::new(DiskClient::open(path.path())?);

        let ticks: Vec<i32> = disk_samples(client, UpdateRate::Max(10)).map(|s| s.tick).collect().await;
        assert_eq!(ticks.len(), 20);
        assert_eq!(&ticks[..3], &[5, 11, 17]);
        Ok(())
    }

    #[tokio::test]
    async fn disk_stream_without_tick_channel() -> anyhow::Result<()> {
        let table = Arc::new(VariableTable::from_layout([("Speed", VariableType::Float, 1)])?);
        let rows: Vec<_> = (0..3).map(|i| vec![("Speed", Value::Float(i as f32))]).collect();
        let path = tempfile::NamedTempFile::new()?;
        std::fs::write(path.path(), ibt_with_layout(table, &rows)?)?;
        let client = Arc::new(DiskClient::open(path.path())?);

        let speeds: Vec<f32> = disk_samples(client, UpdateRate::Native)
            .filter_map(|s| async move { s.get::<f32>("Speed", 0) })
            .collect()
            .await;
        assert_eq!(speeds, vec![0.0, 1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn in_memory_disk_client_serves_every_row() {
        let client = disk(4);
        let mut ticks = vec![];
        while client.next(false).unwrap() {
            ticks.push(client.sample().unwrap().tick);
        }
        assert_eq!(ticks, vec![0, 1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn live_stream_yields_published_rows() {
        let table = test_table();
        let source = Arc::new(MemorySource::new(&table));
        let client = Arc::new(LiveClient::new(source.clone(), LiveClientOptions::default()));
        let mut samples = live_samples(client.clone(), UpdateRate::Native);

        let row = TestRow::at(77);
        source.publish_row(row.tick, &row.encode(&table)).unwrap();
        let sample = samples.next().await.unwrap();
        assert_eq!(sample.get_known::<i32>(KnownVar::SessionTick, 0), Some(77));

        client.close();
        assert!(samples.next().await.is_none());
    }
}
