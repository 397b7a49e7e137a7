//! A live client fed by an in-process producer.

mod common;

use anyhow::Context;
use futures::StreamExt;
use paddock::broadcast::{BroadcastMsg, PitCommand};
use paddock::{
    BroadcastCommand, Client, DiskClient, KnownVar, LiveClient, LiveClientOptions, LiveStatus,
    MemorySource, UpdateRate, stream,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn live(source: &Arc<MemorySource>) -> LiveClient {
    LiveClient::new(source.clone(), LiveClientOptions::default().with_client_id("sim"))
}

#[test]
fn producer_thread_replays_a_recording() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("replay.ibt");
    common::write_recording(&path, 20, 20)?;

    let disk = DiskClient::open(&path)?;
    let table = disk.var_table().context("table")?;
    let source = Arc::new(MemorySource::new(&table));
    source.set_session_info(common::SESSION_YAML)?;
    let client = live(&source);

    let producer = {
        let source = source.clone();
        thread::spawn(move || -> paddock::Result<()> {
            while disk.next(false)? {
                if let Some(sample) = disk.sample() {
                    source.publish_sample(&sample)?;
                }
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        })
    };

    let tick = KnownVar::SessionTick;
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = Vec::new();
    while Instant::now() < deadline {
        if client.wait_for_data(Duration::from_millis(100)) {
            seen.push(client.get_var_int(client.var_idx_known(tick).context("tick")?, 0).context("value")?);
            if seen.last() == Some(&139) {
                break;
            }
        }
    }
    producer.join().map_err(|_| anyhow::anyhow!("producer panicked"))??;

    assert_eq!(seen.last(), Some(&139));
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "ticks must increase: {seen:?}");
    let info = client.session_info().upgrade().context("session parsed")?;
    assert_eq!(info.track_name(), Some("monza full"));
    Ok(())
}

#[test]
fn new_session_resets_the_client() -> anyhow::Result<()> {
    let table = common::table();
    let source = Arc::new(MemorySource::new(&table));
    source.set_session_info(common::SESSION_YAML)?;
    let client = live(&source);

    source.publish_row(500, &common::row(&table, 500, 0, 1))?;
    assert!(client.wait_for_data(Duration::from_millis(50)));
    assert_eq!(client.status(), LiveStatus::Connected);
    let generation = client.schema_generation();
    let (count, _) = client.session_info_with_update_count().context("session")?;

    source.set_session_info("WeekendInfo:\n TrackName: imola\n")?;
    source.publish_row(501, &common::row(&table, 501, 0, 2))?;
    assert!(client.wait_for_data(Duration::from_millis(50)));
    assert!(client.schema_generation() > generation);
    let (new_count, info) = client.session_info_with_update_count().context("session")?;
    assert!(new_count > count);
    assert_eq!(info.upgrade().and_then(|i| i.track_name().map(str::to_owned)).as_deref(), Some("imola"));
    Ok(())
}

#[test]
fn no_producer_means_bounded_wait() {
    let source = Arc::new(MemorySource::disconnected());
    let client = live(&source);
    let started = Instant::now();
    assert!(!client.wait_for_data(Duration::from_millis(30)));
    assert!(started.elapsed() >= Duration::from_millis(25));
    assert!(!client.is_connected());
    assert_eq!(client.var_idx("RPM"), None);
}

#[test]
fn pit_commands_are_broadcast() -> anyhow::Result<()> {
    let source = Arc::new(MemorySource::new(&common::table()));
    let client = live(&source);
    client.broadcast(BroadcastCommand::Pit(PitCommand::Fuel(20)))?;
    client.broadcast(BroadcastCommand::Pit(PitCommand::ClearTires))?;

    let sent = source.broadcasts();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|m| m.message_id() == Some(BroadcastMsg::PitCommand)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn live_stream_delivers_published_rows() -> anyhow::Result<()> {
    let table = common::table();
    let source = Arc::new(MemorySource::new(&table));
    let client = Arc::new(live(&source));
    let mut samples = stream::live_samples(client.clone(), UpdateRate::Native);

    source.publish_row(7, &common::row(&table, 7, 0, 1))?;
    let sample = tokio::time::timeout(Duration::from_secs(5), samples.next())
        .await?
        .context("stream ended")?;
    assert_eq!(sample.tick, 7);
    assert_eq!(sample.get_known::<f32>(KnownVar::Rpm, 0), Some(4007.0));

    client.close();
    let end = tokio::time::timeout(Duration::from_secs(5), samples.next()).await?;
    assert!(end.is_none());
    Ok(())
}
