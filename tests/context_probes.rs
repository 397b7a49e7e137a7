//! Probes and the client registry across client swaps.

mod common;

use paddock::{
    AnyClient, Client, ClientId, DiskClientOptions, ErrorKind, KnownVar, LiveClientOptions,
    MemorySource, TelemetryContext,
};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn probes_survive_switching_between_live_and_disk() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("stint.ibt");
    common::write_recording(&path, 3, 0)?;

    let context = TelemetryContext::new();
    let gear = context.var_known(KnownVar::Gear);
    let rpm = context.var("RPM");
    assert!(!rpm.is_valid());

    context.open_disk(&path, DiskClientOptions::default())?;
    assert_eq!(rpm.get_float(0), Some(4100.0));
    assert_eq!(gear.get_int(0), Some(4));

    let table = common::table();
    let source = Arc::new(MemorySource::new(&table));
    let live = context.attach_live(source.clone(), LiveClientOptions::default());
    source.publish_row(9000, &common::row(&table, 9000, 1, 3))?;
    assert!(live.wait_for_data(Duration::from_millis(100)));

    context.set_active("live")?;
    assert_eq!(rpm.get_float(0), Some(13000.0));
    context.set_active("disk")?;
    assert_eq!(rpm.get_float(0), Some(4100.0));

    let pinned = context.var("RPM").for_client("live");
    assert_eq!(pinned.get_double(0), Some(13000.0));
    Ok(())
}

#[test]
fn closing_the_active_client_clears_it() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("a.ibt");
    common::write_recording(&path, 2, 0)?;

    let context = TelemetryContext::new();
    context.open_disk(&path, DiskClientOptions::default())?;
    let speed = context.var_known(KnownVar::Speed);
    assert_eq!(speed.get_float(0), Some(55.5));

    context.close(&ClientId::from("disk"))?;
    assert!(context.active().is_none());
    assert!(context.manager().get_active().is_none());
    assert_eq!(speed.get_float(0), None);

    let err = context.set_active("disk").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn variant_operations_are_not_implemented_on_the_other_variant() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("b.ibt");
    common::write_recording(&path, 2, 0)?;

    let context = TelemetryContext::new();
    context.open_disk(&path, DiskClientOptions::default())?;
    let source = Arc::new(MemorySource::new(&common::table()));
    context.attach_live(source, LiveClientOptions::default());

    let disk = context.client(&"disk".into()).expect("disk registered");
    let live = context.client(&"live".into()).expect("live registered");
    assert!(matches!(disk, AnyClient::Disk(_)));

    let err = disk.wait_for_data(Duration::from_millis(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
    let err = live.seek(0, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
    assert!(disk.next(false)?);
    assert_eq!(disk.client_id(), ClientId::from("disk"));
    Ok(())
}
