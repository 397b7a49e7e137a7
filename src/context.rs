//! The object a host builds once at start-up and hands to everything that
//! needs telemetry.
//!
//! It owns the clients (the [`ClientManager`] only holds weak references)
//! and keeps the manager's registrations in step with that ownership: a
//! client closed or replaced here disappears from the manager too.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::client::{
    AnyClient, Client, ClientId, ClientManager, DiskClient, DiskClientOptions, LiveClient,
    LiveClientOptions, TelemetrySource,
};
use crate::var_holder::VarHolder;
use crate::{KnownVar, Result, TelemetryError};

#[derive(Default)]
pub struct TelemetryContext {
    manager: Arc<ClientManager>,
    clients: Mutex<HashMap<ClientId, AnyClient>>,
}

impl TelemetryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manager(&self) -> &Arc<ClientManager> {
        &self.manager
    }

    /// Build a live client over `source` and register it. It becomes the
    /// active client when none is active yet.
    pub fn attach_live(
        &self,
        source: Arc<dyn TelemetrySource>,
        options: LiveClientOptions,
    ) -> Arc<LiveClient> {
        let client = Arc::new(LiveClient::new(source, options));
        self.insert(AnyClient::Live(client.clone()));
        client
    }

    /// Attach to the simulator's shared memory.
    pub fn connect_live(&self, options: LiveClientOptions) -> Result<Arc<LiveClient>> {
        let client = Arc::new(LiveClient::connect_shared_memory(options)?);
        self.insert(AnyClient::Live(client.clone()));
        Ok(client)
    }

    /// The first registered live client, if any.
    pub fn live(&self) -> Option<Arc<LiveClient>> {
        let clients = self.clients.lock();
        clients.values().filter_map(AnyClient::as_live).min_by_key(|c| c.client_id()).cloned()
    }

    pub fn open_disk(
        &self,
        path: impl AsRef<Path>,
        options: DiskClientOptions,
    ) -> Result<Arc<DiskClient>> {
        let client = Arc::new(DiskClient::open_with(path, options)?);
        self.add_disk(client.clone());
        Ok(client)
    }

    pub fn add_disk(&self, client: Arc<DiskClient>) {
        self.insert(AnyClient::Disk(client));
    }

    pub fn client(&self, id: &ClientId) -> Option<AnyClient> {
        self.clients.lock().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<_> = self.clients.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Close and drop the client registered as `id`.
    pub fn close(&self, id: &ClientId) -> Result<()> {
        let client = self
            .clients
            .lock()
            .remove(id)
            .ok_or_else(|| TelemetryError::not_found(format!("client '{}'", id)))?;
        match &client {
            AnyClient::Live(live) => live.close(),
            AnyClient::Disk(disk) => disk.close(),
        }
        self.manager.remove(id);
        info!(client = %id, "Closed client");
        Ok(())
    }

    pub fn active(&self) -> Option<Arc<dyn Client>> {
        self.manager.get_active()
    }

    pub fn set_active(&self, id: impl Into<ClientId>) -> Result<()> {
        self.manager.set_active(&id.into())
    }

    /// A probe for `name` that follows the active client.
    pub fn var(&self, name: impl Into<String>) -> VarHolder {
        VarHolder::new(name, self.manager.clone())
    }

    pub fn var_known(&self, var: KnownVar) -> VarHolder {
        VarHolder::known(var, self.manager.clone())
    }

    fn insert(&self, client: AnyClient) {
        let id = client.client_id();
        let make_active = self.manager.active_id().is_none();
        // register before the previous owner is dropped so the manager
        // never sees a gap for this id
        self.manager.add(id.clone(), client.downgrade(), make_active);
        let replaced = self.clients.lock().insert(id.clone(), client);
        debug!(client = %id, make_active, replaced = replaced.is_some(), "Attached client");
    }
}

impl std::fmt::Debug for TelemetryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryContext")
            .field("clients", &self.ids())
            .field("active", &self.manager.active_id())
            .finish()
    }
}
