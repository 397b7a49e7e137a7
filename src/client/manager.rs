//! Registry of the clients alive in a process.
//!
//! The registry never keeps a client alive: entries hold a `Weak` and
//! resolve to `None` once the client is dropped, at which point they are
//! pruned. Each registration also gets a slot in a small arena; the
//! [`ClientHandle`] returned by [`ClientManager::add`] carries the slot's
//! generation, so a handle issued for a removed or replaced client never
//! resolves to its successor.
//!
//! All access goes through one re-entrant lock. A thread that already holds
//! it (inside [`ClientManager::transaction`], or a client whose `Drop` calls
//! [`ClientManager::remove`] while the manager is mid-operation) can call
//! back in without deadlocking. No `RefCell` borrow is held while a client
//! is upgraded or dropped, so those re-entrant calls cannot observe a live
//! borrow either.

use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

use super::{Client, ClientId};
use crate::{Result, TelemetryError};

/// Generation-checked reference to a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientHandle {
    slot: u32,
    generation: u32,
}

struct Slot {
    id: Option<ClientId>,
    generation: u32,
    client: Option<Weak<dyn Client>>,
}

#[derive(Default)]
struct Registry {
    slots: Vec<Slot>,
    free: Vec<usize>,
    by_id: HashMap<ClientId, usize>,
    active: Option<ClientId>,
}

impl Registry {
    fn release(&mut self, slot_idx: usize) -> Option<Weak<dyn Client>> {
        let slot = &mut self.slots[slot_idx];
        slot.id = None;
        slot.generation = slot.generation.wrapping_add(1);
        let client = slot.client.take();
        self.free.push(slot_idx);
        client
    }
}

#[derive(Default)]
pub struct ClientManager {
    inner: ReentrantMutex<RefCell<Registry>>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` under `id`, replacing any previous registration of
    /// the same id.
    pub fn add(&self, id: ClientId, client: Weak<dyn Client>, make_active: bool) -> ClientHandle {
        let guard = self.inner.lock();
        let (handle, replaced) = {
            let mut reg = guard.borrow_mut();
            let replaced = reg.by_id.remove(&id).and_then(|idx| reg.release(idx));

            let slot_idx = match reg.free.pop() {
                Some(idx) => idx,
                None => {
                    reg.slots.push(Slot { id: None, generation: 0, client: None });
                    reg.slots.len() - 1
                }
            };
            let slot = &mut reg.slots[slot_idx];
            slot.id = Some(id.clone());
            slot.client = Some(client);
            let handle = ClientHandle { slot: slot_idx as u32, generation: slot.generation };

            reg.by_id.insert(id.clone(), slot_idx);
            if make_active {
                reg.active = Some(id.clone());
            }
            (handle, replaced)
        };
        debug!(client = %id, make_active, replaced = replaced.is_some(), "Registered client");
        drop(replaced);
        handle
    }

    /// Unregister `id`. Clears the active designation when `id` was active.
    pub fn remove(&self, id: &ClientId) -> bool {
        let guard = self.inner.lock();
        let removed = {
            let mut reg = guard.borrow_mut();
            let removed = reg.by_id.remove(id).and_then(|idx| reg.release(idx));
            if removed.is_some() && reg.active.as_ref() == Some(id) {
                reg.active = None;
            }
            removed
        };
        let found = removed.is_some();
        if found {
            debug!(client = %id, "Unregistered client");
        }
        drop(removed);
        found
    }

    /// Designate `id` as active. Fails with `NotFound` for unknown or
    /// already dropped clients.
    pub fn set_active(&self, id: &ClientId) -> Result<()> {
        let _guard = self.inner.lock();
        if self.get(id).is_none() {
            return Err(TelemetryError::not_found(format!("client '{}'", id)));
        }
        self.inner.lock().borrow_mut().active = Some(id.clone());
        debug!(client = %id, "Active client changed");
        Ok(())
    }

    pub fn get(&self, id: &ClientId) -> Option<Arc<dyn Client>> {
        let guard = self.inner.lock();
        let weak = {
            let reg = guard.borrow();
            let idx = *reg.by_id.get(id)?;
            reg.slots[idx].client.clone()?
        };
        self.upgrade_or_prune(id, weak)
    }

    /// Resolve a handle; `None` once its registration was removed, replaced
    /// or its client dropped.
    pub fn resolve(&self, handle: ClientHandle) -> Option<Arc<dyn Client>> {
        let guard = self.inner.lock();
        let (id, weak) = {
            let reg = guard.borrow();
            let slot = reg.slots.get(handle.slot as usize)?;
            if slot.generation != handle.generation {
                return None;
            }
            (slot.id.clone()?, slot.client.clone()?)
        };
        self.upgrade_or_prune(&id, weak)
    }

    pub fn get_active(&self) -> Option<Arc<dyn Client>> {
        let _guard = self.inner.lock();
        let id = self.active_id()?;
        self.get(&id)
    }

    pub fn active_id(&self) -> Option<ClientId> {
        self.inner.lock().borrow().active.clone()
    }

    /// Ids of every registration, including ones whose client has since
    /// been dropped but not yet pruned.
    pub fn ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<_> = self.inner.lock().borrow().by_id.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop registrations whose client is gone. Returns how many went.
    pub fn prune(&self) -> usize {
        let _guard = self.inner.lock();
        self.ids().into_iter().filter(|id| self.get(id).is_none()).count()
    }

    /// Run `f` with the registry lock held. Calls back into the manager
    /// from `f` are allowed.
    pub fn transaction<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.inner.lock();
        f(self)
    }

    fn upgrade_or_prune(&self, id: &ClientId, weak: Weak<dyn Client>) -> Option<Arc<dyn Client>> {
        match weak.upgrade() {
            Some(client) => Some(client),
            None => {
                trace!(client = %id, "Pruning dropped client");
                self.remove(id);
                None
            }
        }
    }
}

impl std::fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientManager")
            .field("clients", &self.ids())
            .field("active", &self.active_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SessionInfoMessage, VariableTable};
    use crate::Value;

    struct StubClient {
        id: ClientId,
        manager: Option<Arc<ClientManager>>,
    }

    impl StubClient {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self { id: id.into(), manager: None })
        }
    }

    impl Client for StubClient {
        fn client_id(&self) -> ClientId {
            self.id.clone()
        }
        fn is_available(&self) -> bool {
            true
        }
        fn var_table(&self) -> Option<Arc<VariableTable>> {
            None
        }
        fn read_value(&self, _: usize, _: usize) -> Option<Value> {
            None
        }
        fn schema_generation(&self) -> u64 {
            0
        }
        fn session_info_str(&self) -> Result<String> {
            Err(TelemetryError::not_found("session info"))
        }
        fn session_info(&self) -> Weak<SessionInfoMessage> {
            Weak::new()
        }
        fn session_info_with_update_count(&self) -> Option<(u64, Weak<SessionInfoMessage>)> {
            None
        }
    }

    impl Drop for StubClient {
        fn drop(&mut self) {
            if let Some(manager) = &self.manager {
                manager.remove(&self.id);
            }
        }
    }

    fn weak(client: &Arc<StubClient>) -> Weak<dyn Client> {
        let client: Arc<dyn Client> = client.clone();
        Arc::downgrade(&client)
    }

    #[test]
    fn removing_active_clears_it() {
        let manager = ClientManager::new();
        let a = StubClient::new("a");
        let b = StubClient::new("b");
        manager.add("a".into(), weak(&a), true);
        manager.add("b".into(), weak(&b), false);
        assert_eq!(manager.active_id(), Some("a".into()));

        assert!(manager.remove(&"a".into()));
        assert!(manager.get_active().is_none());
        assert!(manager.active_id().is_none());
        assert!(manager.get(&"b".into()).is_some());

        manager.set_active(&"b".into()).unwrap();
        assert_eq!(manager.get_active().unwrap().client_id(), "b".into());
    }

    #[test]
    fn set_active_requires_registration() {
        let manager = ClientManager::new();
        let err = manager.set_active(&"nope".into()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn dropped_clients_resolve_to_none_and_are_pruned() {
        let manager = ClientManager::new();
        let a = StubClient::new("a");
        let handle = manager.add("a".into(), weak(&a), true);
        assert!(manager.resolve(handle).is_some());

        drop(a);
        assert!(manager.get_active().is_none());
        assert!(manager.ids().is_empty());
        assert!(manager.resolve(handle).is_none());
    }

    #[test]
    fn stale_handles_do_not_see_replacements() {
        let manager = ClientManager::new();
        let first = StubClient::new("disk");
        let old = manager.add("disk".into(), weak(&first), false);
        let second = StubClient::new("disk");
        let new = manager.add("disk".into(), weak(&second), false);

        assert_ne!(old, new);
        assert!(manager.resolve(old).is_none());
        assert!(Arc::ptr_eq(
            &manager.resolve(new).unwrap(),
            &(second.clone() as Arc<dyn Client>)
        ));

        manager.remove(&"disk".into());
        let third = StubClient::new("other");
        let reused = manager.add("other".into(), weak(&third), false);
        assert!(manager.resolve(new).is_none());
        assert!(manager.resolve(reused).is_some());
    }

    #[test]
    fn drop_inside_transaction_can_unregister_itself() {
        let _ = tracing_subscriber::fmt::try_init();
        let manager = Arc::new(ClientManager::new());
        let client = Arc::new(StubClient { id: "live".into(), manager: Some(manager.clone()) });
        manager.add("live".into(), weak(&client), true);

        manager.transaction(|m| {
            let active = m.get_active().unwrap();
            drop(client);
            // still held by `active`
            assert!(m.get(&"live".into()).is_some());
            drop(active);
            assert!(m.get(&"live".into()).is_none());
        });
        assert!(manager.active_id().is_none());
        assert!(manager.ids().is_empty());
    }

    #[test]
    fn prune_counts_dropped() {
        let manager = ClientManager::new();
        let a = StubClient::new("a");
        let b = StubClient::new("b");
        manager.add("a".into(), weak(&a), false);
        manager.add("b".into(), weak(&b), false);
        drop(b);
        assert_eq!(manager.prune(), 1);
        assert_eq!(manager.ids(), vec![ClientId::from("a")]);
    }
}
