//! Named channel probes that survive client swaps.
//!
//! A [`VarHolder`] remembers a channel name and looks it up on whichever
//! client the [`ClientManager`] currently designates (or on one named
//! client). The index, type and count are cached after the first lookup and
//! rebound when the client or its schema generation changes. Every getter
//! returns `None` when there is no client, the channel does not exist or
//! the entry is out of range.
//!
//! ```
//! use paddock::{ClientManager, KnownVar, VarHolder};
//! use std::sync::Arc;
//!
//! let manager = Arc::new(ClientManager::new());
//! let speed = VarHolder::known(KnownVar::Speed, manager);
//! assert_eq!(speed.get_float(0), None);
//! ```

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::trace;

use crate::client::{Client, ClientId, ClientManager};
use crate::schema::VariableTable;
use crate::{BitField, KnownVar, Value, VarData, VariableType};

#[derive(Debug, Clone)]
struct Binding {
    client: ClientId,
    generation: u64,
    // a replacement client may reuse the id and generation
    table: Weak<VariableTable>,
    idx: usize,
    var_type: VariableType,
    count: usize,
}

pub struct VarHolder {
    name: String,
    manager: Arc<ClientManager>,
    target: Option<ClientId>,
    binding: Mutex<Option<Binding>>,
}

impl VarHolder {
    /// Probe `name` on the active client.
    pub fn new(name: impl Into<String>, manager: Arc<ClientManager>) -> Self {
        Self { name: name.into(), manager, target: None, binding: Mutex::new(None) }
    }

    pub fn known(var: KnownVar, manager: Arc<ClientManager>) -> Self {
        Self::new(var.name(), manager)
    }

    /// Probe a specific registered client instead of the active one.
    pub fn for_client(mut self, id: impl Into<ClientId>) -> Self {
        self.target = Some(id.into());
        *self.binding.get_mut() = None;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The client reads currently go to.
    pub fn client(&self) -> Option<Arc<dyn Client>> {
        match &self.target {
            Some(id) => self.manager.get(id),
            None => self.manager.get_active(),
        }
    }

    /// Whether the channel resolves on the current client.
    pub fn is_valid(&self) -> bool {
        self.bind().is_some()
    }

    pub fn var_type(&self) -> Option<VariableType> {
        self.bind().map(|(_, b)| b.var_type)
    }

    pub fn count(&self) -> Option<usize> {
        self.bind().map(|(_, b)| b.count)
    }

    /// Raw value of `entry` in its stored type.
    pub fn value(&self, entry: usize) -> Option<Value> {
        let (client, binding) = self.bind()?;
        if entry >= binding.count {
            return None;
        }
        client.read_value(binding.idx, entry)
    }

    pub fn get<T: VarData>(&self, entry: usize) -> Option<T> {
        self.value(entry).map(T::from_value)
    }

    pub fn get_bool(&self, entry: usize) -> Option<bool> {
        self.get(entry)
    }

    pub fn get_int(&self, entry: usize) -> Option<i32> {
        self.get(entry)
    }

    pub fn get_float(&self, entry: usize) -> Option<f32> {
        self.get(entry)
    }

    pub fn get_double(&self, entry: usize) -> Option<f64> {
        self.get(entry)
    }

    pub fn get_bitfield(&self, entry: usize) -> Option<BitField> {
        self.get(entry)
    }

    fn bind(&self) -> Option<(Arc<dyn Client>, Binding)> {
        let client = self.client()?;
        if !client.is_available() {
            return None;
        }
        let id = client.client_id();
        let generation = client.schema_generation();
        let table = client.var_table()?;

        let mut cached = self.binding.lock();
        if let Some(binding) = cached.as_ref() {
            if binding.client == id
                && binding.generation == generation
                && std::ptr::eq(binding.table.as_ptr(), Arc::as_ptr(&table))
            {
                return Some((client, binding.clone()));
            }
        }

        let idx = client.var_idx(&self.name);
        let binding = idx.and_then(|idx| {
            Some(Binding {
                client: id.clone(),
                generation,
                table: Arc::downgrade(&table),
                idx,
                var_type: client.var_type(idx)?,
                count: client.var_count(idx)?,
            })
        });
        trace!(name = %self.name, client = %id, generation, idx, "Bound channel");
        *cached = binding.clone();
        binding.map(|binding| (client, binding))
    }
}

impl std::fmt::Debug for VarHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarHolder")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("binding", &*self.binding.lock())
            .finish()
    }
}
