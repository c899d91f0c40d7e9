use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::rest::descriptor::Descriptor;
use crate::rest::entity::{EntityId, Record};
use crate::rest::entitydefinition::EntityDefinition;
use crate::rest::stubs::ApiStubs;

/// Normalized entity cache.
pub mod entitycache;
/// In-flight and completed fetch bookkeeping.
pub mod ledger;

pub use entitycache::{EntityCache, EntitySection};
pub use ledger::{RequestLedger, Ticket};

/// Everything guarded by the store lock.
#[derive(Default)]
pub struct StoreState {
    pub cache: EntityCache,
    pub ledger: RequestLedger,
    pub stubs: ApiStubs,
}

/// Shared cache, ledger and stubs used by every dispatcher of one client.
///
/// All mutation goes through a single lock, held only between suspension
/// points and never across an `.await`.
#[derive(Clone, Default)]
pub struct Store {
    state: Arc<Mutex<StoreState>>,
}

impl Store {
    pub fn create() -> Self {
        Self::default()
    }

    /// Drop every cached record, ledger entry and stub.
    pub fn reset(&self) {
        *self.state.lock() = StoreState::default();
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock()
    }

    /// Merge records into the cache without a request.
    pub fn load_entities<I>(&self, definition: &EntityDefinition, records: I) -> usize
    where
        I: IntoIterator<Item = Record>,
    {
        self.lock().cache.merge(definition, records)
    }

    /// Evict the cache section of `entity`. Completed descriptors stay
    /// completed and in-flight fetches still merge when they resolve.
    pub fn flush(&self, entity: &str) {
        self.lock().cache.flush(entity);
    }

    /// Forget which fetches completed, so the next read of each goes to the
    /// network.
    pub fn flush_request_cache(&self) {
        self.lock().ledger.clear_completed();
    }

    /// Copy of the cache section of `entity`, empty if never loaded.
    pub fn entity_cache(&self, entity: &str) -> EntitySection {
        self.lock().cache.section(entity).cloned().unwrap_or_default()
    }

    pub fn by_id(&self, entity: &str, id: &EntityId) -> Option<Record> {
        self.lock().cache.get(entity, id).cloned()
    }

    pub fn is_in_flight(&self, descriptor: &Descriptor) -> bool {
        self.lock().ledger.is_in_flight(descriptor)
    }

    pub fn is_completed(&self, descriptor: &Descriptor) -> bool {
        self.lock().ledger.is_completed(descriptor)
    }

    pub fn stub_entity(&self, entity: &str, records: Vec<Record>) {
        self.lock().stubs.stub_entity(entity, records);
    }

    pub fn restore_stub(&self, entity: &str) {
        self.lock().stubs.restore(entity);
    }

    pub fn set_stub_delay(&self, delay: Option<Duration>) {
        self.lock().stubs.set_delay(delay);
    }
}
