use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use super::enrich::{self, ADDRESS_FIELD, INSTALLER_FIELD, SALES_ORDER_FIELD};
use super::kinds::{Address, Installer, LookupKind, LookupRecord, SalesOrder};
use crate::api::{payload, ApiError, Gateway};
use crate::config::LookupEndpoints;
use crate::storage::{self, KeyValueStore, StorageKey};
use crate::tasks::Task;

/// What a [`LookupCache::resolve_for_tasks`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
  /// Kinds that had missing ids and issued a request
  pub requested: Vec<LookupKind>,
  /// Kinds whose request failed; their ids stay unresolved until next time
  pub failed: Vec<LookupKind>,
  /// A request found the session unrecoverable; login has been shown
  pub session_expired: bool,
}

impl ResolveReport {
  pub fn is_complete(&self) -> bool {
    self.failed.is_empty()
  }
}

/// Outcome of resolving one kind.
enum FetchOutcome {
  /// Everything was already cached; no request was made
  Cached,
  /// Missing ids were requested; this many records were added
  Fetched(usize),
}

/// One id -> record map, with its endpoint.
struct LookupTable<T: LookupRecord> {
  endpoint: String,
  entries: Mutex<HashMap<u64, T>>,
}

impl<T: LookupRecord> LookupTable<T> {
  fn load(store: &dyn KeyValueStore, endpoint: &str) -> Self {
    let entries: HashMap<u64, T> =
      storage::load_json(store, &StorageKey::Lookup(T::KIND)).unwrap_or_default();
    debug!(kind = %T::KIND, entries = entries.len(), "loaded lookup table");

    Self {
      endpoint: endpoint.to_string(),
      entries: Mutex::new(entries),
    }
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<u64, T>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn get(&self, id: u64) -> Option<T> {
    self.entries().get(&id).cloned()
  }

  fn missing(&self, ids: &BTreeSet<u64>) -> Vec<u64> {
    let entries = self.entries();
    ids.iter().copied().filter(|id| !entries.contains_key(id)).collect()
  }

  /// Fetch the ids in `ids` that are not cached yet, in one request.
  async fn fetch_missing(
    &self,
    gateway: &Gateway,
    store: &dyn KeyValueStore,
    ids: &BTreeSet<u64>,
  ) -> Result<FetchOutcome, ApiError> {
    let missing = self.missing(ids);
    if missing.is_empty() {
      return Ok(FetchOutcome::Cached);
    }

    let joined = missing
      .iter()
      .map(u64::to_string)
      .collect::<Vec<_>>()
      .join(",");
    debug!(kind = %T::KIND, ids = %joined, "fetching missing lookups");

    let response = gateway
      .get(&self.endpoint, &[("ids", joined.as_str())])
      .await?
      .error_for_status()?;
    let records: Vec<T> = payload::collection(response.json()?)
      .into_iter()
      .filter_map(|item| serde_json::from_value::<T>(item).ok())
      .filter(|record| record.id() > 0)
      .collect();

    let snapshot = {
      let mut entries = self.entries();
      let mut added = 0;
      for record in records {
        // Entries are never replaced once known
        if let std::collections::hash_map::Entry::Vacant(slot) = entries.entry(record.id()) {
          slot.insert(record);
          added += 1;
        }
      }
      if added == 0 {
        return Ok(FetchOutcome::Fetched(0));
      }
      serde_json::to_string(&*entries).map(|json| (json, added))
    };

    match snapshot {
      Ok((json, added)) => {
        if let Err(e) = store.put(&StorageKey::Lookup(T::KIND), &json) {
          warn!(kind = %T::KIND, error = %e, "failed to persist lookup table");
        }
        Ok(FetchOutcome::Fetched(added))
      }
      Err(e) => Err(ApiError::Malformed(e)),
    }
  }

  fn clear(&self, store: &dyn KeyValueStore) {
    self.entries().clear();
    storage::erase(store, &StorageKey::Lookup(T::KIND));
  }
}

/// Distinct ids referenced by a task collection, per kind.
#[derive(Debug, Default)]
struct ReferencedIds {
  installers: BTreeSet<u64>,
  sales_orders: BTreeSet<u64>,
  addresses: BTreeSet<u64>,
}

impl ReferencedIds {
  fn collect(tasks: &[Task]) -> Self {
    let mut ids = Self::default();
    for task in tasks {
      ids.installers.extend(task.references(INSTALLER_FIELD));
      ids.sales_orders.extend(task.reference(SALES_ORDER_FIELD));
      ids.addresses.extend(task.reference(ADDRESS_FIELD));
    }
    ids
  }
}

/// Cache of installer, sales-order and address records.
///
/// Entries are only ever added; a known id is never fetched again. Shared
/// by reference (`Arc`) between the synchronizer and anything that needs a
/// single record.
pub struct LookupCache {
  gateway: Gateway,
  store: Arc<dyn KeyValueStore>,
  installers: LookupTable<Installer>,
  sales_orders: LookupTable<SalesOrder>,
  addresses: LookupTable<Address>,
}

impl LookupCache {
  /// Create the cache, loading whatever was persisted by earlier runs.
  pub fn new(gateway: Gateway, store: Arc<dyn KeyValueStore>, endpoints: &LookupEndpoints) -> Self {
    Self {
      installers: LookupTable::load(&*store, &endpoints.installers),
      sales_orders: LookupTable::load(&*store, &endpoints.sales_orders),
      addresses: LookupTable::load(&*store, &endpoints.addresses),
      gateway,
      store,
    }
  }

  /// Fetch every referenced id that is not cached yet.
  ///
  /// One request per kind with missing ids, all kinds concurrently. A
  /// failing kind is logged and reported; it never affects the others.
  pub async fn resolve_for_tasks(&self, tasks: &[Task]) -> ResolveReport {
    let ids = ReferencedIds::collect(tasks);
    let store = &*self.store;

    let (installers, sales_orders, addresses) = futures::join!(
      self.installers.fetch_missing(&self.gateway, store, &ids.installers),
      self.sales_orders.fetch_missing(&self.gateway, store, &ids.sales_orders),
      self.addresses.fetch_missing(&self.gateway, store, &ids.addresses),
    );

    let mut report = ResolveReport::default();
    for (kind, outcome) in [
      (LookupKind::Installer, installers),
      (LookupKind::SalesOrder, sales_orders),
      (LookupKind::Address, addresses),
    ] {
      match outcome {
        Ok(FetchOutcome::Cached) => {}
        Ok(FetchOutcome::Fetched(added)) => {
          debug!(kind = %kind, added, "lookup batch resolved");
          report.requested.push(kind);
        }
        Err(ApiError::AuthExpired) => {
          // Already routed to login by the gateway
          report.requested.push(kind);
          report.failed.push(kind);
          report.session_expired = true;
        }
        Err(e) => {
          warn!(kind = %kind, error = %e, "lookup fetch failed, leaving ids unresolved");
          report.requested.push(kind);
          report.failed.push(kind);
        }
      }
    }
    report
  }

  /// Fill absent display fields on every task from cached records. No I/O.
  pub fn enrich_tasks(&self, tasks: &mut [Task]) {
    let installers = self.installers.entries();
    let sales_orders = self.sales_orders.entries();
    let addresses = self.addresses.entries();

    for task in tasks.iter_mut() {
      enrich::enrich_task(task, &installers, &sales_orders, &addresses);
    }
  }

  pub fn installer(&self, id: u64) -> Option<Installer> {
    self.installers.get(id)
  }

  pub fn sales_order(&self, id: u64) -> Option<SalesOrder> {
    self.sales_orders.get(id)
  }

  pub fn address(&self, id: u64) -> Option<Address> {
    self.addresses.get(id)
  }

  /// Drop every entry, in memory and on disk.
  pub fn clear(&self) {
    self.installers.clear(&*self.store);
    self.sales_orders.clear(&*self.store);
    self.addresses.clear(&*self.store);
    debug!("lookup cache cleared");
  }
}
