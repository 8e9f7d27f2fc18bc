use crate::models::SelectionRecord;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

/// The authoritative, observable mapping from record ids to selections
///
/// `replace` is the only mutator. The mapping is rebuilt and the new
/// snapshot published while the writer lock is held, so observers only ever
/// see fully committed generations: concurrent `replace` calls apply in
/// lock-acquisition order and the published value always equals the record
/// set of the last call to finish applying.
pub struct SelectionStore {
    records: Mutex<HashMap<Uuid, SelectionRecord>>,
    publish: watch::Sender<Vec<SelectionRecord>>,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStore {
    pub fn new() -> Self {
        let (publish, _) = watch::channel(Vec::new());
        Self {
            records: Mutex::new(HashMap::new()),
            publish,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, SelectionRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the whole mapping with a new generation of records
    pub fn replace(&self, records: Vec<SelectionRecord>) {
        let mut map = self.lock();
        map.clear();
        for record in records {
            map.insert(record.id, record);
        }
        let snapshot: Vec<SelectionRecord> = map.values().cloned().collect();
        log::info!("selection store replaced, {} records", snapshot.len());
        // published under the writer lock: commit order equals apply order
        self.publish.send_replace(snapshot);
    }

    /// The most recently committed generation
    pub fn snapshot(&self) -> Vec<SelectionRecord> {
        self.publish.borrow().clone()
    }

    /// Observe committed generations; the receiver's current value is the
    /// latest snapshot
    pub fn subscribe(&self) -> watch::Receiver<Vec<SelectionRecord>> {
        self.publish.subscribe()
    }

    pub fn get(&self, id: &Uuid) -> Option<SelectionRecord> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
