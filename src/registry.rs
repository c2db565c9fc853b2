//! Named record registry handing out facades.

use crate::config::RecordConfig;
use crate::error::{FacadeError, Result};
use crate::events::{CapabilityEvent, RecordEventKind};
use crate::record::{LocalRecord, RecordCapability, RecordFacade};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

type RecordMap = HashMap<String, Arc<LocalRecord>>;

/// Hands out one facade per call while sharing a single [`LocalRecord`] per
/// name. A record is forgotten once every facade discarded it, or once it
/// is deleted; the next request for that name starts a fresh record.
pub struct RecordRegistry {
    config: RecordConfig,
    records: Arc<Mutex<RecordMap>>,
}

impl RecordRegistry {
    pub fn new(config: RecordConfig) -> Self {
        Self {
            config,
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A new facade over the record called `name`.
    pub fn get_record(&self, name: &str) -> Result<RecordFacade> {
        if name.trim().is_empty() {
            return Err(FacadeError::InvalidName(name.to_string()));
        }

        let record = {
            let mut records = self.records.lock();
            let record = match records.get(name) {
                Some(record) => Arc::clone(record),
                None => {
                    let record = Arc::new(LocalRecord::new(name, self.config.clone()));
                    self.forget_on_release(&record);
                    records.insert(name.to_string(), Arc::clone(&record));
                    debug!(record = name, "created record");
                    record
                }
            };
            record.acquire();
            record
        };

        Ok(RecordFacade::new(record as Arc<dyn RecordCapability>))
    }

    /// The shared record behind `name`, if one is live.
    pub fn record(&self, name: &str) -> Option<Arc<LocalRecord>> {
        self.records.lock().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.records.lock().contains_key(name)
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn forget_on_release(&self, record: &Arc<LocalRecord>) {
        for kind in [RecordEventKind::Discarded, RecordEventKind::Deleted] {
            let records: Weak<Mutex<RecordMap>> = Arc::downgrade(&self.records);
            let target: Weak<LocalRecord> = Arc::downgrade(record);
            record.on(
                kind,
                Arc::new(move |_: &CapabilityEvent| {
                    let Some(records) = records.upgrade() else {
                        return;
                    };
                    let mut records = records.lock();
                    let name = records
                        .iter()
                        .find(|(_, live)| std::ptr::eq(Arc::as_ptr(live), target.as_ptr()))
                        .map(|(name, _)| name.clone());
                    if let Some(name) = name {
                        debug!(record = %name, "forgetting record");
                        records.remove(&name);
                    }
                }),
            );
        }
    }
}

impl Default for RecordRegistry {
    fn default() -> Self {
        Self::new(RecordConfig::default())
    }
}
