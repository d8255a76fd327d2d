use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

/// Maps a PGT IOU to the proxy-granting ticket the CAS server delivered for it.
///
/// The store is filled out-of-band by the application's proxy callback
/// endpoint; the client only ever reads from it.
pub trait PgtStore {
    fn lookup(&self, pgt_iou: &str) -> Option<String>;
}

impl PgtStore for HashMap<String, String> {
    fn lookup(&self, pgt_iou: &str) -> Option<String> {
        self.get(pgt_iou).cloned()
    }
}

/// A [`PgtStore`] that can be shared between the callback handler and the client.
#[derive(Debug, Default)]
pub struct MemoryPgtStore {
    tickets: RwLock<HashMap<String, String>>,
}

impl MemoryPgtStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, pgt_iou: &str, pgt: &str) {
        self.tickets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pgt_iou.into(), pgt.into());
    }

    /// Removes and returns the PGT stored for `pgt_iou`.
    pub fn take(&self, pgt_iou: &str) -> Option<String> {
        self.tickets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(pgt_iou)
    }
}

impl PgtStore for MemoryPgtStore {
    fn lookup(&self, pgt_iou: &str) -> Option<String> {
        self.tickets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pgt_iou)
            .cloned()
    }
}
