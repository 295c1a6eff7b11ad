//! Snapshot session
//!
//! Owns the "current" ref table. A snapshot is built completely before it
//! replaces the previous table, so readers see either the old table or the
//! new one, never a partial build.

use std::sync::{Arc, PoisonError, RwLock};

use crate::dom::{Dom, ElementId};
use crate::snapshot::{RefTable, SnapshotBuilder, PAGE_REF};

pub struct Session {
    dom: Arc<dyn Dom>,
    refs: RwLock<Arc<RefTable>>,
}

impl Session {
    pub fn new(dom: Arc<dyn Dom>) -> Self {
        Self {
            dom,
            refs: RwLock::new(Arc::new(RefTable::default())),
        }
    }

    /// Build a snapshot, publish its refs and return the tree text.
    pub fn snapshot(&self) -> String {
        let snapshot = SnapshotBuilder::new(self.dom.as_ref()).build();
        let table = Arc::new(snapshot.refs);
        *self.refs.write().unwrap_or_else(PoisonError::into_inner) = table;
        snapshot.text
    }

    /// Resolve a ref from the most recent snapshot. `page` always maps to
    /// the body.
    pub fn resolve(&self, reference: &str) -> Option<ElementId> {
        if reference == PAGE_REF {
            return self.dom.body();
        }
        self.current().get(reference)
    }

    pub fn current(&self) -> Arc<RefTable> {
        self.refs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
