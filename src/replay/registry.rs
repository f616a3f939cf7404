use std::cell::Cell;
use std::rc::Rc;

use crate::foundation::core::InstanceKey;
use crate::replay::keyframe::InstanceState;
use crate::scene::host::NodeId;

/// Recorder-side half of a destruction hook subscription.
///
/// The hook installed on the node holds the other half of the `armed` flag and does nothing once
/// the token is gone. Dropping the token is the release.
#[derive(Debug)]
pub(crate) struct ObserverToken {
    armed: Rc<Cell<bool>>,
}

impl ObserverToken {
    /// Returns the token and the flag the matching hook must check before firing.
    pub(crate) fn new() -> (Self, Rc<Cell<bool>>) {
        let armed = Rc::new(Cell::new(true));
        (
            Self {
                armed: Rc::clone(&armed),
            },
            armed,
        )
    }

    pub(crate) fn release(self) {
        drop(self);
    }
}

impl Drop for ObserverToken {
    fn drop(&mut self) {
        self.armed.set(false);
    }
}

#[derive(Debug)]
pub(crate) struct InstanceRecord {
    pub(crate) node: NodeId,
    pub(crate) key: InstanceKey,
    pub(crate) recent_state: Option<InstanceState>,
    pub(crate) observer: ObserverToken,
}

/// Live (node, key) pairs in creation order.
#[derive(Debug, Default)]
pub(crate) struct InstanceRegistry {
    records: Vec<InstanceRecord>,
    next_key: u32,
}

impl InstanceRegistry {
    pub(crate) fn allocate_key(&mut self) -> InstanceKey {
        assert!(self.next_key < u32::MAX, "instance key space exhausted");
        let key = InstanceKey(self.next_key);
        self.next_key += 1;
        key
    }

    pub(crate) fn find(&self, node: NodeId) -> Option<usize> {
        self.records.iter().position(|r| r.node == node)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&InstanceRecord> {
        self.records.get(index)
    }

    pub(crate) fn insert(&mut self, record: InstanceRecord) {
        self.records.push(record);
    }

    pub(crate) fn remove(&mut self, index: usize) -> InstanceRecord {
        self.records.remove(index)
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, InstanceRecord> {
        self.records.iter_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Disarm every outstanding hook and forget all records.
    pub(crate) fn release_all(&mut self) {
        for record in self.records.drain(..) {
            record.observer.release();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/replay/registry.rs"]
mod tests;
