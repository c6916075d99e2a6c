//! Target Lock
//!
//! Exclusive ownership of controllable props. Two live anomalies never
//! manipulate the same prop: whoever locks it first owns it until release.
//!
//! The registry is owned by the scheduler and shared with instances through
//! cheap handles. Scheduling is single-threaded, so the shared set lives in an
//! `Rc<RefCell<..>>` rather than behind a mutex.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Identity of a controllable prop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        TargetId(id.to_string())
    }
}

impl From<String> for TargetId {
    fn from(id: String) -> Self {
        TargetId(id)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of currently locked targets.
///
/// Cloning yields another handle onto the same registry.
#[derive(Debug, Clone, Default)]
pub struct TargetLock {
    locked: Rc<RefCell<HashSet<TargetId>>>,
}

impl TargetLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records ownership of `target` if nobody holds it. Fails without side
    /// effects when it is already locked.
    pub fn try_lock(&self, target: &TargetId) -> bool {
        self.locked.borrow_mut().insert(target.clone())
    }

    /// Removes the lock on `target`. Unlocked or unknown targets are ignored.
    pub fn release(&self, target: &TargetId) {
        self.locked.borrow_mut().remove(target);
    }

    pub fn is_locked(&self, target: &TargetId) -> bool {
        self.locked.borrow().contains(target)
    }

    /// Locks `target` and returns a guard that releases it when dropped.
    pub fn try_acquire(&self, target: &TargetId) -> Option<TargetGuard> {
        if !self.try_lock(target) {
            return None;
        }
        Some(TargetGuard {
            registry: self.clone(),
            target: target.clone(),
        })
    }

    /// Number of targets currently locked.
    pub fn len(&self) -> usize {
        self.locked.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked.borrow().is_empty()
    }

    /// Snapshot of every locked target, sorted.
    pub fn locked_targets(&self) -> Vec<TargetId> {
        let mut targets: Vec<TargetId> = self.locked.borrow().iter().cloned().collect();
        targets.sort();
        targets
    }

    /// Drops every lock. Used at scheduler teardown.
    pub fn clear(&self) {
        self.locked.borrow_mut().clear();
    }
}

/// Ownership of one locked target. Releases the lock on drop.
#[derive(Debug)]
pub struct TargetGuard {
    registry: TargetLock,
    target: TargetId,
}

impl TargetGuard {
    pub fn target(&self) -> &TargetId {
        &self.target
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        self.registry.release(&self.target);
    }
}
