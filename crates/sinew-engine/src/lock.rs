//! Per-project lock registry.
//!
//! Every mutating operation holds its project's exclusive lock for the
//! whole logical operation, cycle-detection traversal included: two
//! concurrent edge insertions must not both pass the cycle check and
//! jointly commit a loop. Read queries clone what they need under the lock
//! and compute afterwards.
//!
//! Cross-project operations lock both projects in lexicographic id order,
//! so two engines' worth of callers can never deadlock on opposite
//! acquisition orders.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Registry mapping project ids to independently lockable state.
#[derive(Debug, Default)]
pub struct ProjectRegistry<T> {
    projects: RwLock<HashMap<String, Arc<Mutex<T>>>>,
}

impl<T> ProjectRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
        }
    }

    /// Returns `true` if the project exists.
    pub fn contains(&self, id: &str) -> bool {
        read_guard(&self.projects).contains_key(id)
    }

    /// Project ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = read_guard(&self.projects).keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Insert or replace a project's state wholesale.
    pub fn put(&self, id: &str, state: T) {
        write_guard(&self.projects).insert(id.to_string(), Arc::new(Mutex::new(state)));
    }

    /// Get the project's state handle if present, creating it with
    /// `init` otherwise.
    pub fn ensure(&self, id: &str, init: impl FnOnce() -> T) -> Arc<Mutex<T>> {
        if let Some(handle) = read_guard(&self.projects).get(id) {
            return Arc::clone(handle);
        }
        let mut guard = write_guard(&self.projects);
        Arc::clone(
            guard
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(init()))),
        )
    }

    /// Run `f` with the project locked exclusively.
    ///
    /// Returns `None` if the project does not exist.
    pub fn with<R>(&self, id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let handle = read_guard(&self.projects).get(id).map(Arc::clone)?;
        let mut state = lock_guard(&handle);
        Some(f(&mut state))
    }

    /// Run `f` with two distinct projects locked, acquired in lexicographic
    /// id order regardless of argument order.
    ///
    /// Returns `None` if either project is missing or the ids are equal.
    pub fn with_pair<R>(
        &self,
        first: &str,
        second: &str,
        f: impl FnOnce(&mut T, &mut T) -> R,
    ) -> Option<R> {
        if first == second {
            return None;
        }

        let (first_handle, second_handle) = {
            let guard = read_guard(&self.projects);
            (
                guard.get(first).map(Arc::clone)?,
                guard.get(second).map(Arc::clone)?,
            )
        };

        if first < second {
            let mut a = lock_guard(&first_handle);
            let mut b = lock_guard(&second_handle);
            Some(f(&mut a, &mut b))
        } else {
            let mut b = lock_guard(&second_handle);
            let mut a = lock_guard(&first_handle);
            Some(f(&mut a, &mut b))
        }
    }
}

// Lock poisoning only happens if a panic escaped while holding the guard;
// the state itself is still structurally valid (mutations re-validate), so
// recover the inner value instead of propagating the poison.

fn read_guard<'a, K, V>(
    lock: &'a RwLock<HashMap<K, V>>,
) -> std::sync::RwLockReadGuard<'a, HashMap<K, V>> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_guard<'a, K, V>(
    lock: &'a RwLock<HashMap<K, V>>,
) -> std::sync::RwLockWriteGuard<'a, HashMap<K, V>> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock_guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
