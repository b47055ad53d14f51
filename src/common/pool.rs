//! A small object pool for reusable collections.
//!
//! Values are handed out wrapped in a [`Pooled`] guard which owns the value exclusively.
//! Moving the guard moves ownership; dropping it clears the value and returns it to the
//! pool. Release therefore happens exactly once on every exit path, including unwinding
//! and early returns through `?`.
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::hash::{BuildHasher, Hash};
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// A collection that can be emptied and reused.
pub trait Recyclable: Default + Send {
    fn clear(&mut self);
    fn capacity(&self) -> usize;
}

impl<K, V, S> Recyclable for HashMap<K, V, S>
where
    K: Eq + Hash + Send,
    V: Send,
    S: BuildHasher + Default + Send,
{
    fn clear(&mut self) {
        HashMap::clear(self)
    }

    fn capacity(&self) -> usize {
        HashMap::capacity(self)
    }
}

impl<T: Send> Recyclable for Vec<T> {
    fn clear(&mut self) {
        Vec::clear(self)
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub acquired: usize,
    pub released: usize,
}

struct PoolState<T> {
    idle: Vec<T>,
    acquired: usize,
    released: usize,
}

pub struct Pool<T: Recyclable> {
    name: &'static str,
    state: Mutex<PoolState<T>>,
    max_idle: usize,
    max_retained_capacity: usize,
}

impl<T: Recyclable> Pool<T> {
    pub fn new(name: &'static str, max_idle: usize, max_retained_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                acquired: 0,
                released: 0,
            }),
            max_idle,
            max_retained_capacity,
        })
    }

    /// Takes an idle value from the pool, or allocates a fresh one.
    pub fn acquire(self: &Arc<Self>) -> Pooled<T> {
        let reused = match self.state.lock() {
            Ok(mut state) => {
                state.acquired += 1;
                state.idle.pop()
            }
            Err(_) => None,
        };
        Pooled {
            value: Some(reused.unwrap_or_default()),
            pool: Arc::clone(self),
        }
    }

    pub fn stats(&self) -> PoolStats {
        match self.state.lock() {
            Ok(state) => PoolStats {
                idle: state.idle.len(),
                acquired: state.acquired,
                released: state.released,
            },
            Err(_) => PoolStats::default(),
        }
    }

    fn release(&self, mut value: T) {
        value.clear();
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.released += 1;
        if value.capacity() > self.max_retained_capacity {
            log::debug!(
                "{} pool: dropping value with capacity {} (limit {})",
                self.name,
                value.capacity(),
                self.max_retained_capacity
            );
            return;
        }
        if state.idle.len() < self.max_idle {
            state.idle.push(value);
        }
    }
}

impl<T: Recyclable> Debug for Pool<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Exclusive handle to a pooled value. Returns the value to its pool on drop.
pub struct Pooled<T: Recyclable> {
    value: Option<T>,
    pool: Arc<Pool<T>>,
}

impl<T: Recyclable> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // only None while dropping
        self.value.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Recyclable> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Recyclable> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.release(value);
        }
    }
}

impl<T: Recyclable + Debug> Debug for Pooled<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pooled").field(&self.value).finish()
    }
}
