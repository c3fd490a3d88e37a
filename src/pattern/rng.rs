//! Keyed random values
//!
//! Laser patterns re-run the same random decision for every node of a chain.
//! [`RngBank`] draws a value the first time a key is seen and replays it
//! afterwards, so all nodes agree.

use std::collections::HashMap;
use std::hash::Hash;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct RngBank<K> {
    values: HashMap<K, f32>,
}

impl<K: Hash + Eq> Default for RngBank<K> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq> RngBank<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value in `[low, high)` for `key`, drawn from `rng` on first use
    pub fn random(&mut self, rng: &mut impl Rng, key: K, low: f32, high: f32) -> f32 {
        *self.values.entry(key).or_insert_with(|| {
            if high > low {
                rng.random_range(low..high)
            } else {
                low
            }
        })
    }

    pub fn forget(&mut self, key: &K) {
        self.values.remove(key);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
