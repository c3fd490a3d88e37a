//! Entity identity and ordered entity pools
//!
//! Every simulated thing gets a world-unique, monotonically increasing
//! [`EntityId`]. Pools keep entities in insertion order, which is also id
//! order, so lookups are binary searches and iteration is deterministic.
//! Dead entities stay in place as tombstones until the end-of-frame sweep.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// World-unique entity id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Id carried by entities that have not been added to a world yet
    pub const UNASSIGNED: EntityId = EntityId(0);
}

/// Which world collection an entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Player,
    Bomb,
    PlayerBullet,
    Bullet,
    Enemy,
    Boss,
    Particle,
}

/// Handle addressing any entity in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub category: Category,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(category: Category, id: EntityId) -> Self {
        Self { category, id }
    }
}

/// Anything simulated: has an id, a position, and a lifetime
pub trait Entity {
    fn id(&self) -> EntityId;
    fn pos(&self) -> Vec2;
    fn set_pos(&mut self, pos: Vec2);
    fn alive(&self) -> bool;
    /// Force-terminate; returns whether the entity was newly killed
    fn kill(&mut self) -> bool;
}

/// Ordered entity collection with deferred removal
#[derive(Debug)]
pub struct Pool<T> {
    items: Vec<T>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Pool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity; its id must be greater than every id already pooled
    pub fn push(&mut self, item: T) {
        debug_assert!(
            self.items.last().is_none_or(|last| last.id() < item.id()),
            "entity ids must be pushed in increasing order"
        );
        self.items.push(item);
    }

    /// Slot index of an entity, dead or alive
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.items.binary_search_by_key(&id, |e| e.id()).ok()
    }

    /// Entity by id, including tombstones not yet swept
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.index_of(id).map(|i| &self.items[i])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.index_of(id).map(|i| &mut self.items[i])
    }

    /// Entity by id, treating dead entities as absent
    pub fn get_live(&self, id: EntityId) -> Option<&T> {
        self.get(id).filter(|e| e.alive())
    }

    pub fn get_live_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.get_mut(id).filter(|e| e.alive())
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.get_live(id).is_some()
    }

    /// Slot access by index (stable within a frame)
    pub fn slot(&self, index: usize) -> &T {
        &self.items[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }

    /// Number of slots, tombstones included
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of live entities
    pub fn live_count(&self) -> usize {
        self.items.iter().filter(|e| e.alive()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Live entities only
    pub fn live(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter(|e| e.alive())
    }

    /// Drop tombstones, returning how many were removed
    pub fn sweep(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|e| e.alive());
        before - self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        id: EntityId,
        pos: Vec2,
        alive: bool,
    }

    impl Entity for Dummy {
        fn id(&self) -> EntityId {
            self.id
        }
        fn pos(&self) -> Vec2 {
            self.pos
        }
        fn set_pos(&mut self, pos: Vec2) {
            self.pos = pos;
        }
        fn alive(&self) -> bool {
            self.alive
        }
        fn kill(&mut self) -> bool {
            std::mem::replace(&mut self.alive, false)
        }
    }

    fn dummy(id: u64) -> Dummy {
        Dummy {
            id: EntityId(id),
            pos: Vec2::ZERO,
            alive: true,
        }
    }

    #[test]
    fn test_lookup_and_tombstones() {
        let mut pool = Pool::new();
        for id in [1, 4, 9, 12] {
            pool.push(dummy(id));
        }
        assert_eq!(pool.index_of(EntityId(9)), Some(2));
        assert!(pool.get(EntityId(5)).is_none());

        assert!(pool.get_mut(EntityId(4)).unwrap().kill());
        assert!(pool.get(EntityId(4)).is_some());
        assert!(pool.get_live(EntityId(4)).is_none());
        assert_eq!(pool.live_count(), 3);

        assert_eq!(pool.sweep(), 1);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.index_of(EntityId(12)), Some(2));
    }
}
