use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use super::input::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    /// Unload, clear the world and load again.
    HardReset,
    Quit,
}

#[derive(Debug)]
struct Slot<T> {
    id: EntityId,
    value: T,
}

/// Entity arena with deferred structural changes.
///
/// Spawns and despawns requested during a tick only take effect in
/// `apply_pending`, so systems can iterate without invalidating each other.
#[derive(Debug)]
pub struct SceneWorld<T> {
    allocator: EntityIdAllocator,
    entities: Vec<Slot<T>>,
    index_by_id: HashMap<EntityId, usize>,
    pending_spawns: Vec<Slot<T>>,
    pending_despawns: Vec<EntityId>,
}

impl<T> Default for SceneWorld<T> {
    fn default() -> Self {
        Self {
            allocator: EntityIdAllocator::default(),
            entities: Vec::new(),
            index_by_id: HashMap::new(),
            pending_spawns: Vec::new(),
            pending_despawns: Vec::new(),
        }
    }
}

impl<T> SceneWorld<T> {
    /// Ids handed out here are never reused, even across `clear`.
    pub fn allocate_id(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    pub fn spawn(&mut self, value: T) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Slot { id, value });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.index_by_id.contains_key(&id);
        let pending_spawn = self.pending_spawns.iter().any(|slot| slot.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn is_pending_despawn(&self, id: EntityId) -> bool {
        self.pending_despawns.contains(&id)
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities.retain(|slot| {
                pending
                    .binary_search_by_key(&slot.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_spawns.retain(|slot| {
                pending
                    .binary_search_by_key(&slot.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_despawns.clear();
        }

        self.entities.append(&mut self.pending_spawns);
        self.rebuild_index();
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.index_by_id.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn pending_spawn_count(&self) -> usize {
        self.pending_spawns.len()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index_by_id.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        let index = *self.index_by_id.get(&id)?;
        self.entities.get(index).map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let index = *self.index_by_id.get(&id)?;
        self.entities.get_mut(index).map(|slot| &mut slot.value)
    }

    /// Two distinct live entities borrowed mutably at once.
    pub fn pair_mut(&mut self, first: EntityId, second: EntityId) -> Option<(&mut T, &mut T)> {
        if first == second {
            return None;
        }
        let first_index = *self.index_by_id.get(&first)?;
        let second_index = *self.index_by_id.get(&second)?;
        if first_index < second_index {
            let (head, tail) = self.entities.split_at_mut(second_index);
            Some((&mut head[first_index].value, &mut tail[0].value))
        } else {
            let (head, tail) = self.entities.split_at_mut(first_index);
            Some((&mut tail[0].value, &mut head[second_index].value))
        }
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|slot| slot.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().map(|slot| (slot.id, &slot.value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities.iter_mut().map(|slot| (slot.id, &mut slot.value))
    }

    fn rebuild_index(&mut self) {
        self.index_by_id.clear();
        for (index, slot) in self.entities.iter().enumerate() {
            self.index_by_id.insert(slot.id, index);
        }
    }
}

pub trait Scene {
    type Entity;

    fn load(&mut self, world: &mut SceneWorld<Self::Entity>);

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld<Self::Entity>,
    ) -> SceneCommand;

    fn unload(&mut self, world: &mut SceneWorld<Self::Entity>);

    fn debug_title(&self, _world: &SceneWorld<Self::Entity>) -> Option<String> {
        None
    }
}

/// Owns one scene together with its world and applies structural changes
/// at the end of every tick.
pub struct SceneRunner<S: Scene> {
    scene: S,
    world: SceneWorld<S::Entity>,
    is_loaded: bool,
}

impl<S: Scene> SceneRunner<S> {
    pub fn new(scene: S) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.world.apply_pending();
        self.is_loaded = true;
    }

    pub fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if !self.is_loaded {
            self.load();
        }
        let command = self.scene.update(fixed_dt_seconds, input, &mut self.world);
        self.world.apply_pending();
        if command == SceneCommand::HardReset {
            self.hard_reset();
        }
        command
    }

    pub fn hard_reset(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
        }
        self.world.clear();
        self.is_loaded = false;
        self.load();
        info!(entity_count = self.world.entity_count(), "scene_hard_reset");
    }

    pub fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
            self.world.clear();
            self.is_loaded = false;
        }
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn world(&self) -> &SceneWorld<S::Entity> {
        &self.world
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingScene {
        spawn_count: usize,
        loads: u32,
        unloads: u32,
        reset_after_ticks: Option<u32>,
        ticks: u32,
    }

    impl CountingScene {
        fn new(spawn_count: usize) -> Self {
            Self {
                spawn_count,
                loads: 0,
                unloads: 0,
                reset_after_ticks: None,
                ticks: 0,
            }
        }
    }

    impl Scene for CountingScene {
        type Entity = f32;

        fn load(&mut self, world: &mut SceneWorld<f32>) {
            self.loads += 1;
            self.ticks = 0;
            for _ in 0..self.spawn_count {
                world.spawn(0.0);
            }
        }

        fn update(
            &mut self,
            fixed_dt_seconds: f32,
            _input: &InputSnapshot,
            world: &mut SceneWorld<f32>,
        ) -> SceneCommand {
            self.ticks += 1;
            for (_, value) in world.iter_mut() {
                *value += fixed_dt_seconds;
            }
            if self.reset_after_ticks == Some(self.ticks) {
                return SceneCommand::HardReset;
            }
            SceneCommand::None
        }

        fn unload(&mut self, _world: &mut SceneWorld<f32>) {
            self.unloads += 1;
        }
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        let first = allocator.allocate();
        let second = allocator.allocate();
        let third = allocator.allocate();

        assert_eq!(first.0, 0);
        assert_eq!(second.0, 1);
        assert_eq!(third.0, 2);
    }

    #[test]
    fn spawn_is_deferred_until_apply_pending() {
        let mut world = SceneWorld::default();
        let id = world.spawn("coin");
        assert_eq!(world.entity_count(), 0);
        assert!(world.get(id).is_none());
        assert_eq!(world.pending_spawn_count(), 1);

        world.apply_pending();
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.get(id), Some(&"coin"));
    }

    #[test]
    fn duplicate_pending_despawns_are_safe_and_idempotent() {
        let mut world = SceneWorld::default();
        let doomed = world.spawn(1);
        let survivor = world.spawn(2);
        world.apply_pending();

        assert!(world.despawn(doomed));
        assert!(world.despawn(doomed));
        assert!(world.is_pending_despawn(doomed));
        assert!(world.get(doomed).is_some());
        world.apply_pending();

        assert_eq!(world.entity_count(), 1);
        assert!(world.get(doomed).is_none());
        assert_eq!(world.get(survivor), Some(&2));
        assert!(!world.despawn(doomed));
    }

    #[test]
    fn despawn_of_pending_spawn_cancels_it() {
        let mut world = SceneWorld::default();
        let id = world.spawn(5);
        assert!(world.despawn(id));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn clear_keeps_allocator_monotonic() {
        let mut world = SceneWorld::default();
        let before = world.spawn(0);
        world.apply_pending();
        world.clear();
        let after = world.spawn(0);
        assert!(after > before);
    }

    #[test]
    fn pair_mut_borrows_two_entities_in_either_order() {
        let mut world = SceneWorld::default();
        let a = world.spawn(1);
        let b = world.spawn(2);
        world.apply_pending();

        let (first, second) = world.pair_mut(b, a).expect("pair");
        *first += 10;
        *second += 20;
        assert_eq!(world.get(a), Some(&21));
        assert_eq!(world.get(b), Some(&12));
        assert!(world.pair_mut(a, a).is_none());
    }

    #[test]
    fn runner_hard_reset_unloads_clears_and_reloads() {
        let mut scene = CountingScene::new(3);
        scene.reset_after_ticks = Some(2);
        let mut runner = SceneRunner::new(scene);
        runner.load();
        assert_eq!(runner.world().entity_count(), 3);

        let input = InputSnapshot::empty();
        assert_eq!(runner.update(0.5, &input), SceneCommand::None);
        let first_ids = runner.world().ids();
        assert_eq!(runner.update(0.5, &input), SceneCommand::HardReset);

        assert_eq!(runner.scene().loads, 2);
        assert_eq!(runner.scene().unloads, 1);
        assert_eq!(runner.world().entity_count(), 3);
        assert!(runner
            .world()
            .iter()
            .all(|(id, value)| *value == 0.0 && !first_ids.contains(&id)));
    }

    #[test]
    fn runner_shutdown_unloads_once() {
        let mut runner = SceneRunner::new(CountingScene::new(1));
        runner.load();
        runner.shutdown();
        runner.shutdown();
        assert_eq!(runner.scene().unloads, 1);
        assert!(!runner.is_loaded());
    }
}
