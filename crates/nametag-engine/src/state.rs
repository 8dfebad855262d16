//! Shared overlay state: one manager per player plus the reverse indices the
//! packet hooks need on the hot path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use nametag_protocol::{EntityId, PlayerId};

use crate::armor_stand_manager::{ArmorStandManager, Removals};
use crate::id_space::IdentifierSpace;

/// A manager behind its per-owner lock.
pub type SharedManager = Arc<Mutex<ArmorStandManager>>;

/// Locks a manager, recovering the guard if a previous holder panicked.
pub fn lock(manager: &SharedManager) -> MutexGuard<'_, ArmorStandManager> {
    manager.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Concurrent registry of marker sets. Every map is sharded, so hooks for
/// different owners never contend on a single lock.
#[derive(Debug)]
pub struct OverlayState {
    /// Synthetic id allocator shared by all owners.
    pub ids: IdentifierSpace,
    managers: DashMap<PlayerId, SharedManager>,
    /// Marker id to owner.
    marker_owners: DashMap<EntityId, PlayerId>,
    /// Real entity id to owner.
    entity_owners: DashMap<EntityId, PlayerId>,
    /// Vehicle entity id to seated owners.
    passengers: DashMap<EntityId, Vec<PlayerId>>,
    /// Players who turned the overlay off for themselves.
    disabled: DashSet<PlayerId>,
}

impl OverlayState {
    /// Creates empty state around an allocator.
    pub fn new(ids: IdentifierSpace) -> Self {
        Self {
            ids,
            managers: DashMap::new(),
            marker_owners: DashMap::new(),
            entity_owners: DashMap::new(),
            passengers: DashMap::new(),
            disabled: DashSet::new(),
        }
    }

    // -- Managers ---------------------------------------------------------

    /// Returns `owner`'s manager, building and registering one with `build`
    /// if there is none. The map entry stays locked while `build` runs, so
    /// concurrent calls for one owner create at most one marker set.
    pub fn get_or_try_insert_with<E>(
        &self,
        owner: PlayerId,
        build: impl FnOnce() -> Result<ArmorStandManager, E>,
    ) -> Result<SharedManager, E> {
        match self.managers.entry(owner) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let manager = build()?;
                self.index(&manager);
                let shared = Arc::new(Mutex::new(manager));
                entry.insert(Arc::clone(&shared));
                Ok(shared)
            }
        }
    }

    /// Registers `manager`, replacing any set its owner already had. The
    /// replaced set is unindexed and destroyed; the returned removals must
    /// be delivered to its viewers.
    pub fn insert(&self, manager: ArmorStandManager) -> (SharedManager, Removals) {
        let owner = manager.owner();
        let shared = Arc::new(Mutex::new(manager));
        let removals = match self.managers.insert(owner, Arc::clone(&shared)) {
            Some(previous) => {
                tracing::warn!(player = %owner, "replacing an existing marker set");
                let mut previous = lock(&previous);
                self.unindex(&previous);
                previous.destroy(&self.ids)
            }
            None => Vec::new(),
        };
        // Index after unindexing the old set; both share the owner's entity id.
        self.index(&lock(&shared));
        (shared, removals)
    }

    /// Unregisters and destroys `owner`'s manager under a single lock, so no
    /// event can touch the set between unindexing and destruction. Returns
    /// the removals its viewers need.
    pub fn remove(&self, owner: PlayerId) -> Option<Removals> {
        let (_, manager) = self.managers.remove(&owner)?;
        let mut manager = lock(&manager);
        self.unindex(&manager);
        Some(manager.destroy(&self.ids))
    }

    fn index(&self, manager: &ArmorStandManager) {
        let owner = manager.owner();
        for id in manager.marker_ids() {
            self.marker_owners.insert(id, owner);
        }
        self.entity_owners.insert(manager.owner_entity(), owner);
        if let Some(mount) = manager.mount() {
            self.add_passenger(mount.vehicle_id, owner);
        }
    }

    fn unindex(&self, manager: &ArmorStandManager) {
        let owner = manager.owner();
        for id in manager.marker_ids() {
            self.marker_owners.remove_if(&id, |_, o| *o == owner);
        }
        self.entity_owners
            .remove_if(&manager.owner_entity(), |_, o| *o == owner);
        if let Some(mount) = manager.mount() {
            self.remove_passenger(mount.vehicle_id, owner);
        }
    }

    /// `owner`'s manager.
    pub fn manager(&self, owner: PlayerId) -> Option<SharedManager> {
        self.managers.get(&owner).map(|m| Arc::clone(m.value()))
    }

    /// Whether `owner` currently has a marker set.
    pub fn has_manager(&self, owner: PlayerId) -> bool {
        self.managers.contains_key(&owner)
    }

    /// Snapshot of every manager. The map is not locked while the caller
    /// works through the result.
    pub fn all_managers(&self) -> Vec<(PlayerId, SharedManager)> {
        self.managers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }

    /// Number of live marker sets.
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Whether no marker sets exist.
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    // -- Reverse indices --------------------------------------------------

    /// Owner of marker `id`.
    pub fn marker_owner(&self, id: EntityId) -> Option<PlayerId> {
        self.marker_owners.get(&id).map(|o| *o)
    }

    /// Owner whose real entity is `id`.
    pub fn entity_owner(&self, id: EntityId) -> Option<PlayerId> {
        self.entity_owners.get(&id).map(|o| *o)
    }

    /// Owners seated in vehicle `vehicle`.
    pub fn passengers_of(&self, vehicle: EntityId) -> Vec<PlayerId> {
        self.passengers
            .get(&vehicle)
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Indexes `owner` as a passenger of `vehicle`.
    pub fn add_passenger(&self, vehicle: EntityId, owner: PlayerId) {
        let mut seated = self.passengers.entry(vehicle).or_default();
        if !seated.contains(&owner) {
            seated.push(owner);
        }
    }

    /// Removes `owner` from `vehicle`'s passengers.
    pub fn remove_passenger(&self, vehicle: EntityId, owner: PlayerId) {
        if let Some(mut seated) = self.passengers.get_mut(&vehicle) {
            seated.retain(|p| *p != owner);
        }
        self.passengers.remove_if(&vehicle, |_, seated| seated.is_empty());
    }

    // -- Personal toggle --------------------------------------------------

    /// Turns the overlay off or on for `player`.
    pub fn set_disabled(&self, player: PlayerId, disabled: bool) {
        if disabled {
            self.disabled.insert(player);
        } else {
            self.disabled.remove(&player);
        }
    }

    /// Whether `player` turned the overlay off.
    pub fn is_disabled(&self, player: PlayerId) -> bool {
        self.disabled.contains(&player)
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new(IdentifierSpace::default())
    }
}
