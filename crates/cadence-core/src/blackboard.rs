use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::BlackboardError;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    id: u64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    pub fn id(self) -> u64 {
        self.id
    }
}

/// Observed state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlotStatus {
    /// The key was never declared for this blackboard. Reads see nothing, writes are dropped.
    Unregistered,
    /// Declared and writable, currently without a value.
    Registered,
    Present,
}

/// Status a node requires of a slot before it may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequiredStatus {
    Present,
    Absent,
    /// Any value state, as long as the slot is declared.
    Registered,
}

impl RequiredStatus {
    pub fn matches(self, status: SlotStatus) -> bool {
        match (self, status) {
            (_, SlotStatus::Unregistered) => false,
            (RequiredStatus::Registered, _) => true,
            (RequiredStatus::Present, SlotStatus::Present) => true,
            (RequiredStatus::Absent, SlotStatus::Registered) => true,
            _ => false,
        }
    }
}

#[derive(Default)]
struct Slot {
    value: Option<Box<dyn Any>>,
    expires_at: Option<u64>,
}

/// Per-agent key/value store with declared slots.
///
/// A key must be [`register`](Blackboard::register)ed before it can hold a value. Reads and
/// writes are immediate; there is no commit phase.
#[derive(Default)]
pub struct Blackboard {
    slots: BTreeMap<u64, Slot>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blackboard with every id in `ids` registered.
    pub fn with_schema(ids: &[u64]) -> Self {
        let mut bb = Self::new();
        for &id in ids {
            bb.register_id(id);
        }
        bb
    }

    pub fn register<T: 'static>(&mut self, key: BbKey<T>) {
        self.register_id(key.id);
    }

    pub fn register_id(&mut self, id: u64) {
        self.slots.entry(id).or_default();
    }

    pub fn is_registered<T: 'static>(&self, key: BbKey<T>) -> bool {
        self.slots.contains_key(&key.id)
    }

    pub fn registered_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.slots.keys().copied()
    }

    /// Erase every value, keeping registrations.
    pub fn clear(&mut self) {
        for slot in self.slots.values_mut() {
            *slot = Slot::default();
        }
    }

    pub fn status(&self, id: u64) -> SlotStatus {
        match self.slots.get(&id) {
            None => SlotStatus::Unregistered,
            Some(slot) if slot.value.is_some() => SlotStatus::Present,
            Some(_) => SlotStatus::Registered,
        }
    }

    /// Check a slot against a required status without touching it.
    ///
    /// Asking about an undeclared key is a schema defect and reported as an error rather than a
    /// plain `false`.
    pub fn check(&self, id: u64, required: RequiredStatus) -> Result<bool, BlackboardError> {
        match self.status(id) {
            SlotStatus::Unregistered => Err(BlackboardError::Unregistered { key: id }),
            status => Ok(required.matches(status)),
        }
    }

    /// `true` iff the slot currently holds a value.
    pub fn contains<T: 'static>(&self, key: BbKey<T>) -> bool {
        self.status(key.id) == SlotStatus::Present
    }

    /// Write a value. Returns `false` (and stores nothing) if the slot was never registered.
    pub fn set<T: 'static>(&mut self, key: BbKey<T>, value: T) -> bool {
        self.write(key.id, Box::new(value), None)
    }

    /// Write a value that [`forget_expired`](Blackboard::forget_expired) erases once the tick
    /// reaches `expires_at`.
    pub fn set_with_expiry<T: 'static>(&mut self, key: BbKey<T>, value: T, expires_at: u64) -> bool {
        self.write(key.id, Box::new(value), Some(expires_at))
    }

    fn write(&mut self, id: u64, value: Box<dyn Any>, expires_at: Option<u64>) -> bool {
        let Some(slot) = self.slots.get_mut(&id) else {
            tracing::trace!(key = id, "dropping write to unregistered blackboard slot");
            return false;
        };
        slot.value = Some(value);
        slot.expires_at = expires_at;
        true
    }

    pub fn get<T: 'static>(&self, key: BbKey<T>) -> Option<&T> {
        let value = self.slots.get(&key.id)?.value.as_ref()?;
        value.downcast_ref::<T>().or_else(|| {
            panic!(
                "blackboard type mismatch for key id={} (stored type differs from requested)",
                key.id
            )
        })
    }

    pub fn get_mut<T: 'static>(&mut self, key: BbKey<T>) -> Option<&mut T> {
        let value = self.slots.get_mut(&key.id)?.value.as_mut()?;
        value.downcast_mut::<T>().or_else(|| {
            panic!(
                "blackboard type mismatch for key id={} (stored type differs from requested)",
                key.id
            )
        })
    }

    /// `true` iff the slot holds a value equal to `value`.
    pub fn is_value<T: PartialEq + 'static>(&self, key: BbKey<T>, value: &T) -> bool {
        self.get(key).is_some_and(|v| v == value)
    }

    /// Remove and return the value; the slot stays registered.
    pub fn take<T: 'static>(&mut self, key: BbKey<T>) -> Option<T> {
        let slot = self.slots.get_mut(&key.id)?;
        let value = slot.value.take()?;
        slot.expires_at = None;
        value.downcast::<T>().map(|b| *b).ok().or_else(|| {
            panic!(
                "blackboard type mismatch for key id={} (stored type differs from requested)",
                key.id
            )
        })
    }

    pub fn erase<T: 'static>(&mut self, key: BbKey<T>) {
        self.erase_id(key.id);
    }

    pub fn erase_id(&mut self, id: u64) {
        if let Some(slot) = self.slots.get_mut(&id) {
            *slot = Slot::default();
        }
    }

    /// Erase every value whose expiry tick has been reached. Returns the number erased.
    pub fn forget_expired(&mut self, tick: u64) -> usize {
        let mut erased = 0;
        for slot in self.slots.values_mut() {
            if slot.value.is_some() && slot.expires_at.is_some_and(|at| tick >= at) {
                *slot = Slot::default();
                erased += 1;
            }
        }
        erased
    }
}
