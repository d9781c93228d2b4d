//! Entry conditions and the typed accessors bound to them.
//!
//! A node declares what it needs from the blackboard once, at tree-construction time:
//!
//! ```
//! use cadence_core::{BbKey, Blackboard, EntryConditions};
//!
//! const TARGET: BbKey<(i32, i32)> = BbKey::new(1);
//! const WALK_TARGET: BbKey<(i32, i32)> = BbKey::new(2);
//!
//! let mut conditions = EntryConditions::builder();
//! let target = conditions.present(TARGET);
//! let walk = conditions.absent(WALK_TARGET);
//! let conditions = conditions.build();
//!
//! let mut bb = Blackboard::with_schema(&[TARGET.id(), WALK_TARGET.id()]);
//! assert!(!conditions.are_met(&bb));
//!
//! bb.set(TARGET, (3, 4));
//! assert!(conditions.are_met(&bb));
//!
//! let pos = *target.get(&bb);
//! walk.set(&mut bb, pos);
//! assert!(!conditions.are_met(&bb));
//! ```
//!
//! The accessor returned by each builder call is the only handle the node uses at run time, so
//! declared preconditions and actual reads cannot drift apart.

use std::collections::BTreeMap;

use crate::{BbKey, Blackboard, BlackboardError, RequiredStatus};

/// Slot requirements that must all hold for a node to start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryConditions {
    requirements: BTreeMap<u64, RequiredStatus>,
}

impl EntryConditions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn builder() -> EntryConditionsBuilder {
        EntryConditionsBuilder::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (u64, RequiredStatus)>) -> Self {
        Self {
            requirements: pairs.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.requirements.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, RequiredStatus)> + '_ {
        self.requirements.iter().map(|(&id, &status)| (id, status))
    }

    pub fn required(&self, id: u64) -> Option<RequiredStatus> {
        self.requirements.get(&id).copied()
    }

    /// `true` iff every requirement holds. Never mutates the blackboard.
    ///
    /// A requirement on an undeclared key is logged and makes the node ineligible.
    pub fn are_met(&self, blackboard: &Blackboard) -> bool {
        self.requirements
            .iter()
            .all(|(&id, &required)| match blackboard.check(id, required) {
                Ok(met) => met,
                Err(err) => {
                    tracing::error!(%err, ?required, "entry condition references undeclared key");
                    false
                }
            })
    }

    /// Fail on the first requirement whose key the blackboard never registered.
    pub fn validate(&self, blackboard: &Blackboard) -> Result<(), BlackboardError> {
        for (&id, &required) in &self.requirements {
            blackboard.check(id, required)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct EntryConditionsBuilder {
    requirements: BTreeMap<u64, RequiredStatus>,
}

impl EntryConditionsBuilder {
    fn require(&mut self, id: u64, status: RequiredStatus) {
        if let Some(previous) = self.requirements.insert(id, status) {
            if previous != status {
                tracing::warn!(key = id, ?previous, ?status, "entry condition redeclared");
            }
        }
    }

    /// Require a value; the accessor reads it without an `Option`.
    pub fn present<T: 'static>(&mut self, key: BbKey<T>) -> Present<T> {
        self.require(key.id(), RequiredStatus::Present);
        Present(key)
    }

    /// Require an empty (but registered) slot; the accessor may fill it.
    pub fn absent<T: 'static>(&mut self, key: BbKey<T>) -> Registered<T> {
        self.require(key.id(), RequiredStatus::Absent);
        Registered(key)
    }

    /// Require only that the slot exists; the accessor may read, write or erase it.
    pub fn registered<T: 'static>(&mut self, key: BbKey<T>) -> Registered<T> {
        self.require(key.id(), RequiredStatus::Registered);
        Registered(key)
    }

    /// Like [`registered`](Self::registered), but read-only.
    pub fn optional<T: 'static>(&mut self, key: BbKey<T>) -> TryGet<T> {
        self.require(key.id(), RequiredStatus::Registered);
        TryGet(key)
    }

    pub fn build(self) -> EntryConditions {
        EntryConditions {
            requirements: self.requirements,
        }
    }
}

/// Read access to a slot that an entry condition guarantees is filled.
#[derive(Debug, PartialEq, Eq)]
pub struct Present<T: 'static>(BbKey<T>);

impl<T: 'static> Present<T> {
    pub fn key(&self) -> BbKey<T> {
        self.0
    }

    /// Panics if the slot is empty: only call while the node's entry condition holds.
    pub fn get<'a>(&self, blackboard: &'a Blackboard) -> &'a T {
        blackboard.get(self.0).unwrap_or_else(|| {
            panic!(
                "blackboard key id={} required present but is empty",
                self.0.id()
            )
        })
    }
}

/// Optional read access.
#[derive(Debug, PartialEq, Eq)]
pub struct TryGet<T: 'static>(BbKey<T>);

impl<T: 'static> TryGet<T> {
    pub fn key(&self) -> BbKey<T> {
        self.0
    }

    pub fn get<'a>(&self, blackboard: &'a Blackboard) -> Option<&'a T> {
        blackboard.get(self.0)
    }
}

/// Writable slot whose current value may or may not exist.
#[derive(Debug, PartialEq, Eq)]
pub struct Registered<T: 'static>(BbKey<T>);

impl<T: 'static> Registered<T> {
    pub fn key(&self) -> BbKey<T> {
        self.0
    }

    pub fn get<'a>(&self, blackboard: &'a Blackboard) -> Option<&'a T> {
        blackboard.get(self.0)
    }

    pub fn set(&self, blackboard: &mut Blackboard, value: T) -> bool {
        blackboard.set(self.0, value)
    }

    pub fn set_with_expiry(&self, blackboard: &mut Blackboard, value: T, expires_at: u64) -> bool {
        blackboard.set_with_expiry(self.0, value, expires_at)
    }

    pub fn take(&self, blackboard: &mut Blackboard) -> Option<T> {
        blackboard.take(self.0)
    }

    pub fn erase(&self, blackboard: &mut Blackboard) {
        blackboard.erase(self.0);
    }
}

macro_rules! impl_copy_accessor {
    ($($name:ident),*) => {
        $(
            impl<T: 'static> Copy for $name<T> {}

            impl<T: 'static> Clone for $name<T> {
                fn clone(&self) -> Self {
                    *self
                }
            }
        )*
    };
}

impl_copy_accessor!(Present, TryGet, Registered);
