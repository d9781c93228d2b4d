//! Deterministic, engine-agnostic primitives for tick-driven behavior scheduling.
//!
//! Everything here is owned by a single agent: the [`Blackboard`] with its slot protocol, the
//! [`EntryConditions`] declared against it, and the RNG streams derived from a [`TickContext`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod access;
pub mod agent;
pub mod blackboard;
pub mod error;
pub mod rng;
pub mod tick;
pub mod world;

pub use access::{EntryConditions, EntryConditionsBuilder, Present, Registered, TryGet};
pub use agent::AgentId;
pub use blackboard::{BbKey, Blackboard, RequiredStatus, SlotStatus};
pub use error::BlackboardError;
pub use rng::{stream_id, SplitMix64};
pub use tick::TickContext;
pub use world::{WorldMut, WorldView};
