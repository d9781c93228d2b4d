//! Tick-driven behavior nodes.
//!
//! A [`Behavior`] is a leaf with a bounded run duration; a [`Gate`] coordinates a weighted list
//! of children; a [`RetrySchedule`] backs off from candidates a search failed to use. All of
//! them share the [`BehaviorControl`] lifecycle and are driven tick by tick, for example by a
//! [`Brain`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod brain;
pub mod config;
pub mod error;
pub mod gate;
pub mod leaf;
pub mod node;
pub mod retry;
pub mod weighted;

pub use brain::{tick_brains, Activity, Brain, BrainConfig};
pub use config::{CooldownTable, SchedulerConfig};
pub use error::{BehaviorError, ConfigError};
pub use gate::{Gate, OrderPolicy, RunningPolicy};
pub use leaf::{Behavior, OneShot, RunDuration, Task};
pub use node::{BehaviorControl, Status};
pub use retry::{RetryPolicy, RetryRecord, RetrySchedule, ScanThrottle, ScanThrottleConfig};
pub use weighted::{ShuffleMode, WeightedEntry, WeightedList};
