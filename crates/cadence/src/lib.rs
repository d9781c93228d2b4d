//! Umbrella crate that re-exports the `cadence-*` building blocks.
//!
//! This crate is the convenient entrypoint for users and the home of the guides.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use cadence_core as core;

#[cfg(feature = "tools")]
#[cfg_attr(docsrs, doc(cfg(feature = "tools")))]
pub use cadence_tools as tools;

#[cfg(feature = "behavior")]
#[cfg_attr(docsrs, doc(cfg(feature = "behavior")))]
pub use cadence_behavior as behavior;

#[cfg(doc)]
pub mod guides {
    #![allow(clippy::all)]

    #[doc = include_str!("../../../docs/guides/scheduling.md")]
    pub mod scheduling {}

    #[doc = include_str!("../../../docs/guides/tracing.md")]
    pub mod tracing {}
}
