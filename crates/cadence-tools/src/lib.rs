//! Tooling primitives for deterministic behavior scheduling.
//!
//! Trace events are recorded through the agent's own blackboard, so recording needs no global
//! state and stays per-agent. Renderers and inspectors live outside this workspace.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{
    emit, install_log, install_sink, tags, TraceEvent, TraceLog, TraceSink, TRACE_LOG, TRACE_SINK,
};
