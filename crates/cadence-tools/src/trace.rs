#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use cadence_core::{BbKey, Blackboard};

/// One node lifecycle transition, as seen by a single agent.
///
/// `agent` is the agent's stable id and `node` the stream id the node derives from its name
/// (see `cadence_core::stream_id`), so events can be matched back to nodes without storing names.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub tag: Cow<'static, str>,
    pub agent: u64,
    pub node: u64,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tick,
            tag: tag.into(),
            agent: 0,
            node: 0,
        }
    }

    /// Event for `tag` raised by the node with stream id `node` on behalf of `agent`.
    pub fn lifecycle(tick: u64, tag: &'static str, agent: u64, node: u64) -> Self {
        Self {
            tick,
            tag: Cow::Borrowed(tag),
            agent,
            node,
        }
    }

    pub fn for_agent(mut self, agent: u64) -> Self {
        self.agent = agent;
        self
    }

    pub fn for_node(mut self, node: u64) -> Self {
        self.node = node;
        self
    }
}

/// Tags emitted by the behavior runtime.
pub mod tags {
    pub const BEHAVIOR_START: &str = "behavior.start";
    pub const BEHAVIOR_STOP: &str = "behavior.stop";
    pub const GATE_START: &str = "gate.start";
    pub const GATE_STOP: &str = "gate.stop";
}

/// Streaming consumer of trace events. Any `FnMut(&TraceEvent)` closure is a sink.
pub trait TraceSink {
    fn record(&mut self, event: &TraceEvent);
}

impl<F> TraceSink for F
where
    F: FnMut(&TraceEvent),
{
    fn record(&mut self, event: &TraceEvent) {
        self(event)
    }
}

/// In-memory event history for one agent.
#[derive(Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events.iter().filter(move |e| e.tag == tag)
    }

    pub fn for_node(&self, node: u64) -> impl Iterator<Item = &TraceEvent> + '_ {
        self.events.iter().filter(move |e| e.node == node)
    }

    /// Hand the recorded events to the caller and start over.
    pub fn drain(&mut self) -> Vec<TraceEvent> {
        std::mem::take(&mut self.events)
    }
}

pub const TRACE_LOG: BbKey<TraceLog> = BbKey::new(0xCADE_7ACE_0000_0001);
pub const TRACE_SINK: BbKey<Box<dyn TraceSink>> = BbKey::new(0xCADE_7ACE_0000_0002);

/// Register the log slot and start collecting into an empty [`TraceLog`].
pub fn install_log(blackboard: &mut Blackboard) {
    blackboard.register(TRACE_LOG);
    blackboard.set(TRACE_LOG, TraceLog::default());
}

/// Register the sink slot and stream every subsequent event into `sink`.
pub fn install_sink(blackboard: &mut Blackboard, sink: impl TraceSink + 'static) {
    blackboard.register(TRACE_SINK);
    blackboard.set(TRACE_SINK, Box::new(sink) as Box<dyn TraceSink>);
}

/// Record `event` into whichever of the sink and log are installed. A no-op otherwise.
pub fn emit(blackboard: &mut Blackboard, event: TraceEvent) {
    if let Some(sink) = blackboard.get_mut(TRACE_SINK) {
        sink.record(&event);
    }
    if let Some(log) = blackboard.get_mut(TRACE_LOG) {
        log.push(event);
    }
}
