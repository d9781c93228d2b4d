use std::cell::RefCell;
use std::rc::Rc;

use cadence_core::Blackboard;
use cadence_tools::{emit, install_log, install_sink, tags, TraceEvent, TraceLog, TRACE_LOG};

fn shared_sink() -> (Rc<RefCell<Vec<TraceEvent>>>, impl FnMut(&TraceEvent)) {
    let shared = Rc::new(RefCell::new(Vec::new()));
    let handle = Rc::clone(&shared);
    (shared, move |event: &TraceEvent| {
        handle.borrow_mut().push(event.clone())
    })
}

#[test]
fn emit_is_a_noop_without_installed_channels() {
    let mut bb = Blackboard::new();
    emit(&mut bb, TraceEvent::new(0, "ignored"));
    assert!(bb.get(TRACE_LOG).is_none());
}

#[test]
fn emit_writes_to_trace_log_when_installed() {
    let mut bb = Blackboard::new();
    install_log(&mut bb);

    emit(&mut bb, TraceEvent::lifecycle(1, tags::BEHAVIOR_START, 10, 20));

    let log = bb.get(TRACE_LOG).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log.events[0].tick, 1);
    assert_eq!(log.events[0].tag, tags::BEHAVIOR_START);
    assert_eq!(log.events[0].agent, 10);
    assert_eq!(log.events[0].node, 20);
}

#[test]
fn closure_sink_receives_events() {
    let mut bb = Blackboard::new();
    let (shared, sink) = shared_sink();
    install_sink(&mut bb, sink);

    emit(&mut bb, TraceEvent::new(2, "sink_event").for_node(7));

    let events = shared.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tick, 2);
    assert_eq!(events[0].node, 7);
}

#[test]
fn emit_writes_to_both_log_and_sink() {
    let mut bb = Blackboard::new();
    install_log(&mut bb);
    let (shared, sink) = shared_sink();
    install_sink(&mut bb, sink);

    emit(&mut bb, TraceEvent::new(3, "both"));
    emit(&mut bb, TraceEvent::new(4, "other"));

    let log: &TraceLog = bb.get(TRACE_LOG).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log.with_tag("both").count(), 1);

    let events = shared.borrow();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].tag, "both");
}

#[test]
fn log_filters_by_node_and_drains() {
    let mut log = TraceLog::default();
    log.push(TraceEvent::lifecycle(0, tags::GATE_START, 1, 100));
    log.push(TraceEvent::lifecycle(0, tags::BEHAVIOR_START, 1, 200));
    log.push(TraceEvent::lifecycle(5, tags::GATE_STOP, 1, 100));

    let gate_ticks: Vec<u64> = log.for_node(100).map(|e| e.tick).collect();
    assert_eq!(gate_ticks, [0, 5]);

    let drained = log.drain();
    assert_eq!(drained.len(), 3);
    assert!(log.is_empty());
}
