#![cfg(feature = "full")]

use cadence::behavior::{Activity, Behavior, BehaviorControl, Brain, RunDuration, Task};
use cadence::core::{Blackboard, TickContext, WorldMut, WorldView};
use cadence::tools::{install_log, tags, TRACE_LOG};

#[derive(Default)]
struct World;

impl WorldView for World {
    type Agent = u32;
}

impl WorldMut for World {}

struct Idle;

impl Task<World> for Idle {
    fn can_still_use(
        &mut self,
        _ctx: &TickContext,
        _agent: u32,
        _world: &World,
        _blackboard: &Blackboard,
    ) -> bool {
        true
    }
}

#[test]
fn building_blocks_compose_through_the_umbrella() {
    let mut bb = Blackboard::new();
    install_log(&mut bb);
    let mut brain: Brain<World> = Brain::new(4, bb);
    let nodes: Vec<Box<dyn BehaviorControl<World>>> =
        vec![Box::new(Behavior::new("idle", Idle).with_duration(RunDuration::fixed(3)))];
    brain.add_activity(Activity::IDLE, 0, nodes).unwrap();
    brain.use_default_activity();

    let mut world = World;
    let mut ctx = TickContext::new(0, 1);
    for _ in 0..5 {
        brain.tick(&ctx, &mut world);
        ctx = ctx.next();
    }

    let log = brain.blackboard.get(TRACE_LOG).unwrap();
    assert_eq!(log.with_tag(tags::BEHAVIOR_START).count(), 2);
    assert_eq!(log.with_tag(tags::BEHAVIOR_STOP).count(), 1);
}

#[cfg(feature = "serde")]
#[test]
fn trace_events_serialize_through_the_umbrella() {
    let event = cadence::tools::TraceEvent::new(9, tags::GATE_STOP).for_agent(4);
    let json = serde_json::to_string(&event).unwrap();
    let back: cadence::tools::TraceEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}
