use cadence_behavior::{
    Behavior, BehaviorControl, BehaviorError, CooldownTable, OneShot, RunDuration, Status, Task,
};
use cadence_core::{BbKey, Blackboard, EntryConditions, Present, TickContext, WorldMut, WorldView};
use cadence_tools::{install_log, tags, TRACE_LOG};

const TARGET: BbKey<(i32, i32)> = BbKey::new(1);
const UNDECLARED: BbKey<u32> = BbKey::new(99);

#[derive(Debug, Default)]
struct RecordingWorld {
    started: u32,
    ticked: u32,
    stopped: u32,
    last_target: Option<(i32, i32)>,
}

impl WorldView for RecordingWorld {
    type Agent = u64;
}

impl WorldMut for RecordingWorld {}

struct Walk {
    target: Present<(i32, i32)>,
    keep_going: bool,
}

impl Task<RecordingWorld> for Walk {
    fn can_still_use(
        &mut self,
        _ctx: &TickContext,
        _agent: u64,
        _world: &RecordingWorld,
        _blackboard: &Blackboard,
    ) -> bool {
        self.keep_going
    }

    fn on_start(
        &mut self,
        _ctx: &TickContext,
        _agent: u64,
        world: &mut RecordingWorld,
        blackboard: &mut Blackboard,
    ) {
        world.started += 1;
        world.last_target = Some(*self.target.get(blackboard));
    }

    fn on_tick(
        &mut self,
        _ctx: &TickContext,
        _agent: u64,
        world: &mut RecordingWorld,
        _blackboard: &mut Blackboard,
    ) {
        world.ticked += 1;
    }

    fn on_stop(
        &mut self,
        _ctx: &TickContext,
        _agent: u64,
        world: &mut RecordingWorld,
        _blackboard: &mut Blackboard,
    ) {
        world.stopped += 1;
    }
}

fn walk(duration: RunDuration) -> Behavior<Walk> {
    let mut conditions = EntryConditions::builder();
    let target = conditions.present(TARGET);
    Behavior::new(
        "walk",
        Walk {
            target,
            keep_going: true,
        },
    )
    .with_conditions(conditions.build())
    .with_duration(duration)
}

fn blackboard_with_target() -> Blackboard {
    let mut bb = Blackboard::with_schema(&[TARGET.id()]);
    bb.set(TARGET, (3, 4));
    bb
}

#[test]
fn twenty_tick_run_stops_at_its_deadline_with_one_stop_hook() {
    let mut node = walk(RunDuration::fixed(20));
    let mut world = RecordingWorld::default();
    let mut bb = blackboard_with_target();

    let start = TickContext::new(100, 7);
    assert!(node.try_start(&start, 1, &mut world, &mut bb));
    assert_eq!(node.status(), Status::Running);
    assert_eq!(node.run_until(), Some(120));
    assert_eq!(world.last_target, Some((3, 4)));

    let mut ctx = start;
    while ctx.tick < 120 {
        node.tick_or_stop(&ctx, 1, &mut world, &mut bb);
        assert_eq!(node.status(), Status::Running, "tick {}", ctx.tick);
        ctx = ctx.next();
    }

    node.tick_or_stop(&ctx, 1, &mut world, &mut bb);
    assert_eq!(node.status(), Status::Stopped);
    assert_eq!(world.started, 1);
    assert_eq!(world.ticked, 20);
    assert_eq!(world.stopped, 1);

    // Further ticks on a stopped node do nothing.
    node.tick_or_stop(&ctx.next(), 1, &mut world, &mut bb);
    assert_eq!(world.stopped, 1);
}

#[test]
fn missing_entry_value_blocks_start_without_side_effects() {
    let mut node = walk(RunDuration::fixed(5));
    let mut world = RecordingWorld::default();
    let mut bb = Blackboard::with_schema(&[TARGET.id()]);

    assert!(!node.try_start(&TickContext::new(0, 0), 1, &mut world, &mut bb));
    assert_eq!(node.status(), Status::Stopped);
    assert_eq!(world.started, 0);
}

#[test]
fn try_start_fails_while_running() {
    let mut node = walk(RunDuration::fixed(5));
    let mut world = RecordingWorld::default();
    let mut bb = blackboard_with_target();
    let ctx = TickContext::new(0, 0);

    assert!(node.try_start(&ctx, 1, &mut world, &mut bb));
    assert!(!node.try_start(&ctx, 1, &mut world, &mut bb));
    assert_eq!(world.started, 1);
}

#[test]
fn stop_is_idempotent_and_safe_before_any_start() {
    let mut node = walk(RunDuration::fixed(5));
    let mut world = RecordingWorld::default();
    let mut bb = blackboard_with_target();
    let ctx = TickContext::new(0, 0);

    node.do_stop(&ctx, 1, &mut world, &mut bb);
    assert_eq!(node.status(), Status::Stopped);
    assert_eq!(world.stopped, 0);

    assert!(node.try_start(&ctx, 1, &mut world, &mut bb));
    node.do_stop(&ctx, 1, &mut world, &mut bb);
    node.do_stop(&ctx, 1, &mut world, &mut bb);
    assert_eq!(node.status(), Status::Stopped);
    assert_eq!(world.stopped, 1);
}

#[test]
fn task_without_can_still_use_runs_for_a_single_tick() {
    struct Flash;
    impl Task<RecordingWorld> for Flash {}

    let mut node = Behavior::new("flash", Flash);
    let mut world = RecordingWorld::default();
    let mut bb = Blackboard::new();
    let ctx = TickContext::new(3, 0);

    assert!(node.try_start(&ctx, 1, &mut world, &mut bb));
    node.tick_or_stop(&ctx, 1, &mut world, &mut bb);
    assert_eq!(node.status(), Status::Stopped);
}

#[test]
fn condition_driven_stop_precedes_deadline() {
    let mut node = walk(RunDuration::fixed(50));
    let mut world = RecordingWorld::default();
    let mut bb = blackboard_with_target();
    let ctx = TickContext::new(0, 0);

    assert!(node.try_start(&ctx, 1, &mut world, &mut bb));
    node.task_mut().keep_going = false;
    node.tick_or_stop(&ctx.next(), 1, &mut world, &mut bb);
    assert_eq!(node.status(), Status::Stopped);
    assert_eq!(world.ticked, 0);
    assert_eq!(world.stopped, 1);
}

#[test]
fn tasks_may_opt_out_of_the_deadline() {
    struct Forever;
    impl Task<RecordingWorld> for Forever {
        fn can_still_use(
            &mut self,
            _ctx: &TickContext,
            _agent: u64,
            _world: &RecordingWorld,
            _blackboard: &Blackboard,
        ) -> bool {
            true
        }

        fn timed_out(&self, _ctx: &TickContext, _run_until: u64) -> bool {
            false
        }
    }

    let mut node = Behavior::new("forever", Forever).with_duration(RunDuration::fixed(1));
    let mut world = RecordingWorld::default();
    let mut bb = Blackboard::new();

    assert!(node.try_start(&TickContext::new(0, 0), 1, &mut world, &mut bb));
    node.tick_or_stop(&TickContext::new(1_000, 0), 1, &mut world, &mut bb);
    assert_eq!(node.status(), Status::Running);
}

#[test]
fn cooldown_counts_from_previous_deadline() {
    let mut node = walk(RunDuration::fixed(5)).with_cooldown(10);
    let mut world = RecordingWorld::default();
    let mut bb = blackboard_with_target();

    assert!(node.try_start(&TickContext::new(0, 0), 1, &mut world, &mut bb));
    node.tick_or_stop(&TickContext::new(5, 0), 1, &mut world, &mut bb);
    assert_eq!(node.status(), Status::Stopped);

    assert!(!node.try_start(&TickContext::new(14, 0), 1, &mut world, &mut bb));
    assert_eq!(world.started, 1);
    assert!(node.try_start(&TickContext::new(15, 0), 1, &mut world, &mut bb));
}

#[test]
fn cooldown_table_is_applied_by_name() {
    let mut node = walk(RunDuration::fixed(5));
    assert_eq!(node.cooldown(), None);

    BehaviorControl::<RecordingWorld>::apply_cooldowns(
        &mut node,
        &CooldownTable::new().with("walk", 30).with("eat", 5),
    );
    assert_eq!(node.cooldown(), Some(30));
}

#[test]
fn sampled_duration_stays_in_range_and_is_reproducible() {
    let duration = RunDuration::new(10, 30).expect("valid range");
    let mut world = RecordingWorld::default();

    for tick in 0..200 {
        let ctx = TickContext::new(tick, 42);
        let mut a = walk(duration);
        let mut b = walk(duration);
        let mut bb = blackboard_with_target();
        assert!(a.try_start(&ctx, 9, &mut world, &mut bb));
        assert!(b.try_start(&ctx, 9, &mut world, &mut bb));

        let until = a.run_until().expect("running");
        assert_eq!(Some(until), b.run_until());
        assert!((tick + 10..=tick + 30).contains(&until));
    }
}

#[test]
fn inverted_duration_range_is_rejected() {
    assert_eq!(
        RunDuration::new(30, 10),
        Err(BehaviorError::InvalidDuration { min: 30, max: 10 })
    );
}

#[test]
fn validate_reports_undeclared_keys() {
    let mut conditions = EntryConditions::builder();
    let _ = conditions.present(UNDECLARED);
    struct Noop;
    impl Task<RecordingWorld> for Noop {}
    let node = Behavior::new("broken", Noop).with_conditions(conditions.build());

    let bb = Blackboard::with_schema(&[TARGET.id()]);
    let err = BehaviorControl::<RecordingWorld>::validate(&node, &bb).unwrap_err();
    assert!(matches!(err, BehaviorError::UndeclaredKey { ref behavior, .. } if behavior == "broken"));
}

#[test]
fn lifecycle_is_traced_through_the_blackboard() {
    let mut node = walk(RunDuration::fixed(2));
    let mut world = RecordingWorld::default();
    let mut bb = blackboard_with_target();
    install_log(&mut bb);

    assert!(node.try_start(&TickContext::new(0, 0), 5, &mut world, &mut bb));
    node.tick_or_stop(&TickContext::new(2, 0), 5, &mut world, &mut bb);

    let log = bb.get(TRACE_LOG).expect("trace log installed");
    let starts: Vec<_> = log.with_tag(tags::BEHAVIOR_START).collect();
    let stops: Vec<_> = log.with_tag(tags::BEHAVIOR_STOP).collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(stops.len(), 1);
    assert_eq!(starts[0].agent, 5);
    assert_eq!(stops[0].tick, 2);
}

#[test]
fn one_shot_does_its_work_in_try_start() {
    let mut node: Box<dyn BehaviorControl<RecordingWorld>> = Box::new(OneShot::new(
        "poke",
        |_ctx: &TickContext, _agent: u64, world: &mut RecordingWorld, _bb: &mut Blackboard| {
            world.started += 1;
            world.started % 2 == 0
        },
    ));
    let mut world = RecordingWorld::default();
    let mut bb = Blackboard::new();
    let ctx = TickContext::new(0, 0);

    assert!(!node.try_start(&ctx, 1, &mut world, &mut bb));
    assert_eq!(node.status(), Status::Stopped);

    assert!(node.try_start(&ctx, 1, &mut world, &mut bb));
    assert_eq!(node.status(), Status::Running);

    node.tick_or_stop(&ctx, 1, &mut world, &mut bb);
    assert_eq!(node.status(), Status::Stopped);
    assert_eq!(world.started, 2);
}

#[test]
fn one_shot_honors_table_cooldown_and_traces_each_firing() {
    let mut node: Box<dyn BehaviorControl<RecordingWorld>> = Box::new(OneShot::new(
        "search",
        |_ctx: &TickContext, _agent: u64, world: &mut RecordingWorld, _bb: &mut Blackboard| {
            world.started += 1;
            true
        },
    ));
    node.apply_cooldowns(&CooldownTable::new().with("search", 100));
    let mut world = RecordingWorld::default();
    let mut bb = Blackboard::new();
    install_log(&mut bb);

    for tick in 0..5 {
        let ctx = TickContext::new(tick, 0);
        node.try_start(&ctx, 3, &mut world, &mut bb);
        node.tick_or_stop(&ctx, 3, &mut world, &mut bb);
    }
    assert_eq!(world.started, 1);

    // Stopping an already stopped node records nothing.
    node.do_stop(&TickContext::new(5, 0), 3, &mut world, &mut bb);

    assert!(!node.try_start(&TickContext::new(99, 0), 3, &mut world, &mut bb));
    assert!(node.try_start(&TickContext::new(100, 0), 3, &mut world, &mut bb));
    assert_eq!(world.started, 2);

    let log = bb.get(TRACE_LOG).expect("trace log installed");
    let starts: Vec<_> = log.with_tag(tags::BEHAVIOR_START).collect();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[0].agent, 3);
    assert_eq!(starts[1].tick, 100);
    assert_eq!(log.with_tag(tags::BEHAVIOR_STOP).count(), 1);
}

#[test]
fn one_shot_builder_cooldown_counts_from_the_firing_tick() {
    let mut node = OneShot::new(
        "ping",
        |_ctx: &TickContext, _agent: u64, world: &mut RecordingWorld, _bb: &mut Blackboard| {
            world.started += 1;
            true
        },
    )
    .with_cooldown(10);
    assert_eq!(node.cooldown(), Some(10));
    let mut world = RecordingWorld::default();
    let mut bb = Blackboard::new();

    let node: &mut dyn BehaviorControl<RecordingWorld> = &mut node;
    assert!(node.try_start(&TickContext::new(7, 0), 1, &mut world, &mut bb));
    node.tick_or_stop(&TickContext::new(8, 0), 1, &mut world, &mut bb);
    assert!(!node.try_start(&TickContext::new(16, 0), 1, &mut world, &mut bb));
    assert!(node.try_start(&TickContext::new(17, 0), 1, &mut world, &mut bb));
}
