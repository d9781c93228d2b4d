use cadence_behavior::{
    tick_brains, Activity, Behavior, BehaviorControl, Brain, Gate, OrderPolicy, RunDuration,
    RunningPolicy, Task,
};
use cadence_core::{BbKey, Blackboard, EntryConditions, TickContext, WorldMut, WorldView};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const HUNGER: BbKey<u32> = BbKey::new(1);

#[derive(Default)]
struct World {
    work_done: u64,
}

impl WorldView for World {
    type Agent = u64;
}

impl WorldMut for World {}

struct Chore;

impl Task<World> for Chore {
    fn can_still_use(
        &mut self,
        _ctx: &TickContext,
        _agent: u64,
        _world: &World,
        _blackboard: &Blackboard,
    ) -> bool {
        true
    }

    fn on_tick(&mut self, _ctx: &TickContext, _agent: u64, world: &mut World, _bb: &mut Blackboard) {
        world.work_done += 1;
    }
}

const CHORES: [&str; 8] = [
    "fetch", "chop", "plant", "harvest", "cook", "mend", "sweep", "trade",
];

fn chores_gate(name: &'static str, order: OrderPolicy) -> Gate<World> {
    let mut gate = Gate::new(name, order, RunningPolicy::RunOne);
    for (i, chore) in CHORES.into_iter().enumerate() {
        let mut conditions = EntryConditions::builder();
        let _ = conditions.registered(HUNGER);
        let leaf = Behavior::new(chore, Chore)
            .with_conditions(conditions.build())
            .with_duration(RunDuration::new(5, 20).expect("valid duration"));
        gate.push_child(Box::new(leaf), 1 + i as u32)
            .expect("positive weight");
    }
    gate
}

fn villager(agent: u64) -> Brain<World> {
    let mut brain = Brain::new(agent, Blackboard::with_schema(&[HUNGER.id()]));
    let day = Gate::new("day", OrderPolicy::Ordered, RunningPolicy::TryAll)
        .with_child(chores_gate("morning", OrderPolicy::Shuffled), 1)
        .and_then(|g| g.with_child(chores_gate("evening", OrderPolicy::Ordered), 1))
        .expect("positive weight");
    let nodes: Vec<Box<dyn BehaviorControl<World>>> = vec![Box::new(day)];
    brain
        .add_activity(Activity::IDLE, 0, nodes)
        .expect("schema covers every key");
    brain.use_default_activity();
    brain
}

fn bench_population_tick(c: &mut Criterion) {
    let mut brains: Vec<Brain<World>> = (0..256).map(villager).collect();
    let mut world = World::default();

    let mut tick: u64 = 0;
    c.bench_function("cadence-behavior/tick(agents=256,nested_gates)", |b| {
        b.iter(|| {
            let ctx = TickContext::new(tick, 0);
            tick_brains(&ctx, &mut world, &mut brains);
            black_box(world.work_done);
            tick = tick.wrapping_add(1);
        })
    });
}

criterion_group!(benches, bench_population_tick);
criterion_main!(benches);
