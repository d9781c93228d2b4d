//! A small village: agents forage for berries, wander and chat.
//!
//! ```text
//! cargo run -p cadence --example village -- --agents 16 --ticks 600
//! RUST_LOG=cadence_behavior=trace cargo run -p cadence --example village -- --agents 2
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use tracing_subscriber::{fmt, EnvFilter};

use cadence::behavior::{
    tick_brains, Activity, Behavior, BehaviorControl, Brain, BrainConfig, Gate, OneShot,
    OrderPolicy, RetrySchedule, RunDuration, RunningPolicy, ScanThrottle, SchedulerConfig, Task,
};
use cadence::core::{
    stream_id, BbKey, Blackboard, EntryConditions, Present, Registered, TickContext, WorldMut,
    WorldView,
};
use cadence::tools::{install_log, tags, TRACE_LOG};

type Pos = (i32, i32);

const FOOD_TARGET: BbKey<Pos> = BbKey::new(1);
const CHAT_PARTNER: BbKey<u64> = BbKey::new(2);

/// How long a found bush stays worth walking to.
const FOOD_MEMORY_TICKS: u64 = 200;

#[derive(Parser)]
#[command(name = "village")]
#[command(about = "Run a deterministic village of scheduled agents", version)]
struct Cli {
    /// Number of agents
    #[arg(short, long, default_value_t = 8)]
    agents: u64,

    /// Ticks to simulate
    #[arg(short, long, default_value_t = 400)]
    ticks: u64,

    /// World seed
    #[arg(short, long, default_value_t = 7)]
    seed: u64,

    /// Scheduler config (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default)]
struct Village {
    positions: BTreeMap<u64, Pos>,
    bushes: Vec<Pos>,
    thorns: BTreeSet<Pos>,
    meals: BTreeMap<u64, u32>,
    chats: u32,
}

impl WorldView for Village {
    type Agent = u64;
}

impl WorldMut for Village {}

impl Village {
    fn generate(agents: u64, seed: u64) -> Self {
        let mut rng = cadence::core::SplitMix64::new(seed);
        let mut village = Village::default();
        for agent in 0..agents {
            village
                .positions
                .insert(agent, (rng.gen_range(-20..20), rng.gen_range(-20..20)));
        }
        for _ in 0..12 {
            let bush = (rng.gen_range(-25..25), rng.gen_range(-25..25));
            // A third of the bushes sit behind thorns nobody can get through.
            if rng.gen_range(0..3) == 0 {
                village.thorns.insert(bush);
            }
            village.bushes.push(bush);
        }
        village
    }

    fn position(&self, agent: u64) -> Pos {
        self.positions.get(&agent).copied().unwrap_or_default()
    }

    fn reachable(&self, pos: Pos) -> bool {
        !self.thorns.contains(&pos)
    }

    fn crowded(&self, agent: u64) -> bool {
        let here = self.position(agent);
        self.positions
            .iter()
            .any(|(&other, &pos)| other != agent && pos == here)
    }

    fn step_towards(&mut self, agent: u64, target: Pos) {
        let (x, y) = self.position(agent);
        let next = (x + (target.0 - x).signum(), y + (target.1 - y).signum());
        self.positions.insert(agent, next);
    }
}

fn distance(a: Pos, b: Pos) -> i32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

fn find_food(config: &SchedulerConfig) -> impl BehaviorControl<Village> {
    let mut conditions = EntryConditions::builder();
    let target = conditions.absent(FOOD_TARGET);
    let mut throttle = ScanThrottle::new(config.scan);
    let mut retries: RetrySchedule<Pos> = RetrySchedule::new(config.retry);
    let stream = stream_id("find_food");

    OneShot::new(
        "find_food",
        move |ctx: &TickContext, agent: u64, world: &mut Village, bb: &mut Blackboard| {
            let mut rng = ctx.rng_for_agent(agent, stream);
            if !throttle.ready(ctx.tick, world.crowded(agent), &mut rng) {
                return false;
            }
            retries.purge_stale(ctx.tick);

            let here = world.position(agent);
            let mut candidates = world.bushes.clone();
            candidates.sort_by_key(|&bush| (distance(here, bush), bush));

            let mut failed = Vec::new();
            for bush in candidates {
                if !retries.try_claim(&bush, ctx.tick, &mut rng) {
                    continue;
                }
                if world.reachable(bush) {
                    retries.clear();
                    target.set_with_expiry(bb, bush, ctx.tick + FOOD_MEMORY_TICKS);
                    return true;
                }
                failed.push(bush);
            }
            tracing::debug!(agent, unreachable = failed.len(), "no reachable food");
            retries.mark_failed(failed, ctx.tick, &mut rng);
            false
        },
    )
    .with_conditions(conditions.build())
}

struct WalkToFood {
    target: Present<Pos>,
}

impl Task<Village> for WalkToFood {
    fn check_extra_start_conditions(
        &mut self,
        _ctx: &TickContext,
        agent: u64,
        world: &Village,
        blackboard: &Blackboard,
    ) -> bool {
        world.position(agent) != *self.target.get(blackboard)
    }

    fn can_still_use(
        &mut self,
        _ctx: &TickContext,
        agent: u64,
        world: &Village,
        blackboard: &Blackboard,
    ) -> bool {
        // The memory may expire mid-walk.
        blackboard
            .get(self.target.key())
            .is_some_and(|&target| world.position(agent) != target)
    }

    fn on_tick(
        &mut self,
        _ctx: &TickContext,
        agent: u64,
        world: &mut Village,
        blackboard: &mut Blackboard,
    ) {
        let target = *self.target.get(blackboard);
        world.step_towards(agent, target);
    }
}

struct Eat {
    target: Registered<Pos>,
}

impl Task<Village> for Eat {
    fn check_extra_start_conditions(
        &mut self,
        _ctx: &TickContext,
        agent: u64,
        world: &Village,
        blackboard: &Blackboard,
    ) -> bool {
        self.target.get(blackboard) == Some(&world.position(agent))
    }

    fn on_start(
        &mut self,
        _ctx: &TickContext,
        agent: u64,
        world: &mut Village,
        blackboard: &mut Blackboard,
    ) {
        *world.meals.entry(agent).or_default() += 1;
        self.target.erase(blackboard);
    }
}

fn forage() -> Result<Gate<Village>> {
    let mut walk = EntryConditions::builder();
    let walk_target = walk.present(FOOD_TARGET);
    let mut eat = EntryConditions::builder();
    let eat_target = eat.registered(FOOD_TARGET);

    let gate = Gate::new("forage", OrderPolicy::Ordered, RunningPolicy::RunOne)
        .with_child(
            Behavior::new("eat", Eat { target: eat_target }).with_conditions(eat.build()),
            1,
        )?
        .with_child(
            Behavior::new("walk_to_food", WalkToFood { target: walk_target })
                .with_conditions(walk.build())
                .with_duration(RunDuration::new(40, 80)?),
            1,
        )?;
    Ok(gate)
}

struct Wander;

impl Task<Village> for Wander {
    fn can_still_use(
        &mut self,
        _ctx: &TickContext,
        _agent: u64,
        _world: &Village,
        blackboard: &Blackboard,
    ) -> bool {
        !blackboard.contains(FOOD_TARGET)
    }

    fn on_tick(
        &mut self,
        ctx: &TickContext,
        agent: u64,
        world: &mut Village,
        _blackboard: &mut Blackboard,
    ) {
        let mut rng = ctx.rng_for_agent(agent, stream_id("wander"));
        let (x, y) = world.position(agent);
        let next = (x + rng.gen_range(-1..=1), y + rng.gen_range(-1..=1));
        world.step_towards(agent, next);
    }
}

struct Chat {
    partner: Registered<u64>,
}

impl Task<Village> for Chat {
    fn check_extra_start_conditions(
        &mut self,
        _ctx: &TickContext,
        agent: u64,
        world: &Village,
        _blackboard: &Blackboard,
    ) -> bool {
        let here = world.position(agent);
        world
            .positions
            .iter()
            .any(|(&other, &pos)| other != agent && distance(here, pos) <= 3)
    }

    fn can_still_use(
        &mut self,
        _ctx: &TickContext,
        _agent: u64,
        _world: &Village,
        _blackboard: &Blackboard,
    ) -> bool {
        true
    }

    fn on_start(
        &mut self,
        _ctx: &TickContext,
        agent: u64,
        world: &mut Village,
        blackboard: &mut Blackboard,
    ) {
        let here = world.position(agent);
        let partner = world
            .positions
            .iter()
            .filter(|&(&other, _)| other != agent)
            .min_by_key(|&(&other, &pos)| (distance(here, pos), other))
            .map(|(&other, _)| other);
        if let Some(partner) = partner {
            self.partner.set(blackboard, partner);
            world.chats += 1;
        }
    }
}

fn leisure() -> Result<Gate<Village>> {
    let mut chat = EntryConditions::builder();
    let partner = chat.absent(CHAT_PARTNER);

    let gate = Gate::new("leisure", OrderPolicy::Shuffled, RunningPolicy::RunOne)
        .with_exit_key(CHAT_PARTNER)
        .with_child(
            Behavior::new("wander", Wander).with_duration(RunDuration::new(20, 60)?),
            3,
        )?
        .with_child(
            Behavior::new("chat", Chat { partner })
                .with_conditions(chat.build())
                .with_duration(RunDuration::new(10, 30)?),
            1,
        )?;
    Ok(gate)
}

fn villager(agent: u64, config: &SchedulerConfig) -> Result<Brain<Village>> {
    let mut bb = Blackboard::with_schema(&[FOOD_TARGET.id(), CHAT_PARTNER.id()]);
    install_log(&mut bb);

    let mut brain = Brain::new(agent, bb);
    let nodes: Vec<Box<dyn BehaviorControl<Village>>> = vec![
        Box::new(find_food(config)),
        Box::new(forage()?),
        Box::new(leisure()?),
    ];
    brain.add_activity(Activity::IDLE, 0, nodes)?;
    brain.use_default_activity();
    brain.apply_config(config);
    brain.config = BrainConfig::deterministic(agent, config.brain.think_every_ticks);
    Ok(brain)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    fmt().with_env_filter(filter).with_target(false).init();

    let config = match &cli.config {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("loading scheduler config {}", path.display()))?,
        None => SchedulerConfig::default(),
    };

    let mut world = Village::generate(cli.agents, cli.seed);
    let mut brains = (0..cli.agents)
        .map(|agent| villager(agent, &config))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(
        agents = cli.agents,
        bushes = world.bushes.len(),
        thorns = world.thorns.len(),
        "village ready"
    );

    let mut ctx = TickContext::new(0, cli.seed);
    for _ in 0..cli.ticks {
        tick_brains(&ctx, &mut world, &mut brains);
        ctx = ctx.next();
    }

    println!("agent  meals  starts  position   running");
    for brain in &brains {
        let starts = brain
            .blackboard
            .get(TRACE_LOG)
            .map_or(0, |log| log.with_tag(tags::BEHAVIOR_START).count());
        println!(
            "{:>5}  {:>5}  {:>6}  {:>9}  {}",
            brain.agent,
            world.meals.get(&brain.agent).copied().unwrap_or(0),
            starts,
            format!("{:?}", world.position(brain.agent)),
            brain.running_behaviors().join(","),
        );
    }
    tracing::info!(ticks = cli.ticks, chats = world.chats, "simulation finished");
    Ok(())
}
