use std::collections::{BTreeMap, BTreeSet};

use cadence_core::{AgentId, Blackboard, EntryConditions, TickContext, WorldMut};
use serde::{Deserialize, Serialize};

use crate::node::BehaviorControl;
use crate::{BehaviorError, SchedulerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub think_every_ticks: u32,
    pub think_offset_ticks: u32,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            think_every_ticks: 1,
            think_offset_ticks: 0,
        }
    }
}

impl BrainConfig {
    /// Spread agents over `think_every_ticks` by their stable id.
    pub fn deterministic(agent: impl AgentId, think_every_ticks: u32) -> Self {
        let every = think_every_ticks.max(1);
        let offset = (agent.stable_id() % u64::from(every)) as u32;
        Self {
            think_every_ticks: every,
            think_offset_ticks: offset,
        }
    }

    pub fn should_think(&self, tick: u64) -> bool {
        let every = u64::from(self.think_every_ticks.max(1));
        tick.wrapping_add(u64::from(self.think_offset_ticks)) % every == 0
    }
}

/// Named group of top-level nodes that can be switched on and off as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Activity(pub &'static str);

impl Activity {
    pub const CORE: Activity = Activity("core");
    pub const IDLE: Activity = Activity("idle");

    pub fn name(self) -> &'static str {
        self.0
    }
}

#[derive(Debug, Default)]
struct ActivitySlot {
    requirements: EntryConditions,
    erase_when_stopped: Vec<u64>,
}

struct Scheduled<W>
where
    W: WorldMut + 'static,
{
    priority: i32,
    activity: Activity,
    node: Box<dyn BehaviorControl<W>>,
}

/// Reference driver: one agent, its blackboard and its prioritized top-level nodes.
///
/// Each tick, expired memories are forgotten first. On think ticks every stopped node of an
/// active activity is offered a start in ascending priority. Then every running node is ticked,
/// whichever activity it belongs to, so a node outlives an activity switch until it stops on its
/// own.
pub struct Brain<W>
where
    W: WorldMut + 'static,
{
    pub agent: W::Agent,
    pub config: BrainConfig,
    pub blackboard: Blackboard,
    behaviors: Vec<Scheduled<W>>,
    activities: BTreeMap<Activity, ActivitySlot>,
    core_activities: BTreeSet<Activity>,
    active: BTreeSet<Activity>,
    default_activity: Activity,
}

impl<W> Brain<W>
where
    W: WorldMut + 'static,
{
    pub fn new(agent: W::Agent, blackboard: Blackboard) -> Self {
        Self {
            agent,
            config: BrainConfig::default(),
            blackboard,
            behaviors: Vec::new(),
            activities: BTreeMap::new(),
            core_activities: BTreeSet::new(),
            active: BTreeSet::new(),
            default_activity: Activity::IDLE,
        }
    }

    /// Schedule `nodes` under `activity` with priorities `begin, begin + 1, ...`.
    ///
    /// Every node is validated against the blackboard schema first; nothing is added if any
    /// node declares an unregistered key.
    pub fn add_activity(
        &mut self,
        activity: Activity,
        begin_priority: i32,
        nodes: Vec<Box<dyn BehaviorControl<W>>>,
    ) -> Result<(), BehaviorError> {
        self.add_activity_with(activity, begin_priority, nodes, EntryConditions::none(), Vec::new())
    }

    /// Like [`add_activity`](Self::add_activity), with slot requirements that gate switching
    /// to the activity and keys erased when switching away from it.
    pub fn add_activity_with(
        &mut self,
        activity: Activity,
        begin_priority: i32,
        nodes: Vec<Box<dyn BehaviorControl<W>>>,
        requirements: EntryConditions,
        erase_when_stopped: impl IntoIterator<Item = u64>,
    ) -> Result<(), BehaviorError> {
        requirements
            .validate(&self.blackboard)
            .map_err(|source| BehaviorError::UndeclaredKey {
                behavior: activity.name().to_string(),
                source,
            })?;
        for node in &nodes {
            node.validate(&self.blackboard)?;
        }

        let slot = self.activities.entry(activity).or_default();
        slot.requirements = requirements;
        slot.erase_when_stopped.extend(erase_when_stopped);

        for (offset, node) in nodes.into_iter().enumerate() {
            self.behaviors.push(Scheduled {
                priority: begin_priority.saturating_add(offset as i32),
                activity,
                node,
            });
        }
        // Stable: equal priorities keep insertion order.
        self.behaviors.sort_by_key(|s| s.priority);
        Ok(())
    }

    /// Activities that stay active across every switch.
    pub fn set_core_activities(&mut self, activities: impl IntoIterator<Item = Activity>) {
        let previous = std::mem::take(&mut self.core_activities);
        self.active.retain(|a| !previous.contains(a));
        self.core_activities = activities.into_iter().collect();
        self.active.extend(self.core_activities.iter().copied());
    }

    pub fn set_default_activity(&mut self, activity: Activity) {
        self.default_activity = activity;
    }

    pub fn default_activity(&self) -> Activity {
        self.default_activity
    }

    pub fn use_default_activity(&mut self) {
        self.set_active_activity_if_possible(self.default_activity);
    }

    pub fn is_active(&self, activity: Activity) -> bool {
        self.active.contains(&activity)
    }

    pub fn active_activities(&self) -> impl Iterator<Item = Activity> + '_ {
        self.active.iter().copied()
    }

    pub fn active_non_core_activity(&self) -> Option<Activity> {
        self.active
            .iter()
            .copied()
            .find(|a| !self.core_activities.contains(a))
    }

    /// `false` for activities that were never added.
    pub fn requirements_met(&self, activity: Activity) -> bool {
        self.activities
            .get(&activity)
            .is_some_and(|slot| slot.requirements.are_met(&self.blackboard))
    }

    /// Switch to `activity` if its requirements hold. Returns whether it is active afterwards.
    pub fn set_active_activity_if_possible(&mut self, activity: Activity) -> bool {
        if !self.requirements_met(activity) {
            tracing::trace!(agent = ?self.agent, activity = activity.name(), "activity requirements not met");
            return false;
        }
        self.set_active_activity(activity);
        true
    }

    /// Switch to the first of `candidates` whose requirements hold.
    pub fn set_active_activity_to_first_valid(&mut self, candidates: &[Activity]) -> Option<Activity> {
        let chosen = candidates
            .iter()
            .copied()
            .find(|&a| self.requirements_met(a))?;
        self.set_active_activity(chosen);
        Some(chosen)
    }

    fn set_active_activity(&mut self, activity: Activity) {
        if self.active.contains(&activity) {
            return;
        }
        for previous in &self.active {
            if *previous == activity {
                continue;
            }
            if let Some(slot) = self.activities.get(previous) {
                for &id in &slot.erase_when_stopped {
                    self.blackboard.erase_id(id);
                }
            }
        }
        self.active.clear();
        self.active.extend(self.core_activities.iter().copied());
        self.active.insert(activity);
        tracing::debug!(agent = ?self.agent, activity = activity.name(), "activity switched");
    }

    pub fn tick(&mut self, ctx: &TickContext, world: &mut W) {
        let forgotten = self.blackboard.forget_expired(ctx.tick);
        if forgotten > 0 {
            tracing::trace!(agent = ?self.agent, tick = ctx.tick, forgotten, "expired memories erased");
        }

        if self.config.should_think(ctx.tick) {
            for scheduled in &mut self.behaviors {
                if scheduled.node.is_running() || !self.active.contains(&scheduled.activity) {
                    continue;
                }
                scheduled
                    .node
                    .try_start(ctx, self.agent, world, &mut self.blackboard);
            }
        }

        for scheduled in &mut self.behaviors {
            if scheduled.node.is_running() {
                scheduled
                    .node
                    .tick_or_stop(ctx, self.agent, world, &mut self.blackboard);
            }
        }
    }

    pub fn stop_all(&mut self, ctx: &TickContext, world: &mut W) {
        for scheduled in &mut self.behaviors {
            scheduled
                .node
                .do_stop(ctx, self.agent, world, &mut self.blackboard);
        }
    }

    /// Names of every running node, nested gate children included.
    pub fn running_behaviors(&self) -> Vec<String> {
        let mut out = Vec::new();
        for scheduled in &self.behaviors {
            scheduled.node.collect_running(&mut out);
        }
        out
    }

    pub fn apply_config(&mut self, config: &SchedulerConfig) {
        self.config = config.brain;
        for scheduled in &mut self.behaviors {
            scheduled.node.apply_cooldowns(&config.cooldowns);
        }
    }
}

pub fn tick_brains<W>(ctx: &TickContext, world: &mut W, brains: &mut [Brain<W>])
where
    W: WorldMut + 'static,
{
    brains.sort_by_key(|b| b.agent.stable_id());
    for brain in brains.iter_mut() {
        brain.tick(ctx, world);
    }
}
