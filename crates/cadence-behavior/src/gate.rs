use std::collections::BTreeSet;

use cadence_core::{
    stream_id, AgentId, BbKey, Blackboard, EntryConditions, RequiredStatus, TickContext, WorldMut,
};
use cadence_tools::{emit as trace_emit, tags, TraceEvent};

use crate::node::{BehaviorControl, Status};
use crate::weighted::{ShuffleMode, WeightedList};
use crate::{BehaviorError, CooldownTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderPolicy {
    /// Authored order.
    Ordered,
    /// Weighted random order, redrawn on every start attempt.
    Shuffled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunningPolicy {
    /// Start the first child that accepts.
    RunOne,
    /// Offer a start to every stopped child.
    TryAll,
}

/// Composite node coordinating a weighted list of children.
///
/// The gate is `Running` exactly while at least one child is running. Stopping the gate stops
/// every running child and erases the gate's exit keys.
pub struct Gate<W>
where
    W: WorldMut + 'static,
{
    name: &'static str,
    stream: u64,
    conditions: EntryConditions,
    exit_keys: BTreeSet<u64>,
    order: OrderPolicy,
    running: RunningPolicy,
    children: WeightedList<Box<dyn BehaviorControl<W>>>,
    status: Status,
}

impl<W> Gate<W>
where
    W: WorldMut + 'static,
{
    pub fn new(name: &'static str, order: OrderPolicy, running: RunningPolicy) -> Self {
        Self {
            name,
            stream: stream_id(name),
            conditions: EntryConditions::none(),
            exit_keys: BTreeSet::new(),
            order,
            running,
            children: WeightedList::new(),
            status: Status::Stopped,
        }
    }

    pub fn with_conditions(mut self, conditions: EntryConditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Erase `key` from the blackboard whenever the gate stops.
    pub fn with_exit_key<T: 'static>(mut self, key: BbKey<T>) -> Self {
        self.exit_keys.insert(key.id());
        self
    }

    pub fn with_shuffle_mode(mut self, mode: ShuffleMode) -> Self {
        self.children.set_mode(mode);
        self
    }

    pub fn with_child(
        mut self,
        child: impl BehaviorControl<W>,
        weight: u32,
    ) -> Result<Self, BehaviorError> {
        self.push_child(Box::new(child), weight)?;
        Ok(self)
    }

    pub fn push_child(
        &mut self,
        child: Box<dyn BehaviorControl<W>>,
        weight: u32,
    ) -> Result<(), BehaviorError> {
        self.children.push(child, weight)
    }

    pub fn order_policy(&self) -> OrderPolicy {
        self.order
    }

    pub fn running_policy(&self) -> RunningPolicy {
        self.running
    }

    pub fn exit_keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.exit_keys.iter().copied()
    }

    pub fn children(&self) -> impl Iterator<Item = &(dyn BehaviorControl<W> + 'static)> + '_ {
        self.children.iter().map(|c| c.as_ref())
    }

    pub fn running_children(&self) -> usize {
        self.children.iter().filter(|c| c.is_running()).count()
    }

    fn any_child_running(&self) -> bool {
        self.children.iter().any(|c| c.is_running())
    }
}

impl<W> BehaviorControl<W> for Gate<W>
where
    W: WorldMut + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn status(&self) -> Status {
        self.status
    }

    fn try_start(
        &mut self,
        ctx: &TickContext,
        agent: W::Agent,
        world: &mut W,
        blackboard: &mut Blackboard,
    ) -> bool {
        if self.status == Status::Running || !self.conditions.are_met(blackboard) {
            return false;
        }

        let order: Vec<usize> = match self.order {
            OrderPolicy::Ordered => (0..self.children.len()).collect(),
            OrderPolicy::Shuffled => {
                let mut rng = ctx.rng_for_agent(agent, self.stream);
                self.children.shuffle(&mut rng)
            }
        };

        for index in order {
            let Some(child) = self.children.get_mut(index) else {
                continue;
            };
            if child.status() != Status::Stopped {
                continue;
            }
            let started = child.try_start(ctx, agent, world, blackboard);
            if started && self.running == RunningPolicy::RunOne {
                break;
            }
        }

        if !self.any_child_running() {
            return false;
        }

        self.status = Status::Running;
        tracing::trace!(gate = self.name, ?agent, tick = ctx.tick, running = self.running_children(), "started");
        trace_emit(
            blackboard,
            TraceEvent::lifecycle(ctx.tick, tags::GATE_START, agent.stable_id(), self.stream),
        );
        true
    }

    fn tick_or_stop(
        &mut self,
        ctx: &TickContext,
        agent: W::Agent,
        world: &mut W,
        blackboard: &mut Blackboard,
    ) {
        if self.status != Status::Running {
            return;
        }

        for child in self.children.iter_mut() {
            if child.is_running() {
                child.tick_or_stop(ctx, agent, world, blackboard);
            }
        }

        if !self.any_child_running() {
            self.do_stop(ctx, agent, world, blackboard);
        }
    }

    fn do_stop(
        &mut self,
        ctx: &TickContext,
        agent: W::Agent,
        world: &mut W,
        blackboard: &mut Blackboard,
    ) {
        if self.status != Status::Running {
            return;
        }
        self.status = Status::Stopped;

        for child in self.children.iter_mut() {
            if child.is_running() {
                child.do_stop(ctx, agent, world, blackboard);
            }
        }
        for &id in &self.exit_keys {
            blackboard.erase_id(id);
        }

        tracing::trace!(gate = self.name, ?agent, tick = ctx.tick, "stopped");
        trace_emit(
            blackboard,
            TraceEvent::lifecycle(ctx.tick, tags::GATE_STOP, agent.stable_id(), self.stream),
        );
    }

    fn validate(&self, blackboard: &Blackboard) -> Result<(), BehaviorError> {
        let undeclared = |source| BehaviorError::UndeclaredKey {
            behavior: self.name.to_string(),
            source,
        };
        self.conditions.validate(blackboard).map_err(undeclared)?;
        for &id in &self.exit_keys {
            blackboard
                .check(id, RequiredStatus::Registered)
                .map_err(undeclared)?;
        }
        self.children
            .iter()
            .try_for_each(|child| child.validate(blackboard))
    }

    fn apply_cooldowns(&mut self, cooldowns: &CooldownTable) {
        for child in self.children.iter_mut() {
            child.apply_cooldowns(cooldowns);
        }
    }

    fn collect_running(&self, out: &mut Vec<String>) {
        if !self.is_running() {
            return;
        }
        out.push(self.name.to_string());
        for child in self.children.iter() {
            child.collect_running(out);
        }
    }
}
