use cadence_core::{stream_id, AgentId, Blackboard, EntryConditions, TickContext, WorldMut};
use cadence_tools::{emit as trace_emit, tags, TraceEvent};
use rand::Rng;

use crate::node::{BehaviorControl, Status};
use crate::{BehaviorError, CooldownTable};

/// Inclusive range of ticks a leaf may run before it is forced to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDuration {
    min: u64,
    max: u64,
}

impl RunDuration {
    pub const DEFAULT: RunDuration = RunDuration { min: 60, max: 60 };

    pub fn new(min: u64, max: u64) -> Result<Self, BehaviorError> {
        if min > max {
            return Err(BehaviorError::InvalidDuration { min, max });
        }
        Ok(Self { min, max })
    }

    pub const fn fixed(ticks: u64) -> Self {
        Self {
            min: ticks,
            max: ticks,
        }
    }

    pub fn min(self) -> u64 {
        self.min
    }

    pub fn max(self) -> u64 {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> u64 {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

impl Default for RunDuration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The overridable part of a leaf behavior.
///
/// [`Behavior`] owns the lifecycle; a `Task` only supplies predicates and hooks. Every method
/// has a default, so a task overrides only what it needs.
///
/// Note the default [`can_still_use`](Task::can_still_use) is `false`: a task that does not
/// override it behaves as a one-shot and stops on its first `tick_or_stop`.
pub trait Task<W>: 'static
where
    W: WorldMut + 'static,
{
    fn check_extra_start_conditions(
        &mut self,
        _ctx: &TickContext,
        _agent: W::Agent,
        _world: &W,
        _blackboard: &Blackboard,
    ) -> bool {
        true
    }

    fn can_still_use(
        &mut self,
        _ctx: &TickContext,
        _agent: W::Agent,
        _world: &W,
        _blackboard: &Blackboard,
    ) -> bool {
        false
    }

    /// `run_until` is the exclusive deadline sampled at start. Return `false` unconditionally to
    /// make termination purely condition-driven.
    fn timed_out(&self, ctx: &TickContext, run_until: u64) -> bool {
        ctx.tick >= run_until
    }

    fn on_start(
        &mut self,
        _ctx: &TickContext,
        _agent: W::Agent,
        _world: &mut W,
        _blackboard: &mut Blackboard,
    ) {
    }

    fn on_tick(
        &mut self,
        _ctx: &TickContext,
        _agent: W::Agent,
        _world: &mut W,
        _blackboard: &mut Blackboard,
    ) {
    }

    fn on_stop(
        &mut self,
        _ctx: &TickContext,
        _agent: W::Agent,
        _world: &mut W,
        _blackboard: &mut Blackboard,
    ) {
    }
}

/// Leaf state machine: `Stopped -> Running -> Stopped`, bounded by a sampled run duration.
pub struct Behavior<T> {
    name: &'static str,
    stream: u64,
    conditions: EntryConditions,
    duration: RunDuration,
    cooldown: Option<u64>,
    status: Status,
    run_until: u64,
    last_run_until: Option<u64>,
    task: T,
}

impl<T> Behavior<T> {
    pub fn new(name: &'static str, task: T) -> Self {
        Self {
            name,
            stream: stream_id(name),
            conditions: EntryConditions::none(),
            duration: RunDuration::DEFAULT,
            cooldown: None,
            status: Status::Stopped,
            run_until: 0,
            last_run_until: None,
            task,
        }
    }

    pub fn with_conditions(mut self, conditions: EntryConditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_duration(mut self, duration: RunDuration) -> Self {
        self.duration = duration;
        self
    }

    /// Refuse to restart until `ticks` after the previous run's deadline.
    pub fn with_cooldown(mut self, ticks: u64) -> Self {
        self.cooldown = Some(ticks);
        self
    }

    pub fn conditions(&self) -> &EntryConditions {
        &self.conditions
    }

    pub fn duration(&self) -> RunDuration {
        self.duration
    }

    pub fn cooldown(&self) -> Option<u64> {
        self.cooldown
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Deadline of the current run, if running.
    pub fn run_until(&self) -> Option<u64> {
        (self.status == Status::Running).then_some(self.run_until)
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn task_mut(&mut self) -> &mut T {
        &mut self.task
    }

    fn cooling_down(&self, tick: u64) -> bool {
        match (self.cooldown, self.last_run_until) {
            (Some(cooldown), Some(previous)) => tick < previous.saturating_add(cooldown),
            _ => false,
        }
    }
}

impl<W, T> BehaviorControl<W> for Behavior<T>
where
    W: WorldMut + 'static,
    T: Task<W>,
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
        if self.status == Status::Running || self.cooling_down(ctx.tick) {
            return false;
        }
        if !self.conditions.are_met(blackboard) {
            return false;
        }
        if !self
            .task
            .check_extra_start_conditions(ctx, agent, &*world, &*blackboard)
        {
            return false;
        }

        let mut rng = ctx.rng_for_agent(agent, self.stream);
        self.status = Status::Running;
        self.run_until = ctx.tick.saturating_add(self.duration.sample(&mut rng));
        self.last_run_until = Some(self.run_until);

        tracing::trace!(behavior = self.name, ?agent, tick = ctx.tick, run_until = self.run_until, "started");
        trace_emit(
            blackboard,
            TraceEvent::lifecycle(ctx.tick, tags::BEHAVIOR_START, agent.stable_id(), self.stream),
        );

        self.task.on_start(ctx, agent, world, blackboard);
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

        let expired = self.task.timed_out(ctx, self.run_until);
        if expired || !self.task.can_still_use(ctx, agent, &*world, &*blackboard) {
            if expired {
                tracing::trace!(behavior = self.name, ?agent, tick = ctx.tick, "timed out");
            }
            self.do_stop(ctx, agent, world, blackboard);
        } else {
            self.task.on_tick(ctx, agent, world, blackboard);
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

        tracing::trace!(behavior = self.name, ?agent, tick = ctx.tick, "stopped");
        trace_emit(
            blackboard,
            TraceEvent::lifecycle(ctx.tick, tags::BEHAVIOR_STOP, agent.stable_id(), self.stream),
        );

        self.task.on_stop(ctx, agent, world, blackboard);
    }

    fn validate(&self, blackboard: &Blackboard) -> Result<(), BehaviorError> {
        self.conditions
            .validate(blackboard)
            .map_err(|source| BehaviorError::UndeclaredKey {
                behavior: self.name.to_string(),
                source,
            })
    }

    fn apply_cooldowns(&mut self, cooldowns: &CooldownTable) {
        if let Some(ticks) = cooldowns.get(self.name) {
            self.cooldown = Some(ticks);
        }
    }
}

/// A leaf that does all of its work inside `try_start`.
///
/// The trigger runs with full mutable access once the entry conditions hold; returning `true`
/// marks the node running until the next `tick_or_stop`, which stops it. Searches that probe
/// external candidates are usually written this way. A cooldown counts from the tick the
/// trigger last succeeded.
pub struct OneShot<F> {
    name: &'static str,
    stream: u64,
    conditions: EntryConditions,
    cooldown: Option<u64>,
    status: Status,
    last_started: Option<u64>,
    trigger: F,
}

impl<F> OneShot<F> {
    pub fn new(name: &'static str, trigger: F) -> Self {
        Self {
            name,
            stream: stream_id(name),
            conditions: EntryConditions::none(),
            cooldown: None,
            status: Status::Stopped,
            last_started: None,
            trigger,
        }
    }

    pub fn with_conditions(mut self, conditions: EntryConditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_cooldown(mut self, ticks: u64) -> Self {
        self.cooldown = Some(ticks);
        self
    }

    pub fn cooldown(&self) -> Option<u64> {
        self.cooldown
    }

    fn cooling_down(&self, tick: u64) -> bool {
        match (self.cooldown, self.last_started) {
            (Some(cooldown), Some(started)) => tick < started.saturating_add(cooldown),
            _ => false,
        }
    }
}

impl<W, F> BehaviorControl<W> for OneShot<F>
where
    W: WorldMut + 'static,
    F: FnMut(&TickContext, W::Agent, &mut W, &mut Blackboard) -> bool + 'static,
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
        if self.status == Status::Running || self.cooling_down(ctx.tick) {
            return false;
        }
        if !self.conditions.are_met(blackboard) {
            return false;
        }
        if !(self.trigger)(ctx, agent, world, blackboard) {
            return false;
        }
        self.status = Status::Running;
        self.last_started = Some(ctx.tick);

        tracing::trace!(behavior = self.name, ?agent, tick = ctx.tick, "fired");
        trace_emit(
            blackboard,
            TraceEvent::lifecycle(ctx.tick, tags::BEHAVIOR_START, agent.stable_id(), self.stream),
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
        self.do_stop(ctx, agent, world, blackboard);
    }

    fn do_stop(
        &mut self,
        ctx: &TickContext,
        agent: W::Agent,
        _world: &mut W,
        blackboard: &mut Blackboard,
    ) {
        if self.status != Status::Running {
            return;
        }
        self.status = Status::Stopped;

        tracing::trace!(behavior = self.name, ?agent, tick = ctx.tick, "stopped");
        trace_emit(
            blackboard,
            TraceEvent::lifecycle(ctx.tick, tags::BEHAVIOR_STOP, agent.stable_id(), self.stream),
        );
    }

    fn validate(&self, blackboard: &Blackboard) -> Result<(), BehaviorError> {
        self.conditions
            .validate(blackboard)
            .map_err(|source| BehaviorError::UndeclaredKey {
                behavior: self.name.to_string(),
                source,
            })
    }

    fn apply_cooldowns(&mut self, cooldowns: &CooldownTable) {
        if let Some(ticks) = cooldowns.get(self.name) {
            self.cooldown = Some(ticks);
        }
    }
}
