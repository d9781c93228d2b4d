use cadence_core::{Blackboard, TickContext, WorldMut};

use crate::{BehaviorError, CooldownTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Stopped,
    Running,
}

/// The fixed lifecycle contract every schedulable node satisfies.
///
/// A driver calls [`try_start`](Self::try_start) on stopped nodes and
/// [`tick_or_stop`](Self::tick_or_stop) on running ones, once per tick. None of the three entry
/// points report expected ineligibility as an error: they return `false` or do nothing.
///
/// - `try_start` never succeeds while the node is `Running`.
/// - `tick_or_stop` on a `Stopped` node is a no-op.
/// - `do_stop` is callable at any time and idempotent; stop hooks run once per
///   `Running -> Stopped` transition.
pub trait BehaviorControl<W>: 'static
where
    W: WorldMut + 'static,
{
    fn name(&self) -> &str;

    fn status(&self) -> Status;

    fn try_start(
        &mut self,
        ctx: &TickContext,
        agent: W::Agent,
        world: &mut W,
        blackboard: &mut Blackboard,
    ) -> bool;

    fn tick_or_stop(
        &mut self,
        ctx: &TickContext,
        agent: W::Agent,
        world: &mut W,
        blackboard: &mut Blackboard,
    );

    fn do_stop(
        &mut self,
        ctx: &TickContext,
        agent: W::Agent,
        world: &mut W,
        blackboard: &mut Blackboard,
    );

    /// Check that every blackboard key this node declares is registered.
    fn validate(&self, _blackboard: &Blackboard) -> Result<(), BehaviorError> {
        Ok(())
    }

    /// Pick up per-name start cooldowns. Composites forward to their children.
    fn apply_cooldowns(&mut self, _cooldowns: &CooldownTable) {}

    /// Append the names of running nodes in this subtree.
    fn collect_running(&self, out: &mut Vec<String>) {
        if self.is_running() {
            out.push(self.name().to_string());
        }
    }

    fn is_running(&self) -> bool {
        self.status() == Status::Running
    }
}
