use crate::AgentId;

/// Read-only world access.
///
/// Behavior predicates (`check_extra_start_conditions`, `can_still_use`) only ever see `&W`.
/// Concrete worlds expose their own queries; this trait only fixes the agent handle type.
pub trait WorldView {
    type Agent: AgentId;
}

/// Side-effect sink for the `start` / `tick` / `stop` hooks.
pub trait WorldMut: WorldView {}
