use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlackboardError {
    #[error("blackboard key id={key} was never registered")]
    Unregistered { key: u64 },
}
