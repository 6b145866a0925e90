use shared_types::ModuleFailure;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundaryError {
    /// The wrapped module failed, now or on an earlier call, and has not
    /// been retried since.
    #[error("Module '{module}' crashed: {failure}")]
    Crashed {
        module: String,
        failure: ModuleFailure,
    },
}

impl BoundaryError {
    #[must_use]
    pub fn failure(&self) -> &ModuleFailure {
        match self {
            Self::Crashed { failure, .. } => failure,
        }
    }
}
