use tw_cas::CasError;
use tw_interp::ExecutionError;

use crate::property::PropertyError;

/// Everything that can go wrong while exploring: all three are the "fatal to the run" class of
/// error §7 describes (execution errors, internal CAS errors) — violations are never represented
/// as an `Err` here, only as entries in a [`crate::report::RunReport`].
#[derive(Debug, thiserror::Error)]
pub enum ExploreError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Property(#[from] PropertyError),
    #[error(transparent)]
    Cas(#[from] CasError),
}
