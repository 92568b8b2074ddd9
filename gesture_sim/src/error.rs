use gesture_core::{NodeError, WireError};
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the harness itself, as opposed to a scenario failing its checks.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("cannot build runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("cannot write replay fixture {path}: {source}")]
    Fixture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode replay fixture line: {0}")]
    Encode(#[from] WireError),

    #[error(transparent)]
    Node(#[from] NodeError),
}
