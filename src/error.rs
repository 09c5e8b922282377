// src/error.rs

//! Error types for debtrace

use thiserror::Error;

/// Errors surfaced by the attribution pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// The ownership query tool could not be started at all
    #[error("failed to invoke {command}: {source}")]
    CommandInvocation {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The ownership query tool failed without the recoverable
    /// not-found signature on stderr
    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// An ownership record named a package but carried no path
    #[error("ownership record for package '{package}' has no path")]
    EmptyPath { package: String },

    /// Ran out of candidate names for an origin template
    #[error("exhausted candidate names for origin template '{template}'")]
    OriginNames { template: String },
}

pub type Result<T> = std::result::Result<T, Error>;
