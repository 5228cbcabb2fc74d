use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while running a command.
///
/// Each variant maps to a `domain / code` pair printed at the process
/// boundary.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output")]
    Write(#[source] io::Error),

    #[error("input could not be decoded")]
    CorruptInput,

    #[error("invalid parameter: {0}")]
    Param(String),

    #[error("task did not run to completion: {0}")]
    Task(String),

    #[error("run() called before a successful validate()")]
    NotValidated,
}

impl RunError {
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Read { .. } | Self::Write(_) => "io",
            Self::CorruptInput => "decode",
            Self::Param(_) => "param",
            Self::Task(_) => "runner",
            Self::NotValidated => "command",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Read { source, .. } | Self::Write(source) => source.raw_os_error().unwrap_or(-1),
            Self::CorruptInput | Self::Param(_) | Self::Task(_) | Self::NotValidated => 1,
        }
    }
}

/// The diagnostic line printed when `run()` fails.
pub fn error_line(program: &str, err: &anyhow::Error) -> String {
    match err.downcast_ref::<RunError>() {
        Some(run) => format!("{program}: error: {} / {}", run.domain(), run.code()),
        None => format!("{program}: error: {err:#}"),
    }
}
