//! Where child process output goes

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::error::Result;

/// Destination for the stdout and stderr of runtime commands
#[derive(Debug)]
pub enum OutputSink {
    /// Share the terminal with the parent process
    Inherit,
    /// Append both streams to a log file
    LogFile { path: PathBuf, file: File },
}

impl OutputSink {
    /// Create (or truncate) a log file sink
    pub fn log_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self::LogFile { path, file })
    }

    /// Log file path, if output is redirected
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Inherit => None,
            Self::LogFile { path, .. } => Some(path),
        }
    }

    /// Stdio handles for one child process: `(stdout, stderr)`
    pub fn stdio(&self) -> Result<(Stdio, Stdio)> {
        match self {
            Self::Inherit => Ok((Stdio::inherit(), Stdio::inherit())),
            Self::LogFile { file, .. } => {
                let stdout = file.try_clone()?;
                let stderr = file.try_clone()?;
                Ok((Stdio::from(stdout), Stdio::from(stderr)))
            }
        }
    }

    /// Flush and sync the log file, then close it
    pub fn close(self) -> Result<()> {
        if let Self::LogFile { mut file, .. } = self {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }
}
