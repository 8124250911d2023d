//! Process identifier file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nix::unistd::Pid;

/// A pid file at a fixed path.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the recorded pid.
    pub fn read(&self) -> io::Result<Pid> {
        let content = fs::read_to_string(&self.path)?;
        parse_pid(&content).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} does not hold a pid", self.path.display()),
            )
        })
    }

    pub fn write(&self, pid: Pid) -> io::Result<()> {
        fs::write(&self.path, format!("{}\n", pid))
    }

    /// Remove the file. A missing file is not an error.
    pub fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Parse pid file contents. Only strictly positive pids are accepted.
pub fn parse_pid(content: &str) -> Option<Pid> {
    content
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|pid| *pid > 0)
        .map(Pid::from_raw)
}
