//! Narrow interfaces between the readers and the host OS.
//!
//! Every reader receives these as trait objects so tests can swap the real
//! filesystem and process table for the in-memory versions in [`fake`].

use crate::error::{CommandError, MonitorError, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::Command;

pub type Reader = Box<dyn BufRead + Send>;

/// Opens pseudo-files such as `/proc/mounts`
pub trait FileSource: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Reader>;
}

/// Answers whether an external tool can be run. Never fails.
pub trait ToolProbe: Send + Sync {
    fn is_installed(&self, tool: &str) -> bool;
}

/// Runs an external tool to completion and hands back its stdout
pub trait CommandRunner: Send + Sync {
    fn run(&self, tool: &str, args: &[&str]) -> std::result::Result<Vec<u8>, CommandError>;
}

/// Reads straight from the host filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFileSource;

impl FileSource for HostFileSource {
    fn open(&self, path: &Path) -> io::Result<Reader> {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Looks tools up on `PATH`
#[derive(Debug, Default, Clone, Copy)]
pub struct PathToolProbe;

impl ToolProbe for PathToolProbe {
    fn is_installed(&self, tool: &str) -> bool {
        which::which(tool).is_ok()
    }
}

/// Spawns real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, tool: &str, args: &[&str]) -> std::result::Result<Vec<u8>, CommandError> {
        let output = Command::new(tool).args(args).output()?;

        if !output.status.success() {
            return Err(CommandError::Status {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Reads every line of `path`, mapping open and read failures to [`MonitorError::Io`].
///
/// The handle is dropped before returning, on success and on error.
pub(crate) fn read_lines(files: &dyn FileSource, path: &str) -> Result<Vec<String>> {
    let reader = files.open(Path::new(path)).map_err(|e| MonitorError::io(path, e))?;
    reader
        .lines()
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| MonitorError::io(path, e))
}

#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    //! In-memory ports for tests

    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::io::Cursor;
    use std::path::PathBuf;

    /// Serves fixed contents per path; any other path is `NotFound`
    #[derive(Debug, Default, Clone)]
    pub struct FakeFiles {
        files: HashMap<PathBuf, String>,
    }

    impl FakeFiles {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
            self.files.insert(path.into(), contents.into());
            self
        }
    }

    impl FileSource for FakeFiles {
        fn open(&self, path: &Path) -> io::Result<Reader> {
            match self.files.get(path) {
                Some(contents) => Ok(Box::new(Cursor::new(contents.clone().into_bytes()))),
                None => Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not present", path.display()),
                )),
            }
        }
    }

    #[derive(Debug, Default, Clone)]
    pub struct FakeTools {
        installed: HashSet<String>,
    }

    impl FakeTools {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, tool: &str) -> Self {
            self.installed.insert(tool.to_string());
            self
        }
    }

    impl ToolProbe for FakeTools {
        fn is_installed(&self, tool: &str) -> bool {
            self.installed.contains(tool)
        }
    }

    /// Canned responses keyed by the full command line, e.g. `"df -B 1"`.
    ///
    /// Command lines without a canned response fail. Every call is recorded.
    #[derive(Debug, Default)]
    pub struct FakeCommands {
        responses: HashMap<String, std::result::Result<Vec<u8>, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCommands {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_output(mut self, command_line: &str, stdout: impl Into<Vec<u8>>) -> Self {
            self.responses
                .insert(command_line.to_string(), Ok(stdout.into()));
            self
        }

        pub fn with_failure(mut self, command_line: &str, message: &str) -> Self {
            self.responses
                .insert(command_line.to_string(), Err(message.to_string()));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl CommandRunner for FakeCommands {
        fn run(&self, tool: &str, args: &[&str]) -> std::result::Result<Vec<u8>, CommandError> {
            let command_line = std::iter::once(tool)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");
            self.calls.lock().push(command_line.clone());

            match self.responses.get(&command_line) {
                Some(Ok(stdout)) => Ok(stdout.clone()),
                Some(Err(message)) => Err(CommandError::Other(message.clone())),
                None => Err(CommandError::Other(format!("no response for `{}`", command_line))),
            }
        }
    }
}
