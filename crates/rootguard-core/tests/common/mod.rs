#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead, Cursor};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rootguard_core::{CommandOutcome, CommandSpec, Device, ProbeError};

pub const CLEAN_MAPS: &str = "\
55a1b2c3d000-55a1b2c4e000 r--p 00000000 fd:01 12345 /system/bin/app_process64
7f1234560000-7f1234570000 r-xp 00000000 fd:01 23456 /system/lib64/libc.so
7fff12345000-7fff12366000 rw-p 00000000 00:00 0 [stack]
";

#[derive(Debug, Clone)]
pub enum FakeCommand {
    Output(String),
    Silent,
    NotFound,
    TimedOut,
    PermissionDenied,
}

impl FakeCommand {
    fn to_outcome(&self) -> CommandOutcome {
        match self {
            Self::Output(text) => CommandOutcome::Output(text.clone()),
            Self::Silent => CommandOutcome::Silent,
            Self::NotFound => CommandOutcome::NotFound,
            Self::TimedOut => CommandOutcome::TimedOut,
            Self::PermissionDenied => CommandOutcome::Failed(ProbeError::Spawn(
                io::Error::from(io::ErrorKind::PermissionDenied),
            )),
        }
    }
}

/// Scripted device: every path absent, every tool missing, every port
/// closed and clean memory maps unless configured otherwise.
#[derive(Debug)]
pub struct FakeDevice {
    existing_paths: HashSet<PathBuf>,
    denied_paths: HashSet<PathBuf>,
    commands: HashMap<String, FakeCommand>,
    open_ports: HashSet<u16>,
    maps: Option<String>,
    pub path_checks: AtomicUsize,
    pub command_runs: AtomicUsize,
    pub connects: AtomicUsize,
    pub stream_opens: AtomicUsize,
    pub invoked_commands: Mutex<Vec<String>>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            existing_paths: HashSet::new(),
            denied_paths: HashSet::new(),
            commands: HashMap::new(),
            open_ports: HashSet::new(),
            maps: Some(CLEAN_MAPS.to_string()),
            path_checks: AtomicUsize::new(0),
            command_runs: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            stream_opens: AtomicUsize::new(0),
            invoked_commands: Mutex::new(Vec::new()),
        }
    }
}

impl FakeDevice {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.existing_paths.insert(PathBuf::from(path));
        self
    }

    pub fn with_denied_path(mut self, path: &str) -> Self {
        self.denied_paths.insert(PathBuf::from(path));
        self
    }

    pub fn with_command(mut self, program: &str, behaviour: FakeCommand) -> Self {
        self.commands.insert(program.to_string(), behaviour);
        self
    }

    pub fn with_open_port(mut self, port: u16) -> Self {
        self.open_ports.insert(port);
        self
    }

    pub fn with_maps(mut self, maps: &str) -> Self {
        self.maps = Some(maps.to_string());
        self
    }

    pub fn with_unreadable_maps(mut self) -> Self {
        self.maps = None;
        self
    }

    pub fn total_calls(&self) -> usize {
        self.path_checks.load(Ordering::SeqCst)
            + self.command_runs.load(Ordering::SeqCst)
            + self.connects.load(Ordering::SeqCst)
            + self.stream_opens.load(Ordering::SeqCst)
    }

    pub fn invoked(&self) -> Vec<String> {
        self.invoked_commands.lock().expect("invoked lock").clone()
    }
}

impl Device for FakeDevice {
    fn path_exists(&self, path: &Path) -> io::Result<bool> {
        self.path_checks.fetch_add(1, Ordering::SeqCst);
        if self.denied_paths.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(self.existing_paths.contains(path))
    }

    fn run_command(&self, command: &CommandSpec, _timeout: Duration) -> CommandOutcome {
        self.command_runs.fetch_add(1, Ordering::SeqCst);
        self.invoked_commands
            .lock()
            .expect("invoked lock")
            .push(command.to_string());
        self.commands
            .get(&command.program)
            .map(FakeCommand::to_outcome)
            .unwrap_or(CommandOutcome::NotFound)
    }

    fn connect(&self, addr: SocketAddr, _timeout: Duration) -> io::Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.open_ports.contains(&addr.port()) {
            Ok(())
        } else {
            Err(io::Error::from(io::ErrorKind::ConnectionRefused))
        }
    }

    fn open_stream(&self, _path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
        self.stream_opens.fetch_add(1, Ordering::SeqCst);
        match &self.maps {
            Some(maps) => Ok(Box::new(Cursor::new(maps.clone().into_bytes()))),
            None => Err(io::Error::from(io::ErrorKind::PermissionDenied)),
        }
    }
}
