use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::time::Duration;

use crate::runner::{run_bounded, CommandOutcome, CommandSpec};

/// Everything a probe observes about the device it runs on.
///
/// Probes never touch the OS directly; they go through this trait so each
/// external observation can be substituted.
pub trait Device: Send + Sync {
    /// `Ok(false)` for a missing path; `Err` when existence cannot be
    /// determined (permission denied on a parent, I/O failure).
    fn path_exists(&self, path: &Path) -> io::Result<bool>;

    fn run_command(&self, command: &CommandSpec, timeout: Duration) -> CommandOutcome;

    /// Success means something accepted the connection; the socket is
    /// closed before returning.
    fn connect(&self, addr: SocketAddr, timeout: Duration) -> io::Result<()>;

    fn open_stream(&self, path: &Path) -> io::Result<Box<dyn BufRead + Send>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDevice;

impl Device for LocalDevice {
    fn path_exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }

    fn run_command(&self, command: &CommandSpec, timeout: Duration) -> CommandOutcome {
        run_bounded(command, timeout)
    }

    fn connect(&self, addr: SocketAddr, timeout: Duration) -> io::Result<()> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        drop(stream);
        Ok(())
    }

    fn open_stream(&self, path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}
