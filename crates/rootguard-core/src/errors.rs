use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ProbeError {
    Spawn(io::Error),
    Io(io::Error),
    Wait(io::Error),
    OutputChannelClosed,
    InvalidAddress(String),
    Permission(String),
}

impl ProbeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Spawn(_) => "spawn_failed",
            Self::Io(_) => "io_error",
            Self::Wait(_) => "wait_failed",
            Self::OutputChannelClosed => "output_channel_closed",
            Self::InvalidAddress(_) => "invalid_address",
            Self::Permission(_) => "permission_denied",
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "spawn failed: {}", err),
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Wait(err) => write!(f, "wait failed: {}", err),
            Self::OutputChannelClosed => write!(f, "stdout reader exited without a result"),
            Self::InvalidAddress(addr) => write!(f, "invalid probe address: {}", addr),
            Self::Permission(detail) => write!(f, "permission denied: {}", detail),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) | Self::Io(err) | Self::Wait(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ProbeError {
    fn from(value: io::Error) -> Self {
        if value.kind() == io::ErrorKind::PermissionDenied {
            return Self::Permission(value.to_string());
        }
        Self::Io(value)
    }
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
