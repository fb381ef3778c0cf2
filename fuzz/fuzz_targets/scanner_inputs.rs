#![no_main]

use std::io::{self, BufRead, Cursor};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;
use rootguard_core::{
    default_maps_markers, is_writable_mount_line, maps_line_marker, maps_pathname, CommandOutcome,
    CommandSpec, Device, LineMatcher, Probe, ProbeKind, StreamSource, DEFAULT_SYSTEM_MOUNT_POINT,
};

static MARKERS: Lazy<Vec<String>> = Lazy::new(default_maps_markers);

static MAPS_PROBE: Lazy<Probe> = Lazy::new(|| {
    Probe::new(
        "memory_map_scan",
        ProbeKind::StreamScanCheck {
            source: StreamSource::File(PathBuf::from("/proc/self/maps")),
            matcher: LineMatcher::MapsMarker {
                markers: default_maps_markers(),
            },
        },
        Duration::from_millis(500),
    )
});

struct BytesDevice<'a> {
    data: &'a [u8],
}

impl Device for BytesDevice<'_> {
    fn path_exists(&self, _path: &Path) -> io::Result<bool> {
        Ok(false)
    }

    fn run_command(&self, _command: &CommandSpec, _timeout: Duration) -> CommandOutcome {
        CommandOutcome::NotFound
    }

    fn connect(&self, _addr: SocketAddr, _timeout: Duration) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::ConnectionRefused))
    }

    fn open_stream(&self, _path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
        Ok(Box::new(Cursor::new(self.data.to_vec())))
    }
}

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    for line in text.lines() {
        let _ = is_writable_mount_line(line, DEFAULT_SYSTEM_MOUNT_POINT);
        let _ = maps_pathname(line);
        let _ = maps_line_marker(line, &MARKERS);
    }

    let _ = MAPS_PROBE.evaluate(&BytesDevice { data });
});
