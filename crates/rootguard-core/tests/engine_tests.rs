mod common;

use std::net::TcpListener;
use std::sync::Arc;

use common::{FakeCommand, FakeDevice};
use rootguard_core::{
    LocalDevice, PostureConfig, PostureEngine, PostureReport, INSTRUMENTATION_SIGNAL_SET,
    ROOT_SIGNAL_SET,
};

fn engine(device: FakeDevice) -> PostureEngine<FakeDevice> {
    PostureEngine::with_device(&PostureConfig::default(), device)
}

#[test]
fn clean_device_yields_zero_after_running_every_probe() {
    let engine = engine(FakeDevice::clean());
    let report = engine.evaluate();

    assert_eq!(report, PostureReport::clean(8));
    assert_eq!(report.verdict_code(), 0);
    assert_eq!(report.summary(), "ok");
    assert!(!engine.is_compromised());
}

#[test]
fn first_root_probe_positive_skips_everything_else() {
    let engine = engine(FakeDevice::clean().with_path("/system/app/Superuser.apk"));
    let report = engine.evaluate();

    assert!(report.compromised);
    assert_eq!(report.probes_evaluated, 1);
    let device = engine.device();
    assert_eq!(device.total_calls(), 1);
    assert!(device.invoked().is_empty());
    assert_eq!(
        report.finding.as_ref().map(|f| f.code()).as_deref(),
        Some("root:root_artifact_files:detected")
    );
}

#[test]
fn root_positive_never_touches_instrumentation_probes() {
    let engine = engine(
        FakeDevice::clean()
            .with_command(
                "mount",
                FakeCommand::Output("/dev/block/x /system ext4 rw 0 0\n".to_string()),
            )
            .with_open_port(27042),
    );
    let report = engine.evaluate();

    let finding = report.finding.expect("finding");
    assert_eq!(finding.signal_set, ROOT_SIGNAL_SET);
    assert_eq!(finding.probe, "system_mount_state");
    let device = engine.device();
    assert_eq!(
        device.connects.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    assert_eq!(
        device.stream_opens.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    assert_eq!(device.invoked(), vec!["which su", "mount"]);
}

#[test]
fn flipping_any_single_probe_flips_verdict() {
    let scenarios: Vec<(&str, FakeDevice)> = vec![
        ("root_artifact_files", FakeDevice::clean().with_path("/sbin/.magisk")),
        (
            "su_which",
            FakeDevice::clean().with_command("which", FakeCommand::Output("/system/bin/su\n".into())),
        ),
        ("su_fallback_paths", FakeDevice::clean().with_path("/su/bin/su")),
        (
            "system_mount_state",
            FakeDevice::clean().with_command(
                "mount",
                FakeCommand::Output("/dev/block/x /system ext4 rw 0 0\n".into()),
            ),
        ),
        ("listener_ports", FakeDevice::clean().with_open_port(27042)),
        (
            "memory_map_scan",
            FakeDevice::clean().with_maps(
                "7f0000000000-7f0000001000 r-xp 00000000 fd:01 1 /data/local/tmp/libfrida-gadget.so\n",
            ),
        ),
        (
            "process_presence",
            FakeDevice::clean().with_command("pidof", FakeCommand::Output("777\n".into())),
        ),
        (
            "system_properties",
            FakeDevice::clean().with_command(
                "getprop",
                FakeCommand::Output("[frida.server]: [running]\n".into()),
            ),
        ),
    ];

    for (expected_probe, device) in scenarios {
        let report = engine(device).evaluate();
        assert_eq!(report.verdict_code(), 1, "{expected_probe}");
        assert_eq!(
            report.finding.map(|f| f.probe).as_deref(),
            Some(expected_probe)
        );
    }
}

#[test]
fn instrumentation_finding_reports_its_set() {
    let report = engine(FakeDevice::clean().with_unreadable_maps()).evaluate();
    let finding = report.finding.clone().expect("finding");
    assert_eq!(finding.signal_set, INSTRUMENTATION_SIGNAL_SET);
    assert_eq!(finding.code(), "instrumentation:memory_map_scan:faulted");
    assert_eq!(report.probes_evaluated, 6);
    assert!(report.summary().starts_with("instrumentation/memory_map_scan"));
}

#[test]
fn report_serializes_for_diagnostics() {
    let report = engine(FakeDevice::clean().with_open_port(27043)).evaluate();
    let json = serde_json::to_value(&report).expect("serialize report");

    assert_eq!(json["compromised"], true);
    assert_eq!(json["finding"]["probe"], "listener_ports");
    assert_eq!(json["finding"]["outcome"]["outcome"], "detected");
    assert_eq!(json["probes_evaluated"], 5);
}

#[test]
fn concurrent_evaluations_agree() {
    let engine = Arc::new(engine(
        FakeDevice::clean().with_command("pidof", FakeCommand::Output("1\n".into())),
    ));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.evaluate())
        })
        .collect();
    let reports: Vec<PostureReport> = handles
        .into_iter()
        .map(|handle| handle.join().expect("join evaluation"))
        .collect();

    assert_eq!(reports[0], reports[1]);
    assert!(reports[0].compromised);
}

/// Config that keeps every real probe away from the host: tools that do not
/// exist, paths inside a temp dir and a clean maps fixture.
fn isolated_config(dir: &std::path::Path) -> PostureConfig {
    let maps_path = dir.join("maps");
    std::fs::write(&maps_path, common::CLEAN_MAPS).expect("write maps fixture");

    PostureConfig {
        probe_timeout_ms: 200,
        root_artifact_paths: vec![dir.join("Superuser.apk").display().to_string()],
        su_fallback_paths: vec![dir.join("su").display().to_string()],
        which_program: "rootguard-missing-which".to_string(),
        mount_program: "rootguard-missing-mount".to_string(),
        pidof_program: "rootguard-missing-pidof".to_string(),
        property_program: "rootguard-missing-getprop".to_string(),
        instrumentation_ports: Vec::new(),
        maps_path: maps_path.display().to_string(),
        ..PostureConfig::default()
    }
}

#[test]
fn local_device_clean_when_probes_find_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = PostureEngine::new(&isolated_config(dir.path()));
    assert_eq!(engine.evaluate(), PostureReport::clean(8));
}

#[test]
fn local_device_detects_artifact_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = isolated_config(dir.path());
    std::fs::write(dir.path().join("Superuser.apk"), b"apk").expect("write artifact");

    let report = PostureEngine::with_device(&config, LocalDevice).evaluate();
    assert_eq!(report.verdict_code(), 1);
    assert_eq!(report.probes_evaluated, 1);
}

#[test]
fn local_device_detects_loopback_listener() {
    let dir = tempfile::tempdir().expect("tempdir");
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    let port = listener.local_addr().expect("local addr").port();
    let config = PostureConfig {
        instrumentation_ports: vec![port],
        ..isolated_config(dir.path())
    };

    let report = PostureEngine::new(&config).evaluate();
    let finding = report.finding.expect("listener finding");
    assert_eq!(finding.probe, "listener_ports");
    assert!(finding.outcome.to_string().contains(&port.to_string()));
}

#[test]
fn local_device_detects_marker_in_maps_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = isolated_config(dir.path());
    std::fs::write(
        &config.maps_path,
        "7f0000000000-7f0000001000 r-xp 00000000 fd:01 1 /data/local/tmp/re.frida.server/frida-agent-64.so\n",
    )
    .expect("write maps fixture");

    let report = PostureEngine::new(&config).evaluate();
    assert_eq!(
        report.finding.map(|f| f.probe).as_deref(),
        Some("memory_map_scan")
    );
}

#[test]
fn local_device_missing_maps_file_is_positive() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = PostureConfig {
        maps_path: dir.path().join("absent-maps").display().to_string(),
        ..isolated_config(dir.path())
    };

    let report = PostureEngine::new(&config).evaluate();
    assert!(report.compromised);
    assert_eq!(
        report.finding.map(|f| f.outcome.code()),
        Some("faulted")
    );
}

#[test]
fn zero_timeout_still_detects_loopback_listener() {
    let dir = tempfile::tempdir().expect("tempdir");
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    let port = listener.local_addr().expect("local addr").port();
    let config = PostureConfig {
        probe_timeout_ms: 0,
        instrumentation_ports: vec![port],
        ..isolated_config(dir.path())
    };

    let report = PostureEngine::new(&config).evaluate();
    assert_eq!(
        report.finding.map(|f| f.probe).as_deref(),
        Some("listener_ports")
    );
}
