use anyhow::{bail, Result};
use rootguard_bridge::{BridgeConfig, SecurityBridge, CHECK_SECURITY_ACTION, COMPROMISED};
use rootguard_core::PostureEngine;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct CliArgs {
    action: String,
    report: bool,
}

fn parse_args() -> CliArgs {
    let mut action = CHECK_SECURITY_ACTION.to_string();
    let mut report = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--report" => report = true,
            other => action = other.to_string(),
        }
    }

    CliArgs { action, report }
}

fn init_logging(config: &BridgeConfig) {
    if !config.logging.enabled {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = BridgeConfig::load()?;
    init_logging(&config);
    let args = parse_args();

    let bridge = SecurityBridge::new(PostureEngine::new(&config.posture), Handle::current());
    info!(
        action = %args.action,
        probe_timeout_ms = config.posture.probe_timeout_ms,
        signal_sets = bridge.engine().signal_sets().len(),
        "rootguard verdict requested"
    );

    if args.report {
        if args.action != CHECK_SECURITY_ACTION {
            bail!("unsupported action '{}'", args.action);
        }
        let report = bridge.evaluate_report().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let (tx, rx) = oneshot::channel();
    let handled = bridge.execute(&args.action, move |verdict| {
        let _ = tx.send(verdict);
    });
    if !handled {
        bail!("unsupported action '{}'", args.action);
    }

    let verdict = rx.await.unwrap_or(COMPROMISED);
    println!("{}", verdict);
    Ok(())
}
