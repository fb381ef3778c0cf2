//! Request/response boundary between a plugin host and the posture engine.
//!
//! Each request is evaluated on the runtime's blocking pool and answered
//! exactly once. The answer is always a verdict: a panicking evaluation or a
//! request dropped before it ran is answered with `COMPROMISED`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rootguard_core::{Device, Finding, LocalDevice, PostureEngine, PostureReport, ProbeOutcome};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub const CHECK_SECURITY_ACTION: &str = "checkSecurity";
pub const COMPROMISED: i32 = 1;
pub const NOT_COMPROMISED: i32 = 0;

const BRIDGE_SIGNAL_SET: &str = "bridge";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Evaluating,
}

#[derive(Debug)]
pub struct SecurityBridge<D = LocalDevice> {
    engine: Arc<PostureEngine<D>>,
    runtime: Handle,
    in_flight: Arc<AtomicUsize>,
}

impl<D> Clone for SecurityBridge<D> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            runtime: self.runtime.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<D: Device + 'static> SecurityBridge<D> {
    pub fn new(engine: PostureEngine<D>, runtime: Handle) -> Self {
        Self {
            engine: Arc::new(engine),
            runtime,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn engine(&self) -> &PostureEngine<D> {
        &self.engine
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RequestState {
        if self.in_flight() == 0 {
            RequestState::Idle
        } else {
            RequestState::Evaluating
        }
    }

    /// Host entry point. Returns `false` for an unsupported action, in which
    /// case `reply` is dropped uncalled. Otherwise `reply` receives `1` or
    /// `0` exactly once, from a worker thread.
    pub fn execute<F>(&self, action: &str, reply: F) -> bool
    where
        F: FnOnce(i32) + Send + 'static,
    {
        if action != CHECK_SECURITY_ACTION {
            debug!(action, "unsupported bridge action");
            return false;
        }
        self.dispatch(move |report| reply(report.verdict_code()));
        true
    }

    pub async fn check_security(&self) -> i32 {
        self.evaluate_report().await.verdict_code()
    }

    pub async fn evaluate_report(&self) -> PostureReport {
        let (tx, rx) = oneshot::channel();
        self.dispatch(move |report| {
            let _ = tx.send(report);
        });
        rx.await
            .unwrap_or_else(|_| fault_report("verdict channel closed before a reply"))
    }

    fn dispatch<F>(&self, reply: F)
    where
        F: FnOnce(PostureReport) + Send + 'static,
    {
        let reply = ReplyOnce::new(reply);
        let engine = Arc::clone(&self.engine);
        let in_flight = InFlight::enter(&self.in_flight);
        // Detached: the reply guard answers even if the task never runs.
        drop(self.runtime.spawn_blocking(move || {
            let _in_flight = in_flight;
            reply.send(evaluate_fail_safe(&engine));
        }));
    }
}

fn evaluate_fail_safe<D: Device>(engine: &PostureEngine<D>) -> PostureReport {
    match panic::catch_unwind(AssertUnwindSafe(|| engine.evaluate())) {
        Ok(report) => report,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(panic = %message, "posture evaluation panicked; reporting compromised");
            fault_report(&format!("evaluation panicked: {}", message))
        }
    }
}

fn fault_report(detail: &str) -> PostureReport {
    PostureReport::compromised_by(
        Finding {
            signal_set: BRIDGE_SIGNAL_SET.to_string(),
            probe: "evaluation".to_string(),
            outcome: ProbeOutcome::faulted(detail),
        },
        0,
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

/// Single-use reply slot. Dropping it unsent answers with a fault report.
struct ReplyOnce<F: FnOnce(PostureReport)> {
    reply: Option<F>,
}

impl<F: FnOnce(PostureReport)> ReplyOnce<F> {
    fn new(reply: F) -> Self {
        Self { reply: Some(reply) }
    }

    fn send(mut self, report: PostureReport) {
        if let Some(reply) = self.reply.take() {
            reply(report);
        }
    }
}

impl<F: FnOnce(PostureReport)> Drop for ReplyOnce<F> {
    fn drop(&mut self) {
        if let Some(reply) = self.reply.take() {
            warn!("verdict request dropped before evaluation finished; reporting compromised");
            reply(fault_report("request dropped before evaluation finished"));
        }
    }
}

struct InFlight {
    counter: Arc<AtomicUsize>,
}

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
