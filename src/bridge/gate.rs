//! Main-thread execution gate.
//!
//! The host's object graph may only be mutated from the single logical
//! execution context that owns it. The gate accepts closures over the host
//! value, queues them FIFO, and resolves each caller's future when the
//! owning context has run the closure. A panic inside a closure becomes a
//! failed future; it never takes down the drain loop.
//!
//! Ordering: jobs run in enqueue order relative to each other, but frames
//! arriving concurrently on different connections race to enqueue -- callers
//! must not assume inter-request ordering.

use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

type Job<H> = Box<dyn FnOnce(&mut H) + Send>;

/// Failure modes surfaced to gate callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The runner is gone (shutdown) or dropped the job without running it.
    #[error("main-thread gate is closed")]
    Closed,
    /// The submitted closure panicked while running on the host context.
    #[error("main-thread job panicked: {0}")]
    Panicked(String),
}

/// Create a connected gate/runner pair. The runner takes ownership of the
/// host value; the gate handle is cheap to clone and hand to tools.
pub fn gate<H>(host: H) -> (MainThreadGate<H>, GateRunner<H>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainThreadGate { tx }, GateRunner { host, rx })
}

// ---------------------------------------------------------------------------
// Submission side
// ---------------------------------------------------------------------------

/// Handle for submitting work onto the host's execution context.
pub struct MainThreadGate<H> {
    tx: mpsc::UnboundedSender<Job<H>>,
}

impl<H> Clone for MainThreadGate<H> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<H: 'static> MainThreadGate<H> {
    /// Enqueue `job` to run on the next drain of the host context and return
    /// a future resolving to its result.
    pub fn run_on_main<R, F>(&self, job: F) -> impl Future<Output = Result<R, GateError>>
    where
        F: FnOnce(&mut H) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<Result<R, GateError>>();
        let wrapped: Job<H> = Box::new(move |host: &mut H| {
            let outcome = catch_unwind(AssertUnwindSafe(|| job(host)));
            let result = match outcome {
                Ok(value) => Ok(value),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!("[Gate] Job panicked: {}", message);
                    Err(GateError::Panicked(message))
                }
            };
            let _ = tx.send(result);
        });
        let submitted = self.tx.send(wrapped).is_ok();

        async move {
            if !submitted {
                return Err(GateError::Closed);
            }
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(GateError::Closed),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Drain side
// ---------------------------------------------------------------------------

/// Owns the host value and drains queued jobs on its execution context.
pub struct GateRunner<H> {
    host: H,
    rx: mpsc::UnboundedReceiver<Job<H>>,
}

impl<H> GateRunner<H> {
    /// Run every job queued right now and return how many ran. Intended to
    /// be called once per host tick by the thread that owns host state.
    pub fn tick(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job(&mut self.host);
            ran += 1;
        }
        ran
    }

    /// Block draining jobs until every gate handle is dropped. For a
    /// dedicated host thread; must not be called from an async context.
    pub fn run(mut self) {
        while let Some(job) = self.rx.blocking_recv() {
            job(&mut self.host);
        }
    }

    /// Async drain loop, for hosts that live on a runtime task.
    pub async fn run_async(mut self) {
        while let Some(job) = self.rx.recv().await {
            job(&mut self.host);
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn jobs_run_fifo_within_one_submitter() {
        let (gate, mut runner) = gate(Vec::<u32>::new());

        let a = gate.run_on_main(|v| v.push(1));
        let b = gate.run_on_main(|v| v.push(2));
        let c = gate.run_on_main(|v| v.push(3));

        assert_eq!(runner.tick(), 3);
        let (a, b, c) = tokio::join!(a, b, c);
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(runner.host(), &vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn panic_becomes_failed_future_and_drain_continues() {
        let (gate, mut runner) = gate(0u32);

        let boom = gate.run_on_main(|_| panic!("scene exploded"));
        let after = gate.run_on_main(|n| {
            *n += 1;
            *n
        });

        assert_eq!(runner.tick(), 2);
        match boom.await {
            Err(GateError::Panicked(msg)) => assert!(msg.contains("scene exploded")),
            other => panic!("expected panic error, got {:?}", other),
        }
        assert_eq!(after.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dropped_runner_yields_closed() {
        let (gate, runner) = gate(());
        drop(runner);
        assert_eq!(gate.run_on_main(|_| ()).await, Err(GateError::Closed));
    }

    #[tokio::test]
    async fn concurrent_mutations_serialize() {
        // Two read-modify-write jobs with a deliberate stall between read and
        // write: if they interleaved, one increment would be lost.
        let (gate, runner) = gate(0u64);
        let drain = std::thread::spawn(move || runner.run());

        let mut pending = Vec::new();
        for _ in 0..2 {
            pending.push(tokio::spawn(gate.run_on_main(|n| {
                let read = *n;
                std::thread::sleep(std::time::Duration::from_millis(20));
                *n = read + 1;
                *n
            })));
        }
        let mut results = Vec::new();
        for task in pending {
            results.push(task.await.unwrap().unwrap());
        }
        results.sort_unstable();
        assert_eq!(results, vec![1, 2]);

        drop(gate);
        drain.join().unwrap();
    }
}
