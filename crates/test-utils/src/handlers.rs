use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use jobdag::exec::{TaskFuture, TaskHandler};
use serde_json::Value;

/// Handler that sleeps for `delay` and records how many of its calls were
/// in flight at once.
#[derive(Clone)]
pub struct ConcurrencyProbe {
    delay: Duration,
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            current: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Highest number of simultaneously running calls seen so far.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TaskHandler for ConcurrencyProbe {
    fn call(&self, _args: Vec<Value>) -> TaskFuture {
        let probe = self.clone();
        Box::pin(async move {
            probe.calls.fetch_add(1, Ordering::SeqCst);
            let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
            probe.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(probe.delay).await;

            probe.current.fetch_sub(1, Ordering::SeqCst);
            Ok(Value::Null)
        })
    }
}

/// Handler that counts its invocations and returns a fixed value.
#[derive(Clone)]
pub struct CallCounter {
    value: Value,
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    pub fn returning(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TaskHandler for CallCounter {
    fn call(&self, _args: Vec<Value>) -> TaskFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let value = self.value.clone();
        Box::pin(async move { Ok(value) })
    }
}
