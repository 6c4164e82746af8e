use std::collections::HashMap;
use std::sync::Mutex;

/// Sink for per-method RPC call counts, injected into the client.
pub trait RpcMetrics: Send + Sync {
    fn record(&self, method: &'static str);
}

#[derive(Debug, Default)]
pub struct NoopMetrics;

impl RpcMetrics for NoopMetrics {
    fn record(&self, _method: &'static str) {}
}

#[derive(Debug, Default)]
pub struct CallCounter {
    calls: Mutex<HashMap<&'static str, u64>>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, method: &str) -> u64 {
        self.calls.lock().map(|calls| calls.get(method).copied().unwrap_or(0)).unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.calls.lock().map(|calls| calls.values().sum()).unwrap_or(0)
    }

    pub fn snapshot(&self) -> HashMap<&'static str, u64> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl RpcMetrics for CallCounter {
    fn record(&self, method: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(method).or_insert(0) += 1;
        }
    }
}
