use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildgraph::exec::{LaunchFuture, LaunchSpec, ProcessLauncher, ProcessOutcome};
use buildgraph::fs::mock::MockFileSystem;

#[derive(Debug, Default)]
struct Inner {
    exit_codes: Mutex<HashMap<String, i32>>,
    unlaunchable: Mutex<Vec<String>>,
    writes: Mutex<HashMap<String, Vec<String>>>,
    launches: Mutex<Vec<String>>,
    live: AtomicUsize,
    peak: AtomicUsize,
}

/// A fake launcher that:
/// - records which actions were launched (by status text)
/// - exits with a scripted code (0 unless told otherwise)
/// - optionally writes output files into a `MockFileSystem` on success
/// - tracks how many "processes" were alive at once
#[derive(Debug, Clone)]
pub struct FakeLauncher {
    inner: Arc<Inner>,
    delay: Duration,
    fs: Option<MockFileSystem>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            delay: Duration::from_millis(5),
            fs: None,
        }
    }

    /// How long each fake process "runs".
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Write declared outputs into `fs` when an action succeeds.
    pub fn with_fs(mut self, fs: MockFileSystem) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn exit_code(self, status: &str, code: i32) -> Self {
        self.inner
            .exit_codes
            .lock()
            .unwrap()
            .insert(status.to_string(), code);
        self
    }

    /// Launching `status` fails as if the executable were missing.
    pub fn unlaunchable(self, status: &str) -> Self {
        self.inner.unlaunchable.lock().unwrap().push(status.to_string());
        self
    }

    /// On success, `status` writes `path` (absolute) into the mock fs.
    pub fn writes(self, status: &str, path: &str) -> Self {
        self.inner
            .writes
            .lock()
            .unwrap()
            .entry(status.to_string())
            .or_default()
            .push(path.to_string());
        self
    }

    pub fn launches(&self) -> Vec<String> {
        self.inner.launches.lock().unwrap().clone()
    }

    pub fn launched(&self, status: &str) -> bool {
        self.launches().iter().any(|s| s == status)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, spec: LaunchSpec) -> LaunchFuture {
        let inner = Arc::clone(&self.inner);
        let delay = self.delay;
        let fs = self.fs.clone();

        Box::pin(async move {
            inner.launches.lock().unwrap().push(spec.status.clone());

            if inner.unlaunchable.lock().unwrap().contains(&spec.status) {
                return ProcessOutcome::LaunchFailed(format!("{}: not found", spec.program));
            }

            let live = inner.live.fetch_add(1, Ordering::SeqCst) + 1;
            inner.peak.fetch_max(live, Ordering::SeqCst);

            tokio::time::sleep(delay).await;

            let code = inner
                .exit_codes
                .lock()
                .unwrap()
                .get(&spec.status)
                .copied()
                .unwrap_or(0);

            if code == 0 {
                if let Some(fs) = &fs {
                    let outputs = inner
                        .writes
                        .lock()
                        .unwrap()
                        .get(&spec.status)
                        .cloned()
                        .unwrap_or_default();
                    for path in outputs {
                        fs.add_file(path, "built");
                    }
                }
            }

            inner.live.fetch_sub(1, Ordering::SeqCst);
            ProcessOutcome::Exited(code)
        })
    }
}
