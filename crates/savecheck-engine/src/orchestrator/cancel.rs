//! Cancellation and hand-over between runs for the same window.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use savecheck_runner::ProcessHandle;

use crate::types::WindowId;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    process: Mutex<Option<Arc<dyn ProcessHandle>>>,
}

/// Cancels a run and terminates whatever process it has in flight.
///
/// Cloning shares the token. A process attached after `cancel` is
/// terminated immediately.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        if let Some(process) = lock(&self.inner.process).as_ref() {
            tracing::debug!(pid = ?process.pid(), "terminating in-flight process");
            process.terminate();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn attach(&self, process: Arc<dyn ProcessHandle>) {
        let mut slot = lock(&self.inner.process);
        if self.is_cancelled() {
            process.terminate();
        }
        *slot = Some(process);
    }

    pub(crate) fn detach(&self) {
        lock(&self.inner.process).take();
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// One-shot "run finished" signal a successor waits on.
#[derive(Clone, Default)]
pub(crate) struct CompletionLatch {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CompletionLatch {
    pub(crate) fn complete(&self) {
        let (done, cvar) = &*self.inner;
        *lock(done) = true;
        cvar.notify_all();
    }

    pub(crate) fn wait(&self) {
        let (done, cvar) = &*self.inner;
        let mut guard = lock(done);
        while !*guard {
            guard = cvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_complete(&self) -> bool {
        *lock(&self.inner.0)
    }
}

#[derive(Clone)]
pub(crate) struct ActiveRun {
    pub generation: u64,
    pub token: CancellationToken,
    pub latch: CompletionLatch,
}

/// The newest run per window.
#[derive(Default)]
pub(crate) struct RunRegistry {
    active: Mutex<HashMap<WindowId, ActiveRun>>,
    next_generation: AtomicU64,
}

impl RunRegistry {
    /// Make a new run the window's current one, returning the run it replaces.
    pub(crate) fn register(&self, window: WindowId) -> (ActiveRun, Option<ActiveRun>) {
        let run = ActiveRun {
            generation: self.next_generation.fetch_add(1, Ordering::SeqCst),
            token: CancellationToken::new(),
            latch: CompletionLatch::default(),
        };
        let previous = lock(&self.active).insert(window, run.clone());
        (run, previous)
    }

    /// Forget the window's run if it is still `generation`.
    pub(crate) fn release(&self, window: WindowId, generation: u64) {
        let mut active = lock(&self.active);
        if active.get(&window).is_some_and(|r| r.generation == generation) {
            active.remove(&window);
        }
    }

    pub(crate) fn current(&self, window: WindowId) -> Option<ActiveRun> {
        lock(&self.active).get(&window).cloned()
    }
}

/// Held by a run's worker; on drop (normal exit or unwind) the registry
/// entry is released and successors are woken.
pub(crate) struct RunCompletion {
    registry: Arc<RunRegistry>,
    window: WindowId,
    generation: u64,
    latch: CompletionLatch,
}

impl RunCompletion {
    pub(crate) fn new(registry: Arc<RunRegistry>, window: WindowId, run: &ActiveRun) -> Self {
        Self {
            registry,
            window,
            generation: run.generation,
            latch: run.latch.clone(),
        }
    }
}

impl Drop for RunCompletion {
    fn drop(&mut self) {
        self.registry.release(self.window, self.generation);
        self.latch.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savecheck_runner::{ProcessExit, RunnerError};
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingHandle {
        terminations: AtomicUsize,
    }

    impl ProcessHandle for CountingHandle {
        fn wait(&self) -> Result<ProcessExit, RunnerError> {
            Ok(ProcessExit::new(Some(0)))
        }
        fn terminate(&self) {
            self.terminations.fetch_add(1, Ordering::SeqCst);
        }
        fn pid(&self) -> Option<u32> {
            None
        }
    }

    #[test]
    fn test_cancel_terminates_attached_process() {
        let token = CancellationToken::new();
        let handle = Arc::new(CountingHandle::default());
        token.attach(handle.clone());
        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(handle.terminations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_attach_after_cancel_terminates_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let handle = Arc::new(CountingHandle::default());
        token.clone().attach(handle.clone());
        assert_eq!(handle.terminations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detached_process_is_left_alone() {
        let token = CancellationToken::new();
        let handle = Arc::new(CountingHandle::default());
        token.attach(handle.clone());
        token.detach();
        token.cancel();
        assert_eq!(handle.terminations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_latch_wakes_waiter() {
        let latch = CompletionLatch::default();
        let waiter = {
            let latch = latch.clone();
            thread::spawn(move || latch.wait())
        };
        thread::sleep(Duration::from_millis(10));
        latch.complete();
        waiter.join().unwrap();
        assert!(latch.is_complete());
    }

    #[test]
    fn test_registry_release_ignores_stale_generation() {
        let registry = Arc::new(RunRegistry::default());
        let w = WindowId::new(7);
        let (first, none) = registry.register(w);
        assert!(none.is_none());
        let (second, prev) = registry.register(w);
        assert_eq!(prev.map(|r| r.generation), Some(first.generation));

        drop(RunCompletion::new(registry.clone(), w, &first));
        assert_eq!(registry.current(w).map(|r| r.generation), Some(second.generation));
        assert!(first.latch.is_complete());

        drop(RunCompletion::new(registry.clone(), w, &second));
        assert!(registry.current(w).is_none());
    }
}
