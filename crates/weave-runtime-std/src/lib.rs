//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides a concrete [`RuntimeScheduler`] for `weave-core`.
//! Applications construct a [`StdRuntime`], hand its runtime to a
//! [`weave_core::Renderer`], and call `run_until_idle` whenever
//! [`StdRuntime::take_flush_request`] reports pending deferred work.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use weave_core::{HostError, HostTree, Renderer, Runtime, RuntimeHandle, RuntimeScheduler};

type FlushWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records flush requests in an atomic flag and optionally
/// notifies an event loop.
pub struct StdScheduler {
    flush_requested: AtomicBool,
    flush_waker: RwLock<Option<FlushWaker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            flush_requested: AtomicBool::new(false),
            flush_waker: RwLock::new(None),
        }
    }

    /// Returns whether a flush has been requested since the last call.
    pub fn take_flush_request(&self) -> bool {
        self.flush_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker invoked whenever a flush is requested. It may be
    /// called from any thread.
    pub fn set_flush_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .flush_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_flush_waker(&self) {
        *self
            .flush_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .flush_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "flush_requested",
                &self.flush_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_flush(&self) {
        self.flush_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Convenience container bundling the standard scheduler with a runtime.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self { scheduler, runtime }
    }

    /// Returns a [`weave_core::Runtime`] driven by the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Builds a renderer over `host` that shares this runtime.
    pub fn renderer<H: HostTree>(&self, host: H) -> Renderer<H> {
        Renderer::with_runtime(host, self.runtime())
    }

    /// Returns whether a flush was requested since the last poll.
    pub fn take_flush_request(&self) -> bool {
        self.scheduler.take_flush_request()
    }

    /// Applies ready deferred values to `renderer` for as long as flushes
    /// keep being requested. Values that resolve while applying request the
    /// next round. Returns how many were applied.
    pub fn flush_if_requested<H: HostTree>(
        &self,
        renderer: &mut Renderer<H>,
    ) -> Result<usize, HostError> {
        let mut applied = 0;
        while self.take_flush_request() {
            applied += renderer.run_until_idle()?;
        }
        Ok(applied)
    }

    pub fn set_flush_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_flush_waker(waker);
    }

    pub fn clear_flush_waker(&self) {
        self.scheduler.clear_flush_waker();
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("pending_tasks", &self.runtime.pending_tasks())
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::future;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::task::{Poll, Waker};
    use std::thread;

    use weave_core::{state, ComponentType, Deferred, MemoryHost};

    use super::*;

    #[derive(Default)]
    struct Slot {
        value: Option<i64>,
        waker: Option<Waker>,
    }

    fn remote_count(slot: Arc<Mutex<Slot>>) -> Deferred {
        Deferred::new(future::poll_fn(move |cx| {
            let mut slot = slot.lock().unwrap();
            match slot.value.take() {
                Some(count) => Poll::Ready(Ok(state! { "count" => count })),
                None => {
                    slot.waker = Some(cx.waker().clone());
                    Poll::Pending
                }
            }
        }))
    }

    #[test]
    fn wake_from_another_thread_requests_a_flush() {
        let runtime = StdRuntime::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        {
            let wakes = Arc::clone(&wakes);
            runtime.set_flush_waker(move || {
                wakes.fetch_add(1, Ordering::SeqCst);
            });
        }
        let mut renderer = runtime.renderer(MemoryHost::new());
        let count = ComponentType::function("Count", |cx| {
            Ok(cx.state().get_int("count").unwrap_or_default().into())
        });
        renderer.render(&count).expect("initial render");
        let id = renderer.root_instance().expect("root instance");

        let slot = Arc::new(Mutex::new(Slot::default()));
        renderer
            .set_state(id, remote_count(Arc::clone(&slot)))
            .expect("set_state");
        assert!(runtime.take_flush_request(), "spawning should request a flush");
        assert_eq!(renderer.run_until_idle().expect("first flush"), 0);
        assert!(!runtime.take_flush_request());

        let remote = Arc::clone(&slot);
        thread::spawn(move || {
            let waker = {
                let mut slot = remote.lock().unwrap();
                slot.value = Some(5);
                slot.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        })
        .join()
        .expect("resolver thread");

        assert!(runtime.take_flush_request(), "wake should request a flush");
        assert_eq!(renderer.run_until_idle().expect("second flush"), 1);
        assert_eq!(renderer.host().html(), "5");
        assert!(!renderer.has_pending_work());
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cleared_waker_is_not_called() {
        let runtime = StdRuntime::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        {
            let wakes = Arc::clone(&wakes);
            runtime.set_flush_waker(move || {
                wakes.fetch_add(1, Ordering::SeqCst);
            });
        }
        runtime.clear_flush_waker();

        runtime.scheduler().schedule_flush();

        assert!(runtime.take_flush_request());
        assert_eq!(wakes.load(Ordering::SeqCst), 0);
    }
}
