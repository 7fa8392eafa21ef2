use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context as TaskContext, Poll};

use futures_task::ArcWake;

use crate::collections::map::HashMap;
use crate::component::Callback;
use crate::error::HookError;
use crate::platform::RuntimeScheduler;
use crate::tree::InstanceId;
use crate::value::State;

/// A state value that is not available yet.
pub struct Deferred(Pin<Box<dyn Future<Output = Result<State, HookError>>>>);

impl Deferred {
    pub fn new(future: impl Future<Output = Result<State, HookError>> + 'static) -> Self {
        Self(Box::pin(future))
    }

    pub fn ready(state: State) -> Self {
        Self::new(std::future::ready(Ok(state)))
    }

    pub fn rejected(error: impl Into<HookError>) -> Self {
        Self::new(std::future::ready(Err(error.into())))
    }
}

type TaskId = u64;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum DeferredKind {
    InitialState,
    SetState,
}

/// A resolved deferred value on its way back to the state pipeline.
pub(crate) struct Completion {
    pub(crate) target: InstanceId,
    pub(crate) kind: DeferredKind,
    pub(crate) result: Result<State, HookError>,
    pub(crate) callback: Option<Callback>,
}

struct DeferredTask {
    target: InstanceId,
    kind: DeferredKind,
    future: Deferred,
    callback: Option<Callback>,
}

struct WakeQueue {
    ready: Mutex<VecDeque<TaskId>>,
    scheduler: Arc<dyn RuntimeScheduler>,
}

impl WakeQueue {
    fn push(&self, id: TaskId) {
        {
            let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
            if ready.contains(&id) {
                return;
            }
            ready.push_back(id);
        }
        self.scheduler.schedule_flush();
    }

    fn drain(&self) -> Vec<TaskId> {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        ready.drain(..).collect()
    }

    fn is_empty(&self) -> bool {
        self.ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

struct TaskWaker {
    id: TaskId,
    queue: Arc<WakeQueue>,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.queue.push(arc_self.id);
    }
}

struct RuntimeInner {
    queue: Arc<WakeQueue>,
    tasks: RefCell<HashMap<TaskId, DeferredTask>>,
    next_task_id: Cell<TaskId>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            queue: Arc::new(WakeQueue {
                ready: Mutex::new(VecDeque::new()),
                scheduler,
            }),
            tasks: RefCell::new(HashMap::new()),
            next_task_id: Cell::new(1),
        }
    }

    fn spawn(&self, task: DeferredTask) {
        let id = self.next_task_id.get();
        self.next_task_id.set(id + 1);
        self.tasks.borrow_mut().insert(id, task);
        // Every task is polled once before it can rely on its waker.
        self.queue.push(id);
    }

    fn poll_ready(&self) -> Vec<Completion> {
        let mut completions = Vec::new();
        for id in self.queue.drain() {
            let Some(mut task) = self.tasks.borrow_mut().remove(&id) else {
                continue;
            };
            let waker = futures_task::waker(Arc::new(TaskWaker {
                id,
                queue: Arc::clone(&self.queue),
            }));
            let mut cx = TaskContext::from_waker(&waker);
            match task.future.0.as_mut().poll(&mut cx) {
                Poll::Ready(result) => completions.push(Completion {
                    target: task.target,
                    kind: task.kind,
                    result,
                    callback: task.callback.take(),
                }),
                Poll::Pending => {
                    self.tasks.borrow_mut().insert(id, task);
                }
            }
        }
        completions
    }

    fn pending_tasks(&self) -> usize {
        self.tasks.borrow().len()
    }
}

/// Owns the deferred-state task table of one renderer.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    /// Deferred values that have not resolved yet.
    pub fn pending_tasks(&self) -> usize {
        self.inner.pending_tasks()
    }

    /// Whether some task was woken and waits to be polled.
    pub fn has_ready_tasks(&self) -> bool {
        !self.inner.queue.is_empty()
    }

    pub(crate) fn spawn_deferred(
        &self,
        target: InstanceId,
        kind: DeferredKind,
        future: Deferred,
        callback: Option<Callback>,
    ) {
        self.inner.spawn(DeferredTask {
            target,
            kind,
            future,
            callback,
        });
    }

    pub(crate) fn poll_ready(&self) -> Vec<Completion> {
        self.inner.poll_ready()
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_flush(&self) {}
}

/// Weak view of a runtime that outlives neither it nor its renderer.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn pending_tasks(&self) -> usize {
        self.0
            .upgrade()
            .map(|inner| inner.pending_tasks())
            .unwrap_or(0)
    }

    pub fn has_ready_tasks(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| !inner.queue.is_empty())
            .unwrap_or(false)
    }
}
