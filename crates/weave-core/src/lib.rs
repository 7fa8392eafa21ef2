#![doc = r"Component lifecycle and tree reconciliation engine."]

pub mod children;
pub mod collections;
pub mod hash;
pub mod host;
pub mod platform;
pub mod runtime;

mod component;
mod context;
mod element;
mod error;
mod gate;
mod instance;
mod lifecycle;
mod options;
mod patch;
mod rebind;
mod reference;
mod tree;
mod value;

pub use component::{
    Callback, Component, ComponentType, ComponentTypeBuilder, Group, InitialState, PropType,
    SetState, Updater,
};
pub use context::Context;
pub use element::{h, ComponentElement, Element, HostElement, IncomingProps, Tag};
pub use error::{HookError, Phase, Report};
pub use hash::{key_of, Key};
pub use host::{HostError, HostId, HostTree, MemoryHost};
pub use instance::UpdateFlag;
pub use options::RendererOptions;
pub use reference::{Ref, RefTarget};
pub use platform::RuntimeScheduler;
pub use runtime::{DefaultScheduler, Deferred, Runtime, RuntimeHandle};
pub use tree::{InstanceId, TreeId, TreeNode};
pub use value::{Props, State, Value, ValueMap};

use std::mem;
use std::sync::Arc;

use log::{debug, warn};

use context::Engine;

/// Owns a host tree and everything rendered into it.
///
/// Every public operation runs to completion: hooks it triggers, `did_mount`
/// calls included, have run by the time it returns. Hook errors never
/// surface here; they are routed to error boundaries or recorded as
/// [`Report`]s. Only host-tree failures are returned.
pub struct Renderer<H: HostTree> {
    engine: Engine,
    host: H,
}

impl<H: HostTree> Renderer<H> {
    pub fn new(host: H) -> Self {
        Self::with_runtime(host, Runtime::new(Arc::new(DefaultScheduler)))
    }

    pub fn with_runtime(host: H, runtime: Runtime) -> Self {
        Self {
            engine: Engine::new(runtime, RendererOptions::default()),
            host,
        }
    }

    pub fn with_options(mut self, options: RendererOptions) -> Self {
        self.engine.options = options;
        self
    }

    pub fn options(&self) -> &RendererOptions {
        &self.engine.options
    }

    /// Mounts `element` as the root, or reconciles the current root against it.
    pub fn render(&mut self, element: impl Into<Element>) -> Result<(), HostError> {
        let element = element.into();
        self.enter(|cx| {
            let result = cx.render_root(element);
            cx.finish(result);
        })
    }

    /// Like [`render`](Self::render), then runs `callback` bound to the
    /// root instance once every `did_mount` has run. The callback is skipped
    /// when the render failed; its own error is reported unhandled.
    pub fn render_with<F>(
        &mut self,
        element: impl Into<Element>,
        callback: F,
    ) -> Result<(), HostError>
    where
        F: FnOnce(&mut Context<'_>) -> Result<(), HookError> + 'static,
    {
        let element = element.into();
        self.enter(|cx| {
            let result = cx.render_root(element);
            if cx.finish(result).is_some() {
                cx.settle();
                cx.run_root_callback(Box::new(callback));
            }
        })
    }

    /// Tears the whole tree down. `false` if nothing was mounted.
    pub fn unmount(&mut self) -> Result<bool, HostError> {
        self.enter(|cx| {
            let result = cx.unmount_root();
            cx.finish(result).unwrap_or(false)
        })
    }

    /// Builds an instance that is not part of the tree. Its state resolves
    /// like a mounted one, but updates to it never render.
    pub fn construct(&mut self, ty: &ComponentType, props: Props) -> InstanceId {
        let props = props.with_defaults(ty.default_props());
        let mut cx = Context::new(&mut self.engine, &mut self.host);
        cx.check_prop_types(ty, &props);
        cx.construct_instance(ty, props, Vec::new())
    }

    pub fn set_state(
        &mut self,
        id: InstanceId,
        partial: impl Into<Option<SetState>>,
    ) -> Result<(), HostError> {
        let partial = partial.into();
        self.enter(|cx| cx.set_state_of(id, partial))
    }

    pub fn set_state_with<F>(
        &mut self,
        id: InstanceId,
        partial: impl Into<Option<SetState>>,
        callback: F,
    ) -> Result<(), HostError>
    where
        F: FnOnce(&mut Context<'_>) -> Result<(), HookError> + 'static,
    {
        let partial = partial.into();
        self.enter(|cx| cx.set_state_of_with(id, partial, callback))
    }

    pub fn force_update(&mut self, id: InstanceId) -> Result<(), HostError> {
        self.enter(|cx| cx.dispatch_force_update(id, None, Group::Force))
    }

    pub fn force_update_with<F>(&mut self, id: InstanceId, callback: F) -> Result<(), HostError>
    where
        F: FnOnce(&mut Context<'_>) -> Result<(), HookError> + 'static,
    {
        self.enter(|cx| cx.dispatch_force_update(id, Some(Box::new(callback)), Group::Force))
    }

    /// Runs one reconciliation step for the node at `old`. When `ancestor`
    /// is given, the step is refused unless it is still `old`'s parent.
    ///
    /// Returns the node now at that position, or `None` if the pass was
    /// refused by the guard, the gate, or a stale ancestor.
    pub fn reconcile(
        &mut self,
        old: TreeId,
        element: impl Into<Element>,
        group: Group,
        ancestor: Option<TreeId>,
    ) -> Result<Option<TreeId>, HostError> {
        let element = element.into();
        self.enter(|cx| match cx.reconcile_at(old, element, group, ancestor) {
            Ok(tree) => tree,
            Err(failure) => {
                cx.recover(old, false, failure);
                None
            }
        })
    }

    /// Polls deferred values that are ready and feeds them through
    /// `set_state`, until nothing is ready or the round limit is hit.
    /// Returns how many values were applied.
    pub fn run_until_idle(&mut self) -> Result<usize, HostError> {
        let rounds = self.engine.options.max_flush_rounds;
        let mut applied = 0;
        for _ in 0..rounds {
            let completions = self.engine.runtime.poll_ready();
            if completions.is_empty() {
                return Ok(applied);
            }
            applied += completions.len();
            debug!("applying {} deferred values", completions.len());
            self.enter(|cx| {
                for completion in completions {
                    cx.complete_deferred(completion);
                }
            })?;
        }
        if self.engine.runtime.has_ready_tasks() {
            warn!("deferred flush exceeded {rounds} rounds; remaining work left queued");
        }
        Ok(applied)
    }

    /// Whether deferred values are still outstanding.
    pub fn has_pending_work(&self) -> bool {
        self.engine.runtime.pending_tasks() > 0 || self.engine.runtime.has_ready_tasks()
    }

    pub fn root(&self) -> Option<TreeId> {
        self.engine.root
    }

    pub fn tree(&self, id: TreeId) -> Option<&TreeNode> {
        self.engine.nodes.get(id)
    }

    /// Instance owning the root node, if the root is a component.
    pub fn root_instance(&self) -> Option<InstanceId> {
        self.engine
            .root
            .and_then(|root| self.engine.nodes.get(root))
            .and_then(|node| node.owner)
    }

    pub fn tree_of(&self, id: InstanceId) -> Option<TreeId> {
        self.engine
            .instances
            .get(id)
            .and_then(|instance| instance.tree)
    }

    pub fn state(&self, id: InstanceId) -> Option<State> {
        self.engine
            .instances
            .get(id)
            .map(|instance| instance.state.clone())
    }

    pub fn props(&self, id: InstanceId) -> Option<Props> {
        self.engine
            .instances
            .get(id)
            .map(|instance| instance.props.clone())
    }

    pub fn update_flag(&self, id: InstanceId) -> Option<UpdateFlag> {
        self.engine.instances.get(id).map(|instance| instance.flag)
    }

    /// Whether the instance still exists.
    pub fn is_alive(&self, id: InstanceId) -> bool {
        self.engine.instances.contains_key(id)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn reports(&self) -> &[Report] {
        &self.engine.reports
    }

    pub fn take_reports(&mut self) -> Vec<Report> {
        mem::take(&mut self.engine.reports)
    }

    pub fn runtime(&self) -> &Runtime {
        &self.engine.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.engine.runtime.handle()
    }

    fn enter<R>(&mut self, f: impl FnOnce(&mut Context<'_>) -> R) -> Result<R, HostError> {
        let result = {
            let mut cx = Context::new(&mut self.engine, &mut self.host);
            let result = f(&mut cx);
            cx.settle();
            result
        };
        match self.engine.pending_host_error.take() {
            Some(err) => Err(err),
            None => Ok(result),
        }
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod reconcile_tests;
