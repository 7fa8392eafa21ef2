//! Engine state and the context handed to component hooks.
//!
//! A [`Context`] borrows the engine and the host tree for the duration of one
//! public operation. Hooks receive it bound to their own instance; the state
//! pipeline (`set_state` / `force_update`) lives here.

use std::mem;

use log::{debug, trace};
use slotmap::SlotMap;

use crate::component::{Callback, Group, SetState};
use crate::element::{Element, IncomingProps};
use crate::error::{Failure, HookError, Phase, Report};
use crate::host::{HostError, HostTree};
use crate::instance::{Instance, UpdateFlag};
use crate::options::RendererOptions;
use crate::runtime::{Completion, DeferredKind, Runtime};
use crate::tree::{InstanceId, TreeId, TreeNode};
use crate::value::{Props, State};

pub(crate) struct Engine {
    pub(crate) nodes: SlotMap<TreeId, TreeNode>,
    pub(crate) instances: SlotMap<InstanceId, Instance>,
    pub(crate) root: Option<TreeId>,
    pub(crate) runtime: Runtime,
    pub(crate) options: RendererOptions,
    pub(crate) reports: Vec<Report>,
    /// Instances whose `did_mount` is due, children before parents.
    pub(crate) pending_mounts: Vec<InstanceId>,
    /// Instances with an update requested from inside their own hooks.
    pub(crate) pending_updates: Vec<InstanceId>,
    /// Component nodes mounted but not yet attached to the host tree.
    pub(crate) mounting: Vec<TreeId>,
    /// Nodes left `Aborted` by a failed pass.
    pub(crate) aborted: Vec<TreeId>,
    pub(crate) pending_host_error: Option<HostError>,
}

impl Engine {
    pub(crate) fn new(runtime: Runtime, options: RendererOptions) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            instances: SlotMap::with_key(),
            root: None,
            runtime,
            options,
            reports: Vec::new(),
            pending_mounts: Vec::new(),
            pending_updates: Vec::new(),
            mounting: Vec::new(),
            aborted: Vec::new(),
            pending_host_error: None,
        }
    }

    pub(crate) fn stash_host_error(&mut self, err: HostError) {
        log::error!("host tree error: {err}");
        if self.pending_host_error.is_none() {
            self.pending_host_error = Some(err);
        }
    }
}

pub struct Context<'a> {
    pub(crate) engine: &'a mut Engine,
    pub(crate) host: &'a mut dyn HostTree,
    pub(crate) current: InstanceId,
}

impl<'a> Context<'a> {
    pub(crate) fn new(engine: &'a mut Engine, host: &'a mut dyn HostTree) -> Self {
        Self {
            engine,
            host,
            current: InstanceId::default(),
        }
    }

    /// The instance this context is bound to.
    pub fn handle(&self) -> InstanceId {
        self.current
    }

    /// Tree position of the bound instance, once mounted.
    pub fn tree(&self) -> Option<TreeId> {
        self.engine
            .instances
            .get(self.current)
            .and_then(|instance| instance.tree)
    }

    pub fn props(&self) -> Props {
        self.engine
            .instances
            .get(self.current)
            .map(|instance| instance.props.clone())
            .unwrap_or_default()
    }

    pub fn state(&self) -> State {
        self.engine
            .instances
            .get(self.current)
            .map(|instance| instance.state.clone())
            .unwrap_or_default()
    }

    /// State captured by the most recent `set_state`.
    pub fn previous_state(&self) -> State {
        self.engine
            .instances
            .get(self.current)
            .map(|instance| instance.previous_state.clone())
            .unwrap_or_default()
    }

    pub fn children(&self) -> Vec<Element> {
        self.engine
            .instances
            .get(self.current)
            .map(|instance| instance.children.clone())
            .unwrap_or_default()
    }

    pub fn set_state(&mut self, partial: impl Into<Option<SetState>>) {
        let id = self.current;
        self.set_state_of(id, partial);
    }

    pub fn set_state_with<F>(&mut self, partial: impl Into<Option<SetState>>, callback: F)
    where
        F: FnOnce(&mut Context<'_>) -> Result<(), HookError> + 'static,
    {
        let id = self.current;
        self.set_state_of_with(id, partial, callback);
    }

    /// Updates another instance, e.g. a parent handle captured in props.
    pub fn set_state_of(&mut self, id: InstanceId, partial: impl Into<Option<SetState>>) {
        if let Some(partial) = partial.into() {
            self.dispatch_set_state(id, partial, None);
        }
    }

    pub fn set_state_of_with<F>(
        &mut self,
        id: InstanceId,
        partial: impl Into<Option<SetState>>,
        callback: F,
    ) where
        F: FnOnce(&mut Context<'_>) -> Result<(), HookError> + 'static,
    {
        if let Some(partial) = partial.into() {
            self.dispatch_set_state(id, partial, Some(Box::new(callback)));
        }
    }

    pub fn force_update(&mut self) {
        let id = self.current;
        self.dispatch_force_update(id, None, Group::Force);
    }

    pub fn force_update_with<F>(&mut self, callback: F)
    where
        F: FnOnce(&mut Context<'_>) -> Result<(), HookError> + 'static,
    {
        let id = self.current;
        self.dispatch_force_update(id, Some(Box::new(callback)), Group::Force);
    }

    pub fn force_update_of(&mut self, id: InstanceId) {
        self.dispatch_force_update(id, None, Group::Force);
    }

    pub(crate) fn with_current<R>(
        &mut self,
        id: InstanceId,
        f: impl FnOnce(&mut Context<'_>) -> R,
    ) -> R {
        let saved = mem::replace(&mut self.current, id);
        let result = f(self);
        self.current = saved;
        result
    }

    pub(crate) fn dispatch_set_state(
        &mut self,
        id: InstanceId,
        partial: SetState,
        callback: Option<Callback>,
    ) {
        let mut partial = partial;
        loop {
            let Some(instance) = self.engine.instances.get_mut(id) else {
                trace!("set_state on a destroyed instance ignored");
                return;
            };
            match partial {
                SetState::Merge(next) => {
                    instance.previous_state = instance.state.clone();
                    instance.state = instance.previous_state.merge(&next);
                    self.dispatch_force_update(id, callback, Group::State);
                    return;
                }
                SetState::Update(updater) => {
                    let name = instance.ty.name();
                    instance.previous_state = instance.state.clone();
                    let previous = instance.previous_state.clone();
                    match self.with_current(id, |cx| updater(&previous, cx)) {
                        Ok(Some(next)) => partial = next,
                        Ok(None) => {
                            trace!("{name}: updater cancelled the update");
                            return;
                        }
                        Err(err) => {
                            self.escalate_from(id, err.at(Phase::Updater, name));
                            return;
                        }
                    }
                }
                SetState::Deferred(deferred) => {
                    trace!("{}: state deferred", instance.ty.name());
                    self.engine.runtime.spawn_deferred(
                        id,
                        DeferredKind::SetState,
                        deferred,
                        callback,
                    );
                    return;
                }
            }
        }
    }

    /// Re-renders `id` in place. Guard rejections are silent: when the
    /// instance is unmounted or mid-update, any state merged just before is
    /// picked up by the running pass or by the next one.
    ///
    /// A request made while the instance is busy (one of its own hooks, or a
    /// pass over it, is running) is queued. The update and the callback run
    /// when the operation settles, the callback after the render.
    pub(crate) fn dispatch_force_update(
        &mut self,
        id: InstanceId,
        callback: Option<Callback>,
        group: Group,
    ) {
        let Some(instance) = self.engine.instances.get(id) else {
            return;
        };
        let name = instance.ty.name();
        let tree = instance
            .tree
            .filter(|tree| self.engine.nodes.contains_key(*tree));
        match tree {
            None => trace!("{name}: not mounted, update skipped"),
            Some(_) if instance.flag != UpdateFlag::Idle => {
                trace!("{name}: update coalesced into the running pass");
                self.defer_update(id, None, callback);
                return;
            }
            Some(_) if instance.is_busy() => {
                trace!("{name}: update queued behind the running hook");
                self.defer_update(id, Some(group), callback);
                return;
            }
            Some(tree) => {
                if !self.update_in_place(tree, group) {
                    return;
                }
            }
        }
        if let Some(callback) = callback {
            self.run_callback(id, callback);
        }
    }

    /// Runs a pass over the component at `tree`; `false` if it failed.
    pub(crate) fn update_in_place(&mut self, tree: TreeId, group: Group) -> bool {
        match self.should_update(tree, IncomingProps::Absent, None, group) {
            Ok(_) => true,
            Err(failure) => {
                self.recover(tree, false, failure);
                false
            }
        }
    }

    fn defer_update(&mut self, id: InstanceId, group: Option<Group>, callback: Option<Callback>) {
        let Some(instance) = self.engine.instances.get_mut(id) else {
            return;
        };
        if let Some(group) = group {
            instance.pending = match (instance.pending, group) {
                (Some(Group::Force), _) | (_, Group::Force) => Some(Group::Force),
                _ => Some(Group::State),
            };
        }
        let queued = callback.is_some() || group.is_some();
        instance.callbacks.extend(callback);
        if queued && !self.engine.pending_updates.contains(&id) {
            self.engine.pending_updates.push(id);
        }
    }

    pub(crate) fn run_callback(&mut self, id: InstanceId, callback: Callback) {
        let Some(instance) = self.engine.instances.get(id) else {
            return;
        };
        let name = instance.ty.name();
        if let Err(err) = self.with_current(id, |cx| callback(cx)) {
            self.escalate_from(id, err.at(Phase::Callback, name));
        }
    }

    /// Runs a render callback bound to the root instance. Nothing above the
    /// root can catch, so a failure is reported.
    pub(crate) fn run_root_callback(&mut self, callback: Callback) {
        let root = self
            .engine
            .root
            .and_then(|root| self.engine.nodes.get(root))
            .and_then(|node| node.owner);
        let id = root.unwrap_or_default();
        let name = root
            .and_then(|id| self.engine.instances.get(id))
            .map_or("<root>", |instance| instance.ty.name());
        if let Err(err) = self.with_current(id, |cx| callback(cx)) {
            self.report_unhandled(err.at(Phase::Callback, name));
        }
    }

    /// Feeds a resolved deferred value back through `set_state`.
    pub(crate) fn complete_deferred(&mut self, completion: Completion) {
        let Completion {
            target,
            kind,
            result,
            callback,
        } = completion;
        let Some(instance) = self.engine.instances.get_mut(target) else {
            debug!("deferred state for a destroyed instance dropped");
            return;
        };
        if kind == DeferredKind::InitialState && instance.flag == UpdateFlag::InProgress {
            instance.flag = UpdateFlag::Idle;
        }
        let name = instance.ty.name();
        match result {
            Ok(state) => self.dispatch_set_state(target, SetState::Merge(state), callback),
            Err(err) => self.escalate_from(target, err.at(Phase::Deferred, name)),
        }
    }

    /// Routes a failure that escaped a pass rooted at `tree`.
    pub(crate) fn recover(&mut self, tree: TreeId, include_self: bool, failure: Failure) {
        match failure {
            Failure::Hook(err) => self.escalate(tree, include_self, err),
            Failure::Fatal(err) => self.report_unhandled(err),
            Failure::Host(err) => self.engine.stash_host_error(err),
        }
    }

    /// Top-level sink for a failure no boundary will see.
    pub(crate) fn finish<T>(&mut self, result: Result<T, Failure>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(Failure::Hook(err)) | Err(Failure::Fatal(err)) => {
                self.report_unhandled(err);
                None
            }
            Err(Failure::Host(err)) => {
                self.engine.stash_host_error(err);
                None
            }
        }
    }

    pub(crate) fn node(&self, tree: TreeId) -> Result<&TreeNode, HostError> {
        self.engine.nodes.get(tree).ok_or(HostError::Unbound)
    }

    pub(crate) fn node_mut(&mut self, tree: TreeId) -> Result<&mut TreeNode, HostError> {
        self.engine.nodes.get_mut(tree).ok_or(HostError::Unbound)
    }

    pub(crate) fn is_boundary(&self, id: InstanceId) -> bool {
        self.engine
            .instances
            .get(id)
            .is_some_and(|instance| instance.boundary)
    }
}
