//! Hook dispatch, boundaries and end-of-operation settling.

use std::mem;

use log::{debug, error, trace, warn};

use crate::component::{Component, ComponentType, InitialState};
use crate::context::Context;
use crate::element::Element;
use crate::error::{Failure, HookError, Phase, Report};
use crate::instance::{Instance, UpdateFlag};
use crate::runtime::DeferredKind;
use crate::tree::{InstanceId, TreeId};
use crate::value::Props;

impl Context<'_> {
    /// Runs one hook of `id` with the behavior checked out and the context
    /// bound to the instance. Errors come back tagged with phase and name.
    pub(crate) fn invoke<R>(
        &mut self,
        id: InstanceId,
        phase: Phase,
        f: impl FnOnce(&mut dyn Component, &mut Context<'_>) -> Result<R, HookError>,
    ) -> Result<R, HookError> {
        let Some(instance) = self.engine.instances.get_mut(id) else {
            return Err(HookError::new("component instance no longer exists").at(phase, "<destroyed>"));
        };
        let name = instance.ty.name();
        let Some(mut behavior) = instance.behavior.take() else {
            return Err(HookError::new("component is already running a hook").at(phase, name));
        };
        let result = self.with_current(id, |cx| f(&mut *behavior, cx));
        if let Some(instance) = self.engine.instances.get_mut(id) {
            instance.behavior = Some(behavior);
        }
        result.map_err(|err| err.at(phase, name))
    }

    /// Data boundary: a failure is reported and the caller continues with
    /// `None`.
    pub(crate) fn data_boundary<R>(
        &mut self,
        id: InstanceId,
        phase: Phase,
        f: impl FnOnce(&mut dyn Component, &mut Context<'_>) -> Result<R, HookError>,
    ) -> Option<R> {
        match self.invoke(id, phase, f) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("{err}");
                self.report(Report::Data(err));
                None
            }
        }
    }

    pub(crate) fn check_prop_types(&mut self, ty: &ComponentType, props: &Props) {
        if !self.engine.options.check_prop_types {
            return;
        }
        let component = ty.name();
        for (prop, validator) in ty.prop_types() {
            match validator.check(props, prop, component) {
                Ok(None) => {}
                Ok(Some(message)) => {
                    warn!("{component}: invalid prop `{prop}`: {message}");
                    self.report(Report::PropType {
                        component,
                        prop: prop.clone(),
                        message,
                    });
                }
                Err(err) => {
                    let err = err.at(Phase::PropTypes, component);
                    warn!("{err}");
                    self.report(Report::Validator {
                        component,
                        prop: prop.clone(),
                        error: err,
                    });
                }
            }
        }
    }

    /// Builds an instance and resolves its initial state. The instance is not
    /// attached to any tree node.
    pub(crate) fn construct_instance(
        &mut self,
        ty: &ComponentType,
        props: Props,
        children: Vec<Element>,
    ) -> InstanceId {
        let id = self
            .engine
            .instances
            .insert(Instance::new(ty.clone(), props, children));
        let initial = self.data_boundary(id, Phase::InitialState, |component, cx| {
            component.initial_state(cx)
        });
        match initial {
            None | Some(InitialState::Empty) => {}
            Some(InitialState::Ready(state)) => {
                if let Some(instance) = self.engine.instances.get_mut(id) {
                    instance.previous_state = state.clone();
                    instance.state = state;
                }
            }
            Some(InitialState::Deferred(deferred)) => {
                if let Some(instance) = self.engine.instances.get_mut(id) {
                    instance.flag = UpdateFlag::InProgress;
                }
                trace!("{}: initial state deferred", ty.name());
                self.engine
                    .runtime
                    .spawn_deferred(id, DeferredKind::InitialState, deferred, None);
            }
        }
        id
    }

    /// Offers a hook error raised by `id` to its own `did_catch`.
    pub(crate) fn catch_in_place(&mut self, id: InstanceId, err: HookError) -> Result<Element, Failure> {
        if !self.is_boundary(id) {
            return Err(Failure::Hook(err));
        }
        debug!("boundary catching: {err}");
        self.invoke(id, Phase::DidCatch, |component, cx| component.did_catch(err, cx))
            .map_err(Failure::Fatal)
    }

    pub(crate) fn escalate_from(&mut self, id: InstanceId, err: HookError) {
        let tree = self
            .engine
            .instances
            .get(id)
            .and_then(|instance| instance.tree);
        match tree {
            Some(tree) => self.escalate(tree, true, err),
            None => self.report_unhandled(err),
        }
    }

    /// Walks up from `tree` to the nearest error boundary and lets it replace
    /// its rendered subtree. A boundary that is itself mid-update cannot
    /// recover, and the error is reported unhandled.
    pub(crate) fn escalate(&mut self, tree: TreeId, include_self: bool, err: HookError) {
        let mut cursor = if include_self {
            Some(tree)
        } else {
            self.engine.nodes.get(tree).and_then(|node| node.parent)
        };
        while let Some(current) = cursor {
            let Some(node) = self.engine.nodes.get(current) else {
                break;
            };
            let (owner, parent, flag) = (node.owner, node.parent, node.flag);
            let boundary = owner
                .and_then(|id| self.engine.instances.get(id))
                .filter(|instance| instance.boundary && instance.tree == Some(current));
            if let (Some(instance), Some(owner)) = (boundary, owner) {
                if flag != UpdateFlag::Idle || instance.is_busy() {
                    debug!("nearest boundary {} is busy", instance.ty.name());
                    break;
                }
                self.recover_at(current, owner, err);
                return;
            }
            cursor = parent;
        }
        self.report_unhandled(err);
    }

    fn recover_at(&mut self, tree: TreeId, owner: InstanceId, err: HookError) {
        debug!("boundary recovering: {err}");
        if let Some(node) = self.engine.nodes.get_mut(tree) {
            node.flag = UpdateFlag::InProgress;
        }
        let result = match self.invoke(owner, Phase::DidCatch, |component, cx| {
            component.did_catch(err, cx)
        }) {
            Ok(fallback) => self.replace_rendered(tree, fallback),
            Err(failed) => Err(Failure::Fatal(failed)),
        };
        if let Some(node) = self.engine.nodes.get_mut(tree) {
            node.flag = UpdateFlag::Idle;
        }
        if let Err(failure) = result {
            self.recover(tree, false, failure);
        }
    }

    pub(crate) fn report(&mut self, report: Report) {
        self.engine.reports.push(report);
    }

    pub(crate) fn report_unhandled(&mut self, err: HookError) {
        error!("unhandled error: {err}");
        self.report(Report::Unhandled(err));
    }

    /// Ends a public operation: releases flags, then flushes `did_mount`
    /// calls child-first and queued updates until nothing is left.
    pub(crate) fn settle(&mut self) {
        let rounds = self.engine.options.max_flush_rounds;
        for _ in 0..rounds {
            self.release_flags();
            if self.engine.pending_mounts.is_empty() && self.engine.pending_updates.is_empty() {
                return;
            }
            for id in mem::take(&mut self.engine.pending_mounts) {
                self.did_mount(id);
            }
            for id in mem::take(&mut self.engine.pending_updates) {
                self.flush_update(id);
            }
        }
        self.release_flags();
        let dropped = self.engine.pending_mounts.len() + self.engine.pending_updates.len();
        if dropped > 0 {
            warn!("flush exceeded {rounds} rounds; dropping {dropped} queued calls");
            self.engine.pending_mounts.clear();
            for id in mem::take(&mut self.engine.pending_updates) {
                if let Some(instance) = self.engine.instances.get_mut(id) {
                    instance.pending = None;
                    instance.callbacks.clear();
                }
            }
        }
    }

    /// Runs an update queued behind a hook, then the callbacks queued with
    /// it. A pass that fails drops them.
    fn flush_update(&mut self, id: InstanceId) {
        let Some(instance) = self.engine.instances.get_mut(id) else {
            return;
        };
        let group = instance.pending.take();
        let callbacks = mem::take(&mut instance.callbacks);
        let runnable = instance.flag == UpdateFlag::Idle && !instance.is_busy();
        let tree = instance.tree;
        let tree = tree.filter(|tree| self.engine.nodes.contains_key(*tree));
        if let (Some(group), Some(tree), true) = (group, tree, runnable) {
            if !self.update_in_place(tree, group) {
                debug!("queued update failed; dropping {} callbacks", callbacks.len());
                return;
            }
        }
        for callback in callbacks {
            self.run_callback(id, callback);
        }
    }

    /// A render is about to read the instance's state; queued updates are
    /// satisfied by it.
    pub(crate) fn clear_pending(&mut self, id: InstanceId) {
        if let Some(instance) = self.engine.instances.get_mut(id) {
            instance.pending = None;
        }
    }

    fn did_mount(&mut self, id: InstanceId) {
        let Some(tree) = self.engine.instances.get(id).and_then(|instance| instance.tree) else {
            return;
        };
        if let Err(err) = self.invoke(id, Phase::DidMount, |component, cx| component.did_mount(cx)) {
            self.escalate(tree, true, err);
        }
    }

    fn release_flags(&mut self) {
        self.release_mounting(0);
        for tree in mem::take(&mut self.engine.aborted) {
            if let Some(node) = self.engine.nodes.get_mut(tree) {
                if node.flag == UpdateFlag::Aborted {
                    node.flag = UpdateFlag::Idle;
                }
            }
        }
    }

    /// Clears the mount lock of every component node mounted since `mark`.
    pub(crate) fn release_mounting(&mut self, mark: usize) {
        if mark >= self.engine.mounting.len() {
            return;
        }
        for tree in self.engine.mounting.split_off(mark) {
            if let Some(node) = self.engine.nodes.get_mut(tree) {
                if node.flag == UpdateFlag::InProgress {
                    node.flag = UpdateFlag::Idle;
                }
            }
        }
    }
}
