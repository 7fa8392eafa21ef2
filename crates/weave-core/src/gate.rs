//! The update gate and the render driver built on it.

use log::trace;

use crate::component::{ComponentType, Group};
use crate::context::Context;
use crate::element::{Element, IncomingProps};
use crate::error::{Failure, Phase};
use crate::host::HostError;
use crate::instance::UpdateFlag;
use crate::tree::{InstanceId, TreeId};
use crate::value::{Props, State};

/// Everything one render pass compares and hands to hooks.
struct Pass {
    id: InstanceId,
    tree: TreeId,
    ty: ComponentType,
    group: Group,
    received: bool,
    next_props: Props,
    next_state: State,
    prev_props: Props,
    prev_state: State,
}

impl Context<'_> {
    /// Decides whether the component at `tree` re-renders and, if so, drives
    /// the pass. Returns the node on a completed pass and `None` when the
    /// guard or the gate refused it.
    ///
    /// Node and instance are held `InProgress` for the duration; both are
    /// restored on return, except that a failed pass leaves the node
    /// `Aborted` until the operation settles.
    pub(crate) fn should_update(
        &mut self,
        tree: TreeId,
        incoming: IncomingProps,
        children: Option<Vec<Element>>,
        group: Group,
    ) -> Result<Option<TreeId>, Failure> {
        let Some(node) = self.engine.nodes.get(tree) else {
            return Ok(None);
        };
        let Some(id) = node.owner else {
            trace!("should_update on a node without an instance");
            return Ok(None);
        };
        let node_flag = node.flag;
        let Some(instance) = self.engine.instances.get(id) else {
            return Ok(None);
        };
        if node_flag != UpdateFlag::Idle || instance.is_busy() {
            trace!("{}: update refused, pass already running", instance.ty.name());
            return Ok(None);
        }
        let instance_flag = instance.flag;
        self.set_flags(tree, id, UpdateFlag::InProgress, UpdateFlag::InProgress);

        let result = self.drive(id, tree, incoming, children, group);

        match &result {
            Ok(_) => self.set_flags(tree, id, node_flag, instance_flag),
            Err(_) => {
                self.set_flags(tree, id, UpdateFlag::Aborted, instance_flag);
                self.engine.aborted.push(tree);
            }
        }
        result
    }

    fn set_flags(&mut self, tree: TreeId, id: InstanceId, node: UpdateFlag, instance: UpdateFlag) {
        if let Some(entry) = self.engine.nodes.get_mut(tree) {
            entry.flag = node;
        }
        if let Some(entry) = self.engine.instances.get_mut(id) {
            entry.flag = instance;
        }
    }

    fn drive(
        &mut self,
        id: InstanceId,
        tree: TreeId,
        incoming: IncomingProps,
        children: Option<Vec<Element>>,
        group: Group,
    ) -> Result<Option<TreeId>, Failure> {
        let Some(instance) = self.engine.instances.get(id) else {
            return Ok(None);
        };
        let ty = instance.ty.clone();
        let prev_props = instance.props.clone();
        let prev_state = if group.is_state_driven() {
            instance.previous_state.clone()
        } else {
            instance.state.clone()
        };
        trace!("{}: {group:?} pass", ty.name());

        let mut next_props = prev_props.clone();
        let mut received = false;
        if group.receives_props() {
            if let IncomingProps::Supplied(props) = incoming {
                self.check_prop_types(&ty, &props);
                self.data_boundary(id, Phase::WillReceiveProps, |component, cx| {
                    component.will_receive_props(&props, cx)
                });
                next_props = props.with_defaults(ty.default_props());
                received = true;
            }
        }
        let Some(next_state) = self.engine.instances.get(id).map(|i| i.state.clone()) else {
            return Ok(None);
        };

        let pass = Pass {
            id,
            tree,
            ty,
            group,
            received,
            next_props,
            next_state,
            prev_props,
            prev_state,
        };
        match self.update(&pass, children) {
            Err(failure @ (Failure::Hook(_) | Failure::Host(HostError::Unbound)))
                if !self.is_bound(id, tree) =>
            {
                trace!("{}: torn down mid-pass, dropping {failure:?}", pass.ty.name());
                Ok(None)
            }
            Err(Failure::Hook(err)) => {
                let fallback = self.catch_in_place(id, err)?;
                self.replace_rendered(tree, fallback)?;
                Ok(Some(tree))
            }
            outcome => outcome,
        }
    }

    fn update(&mut self, pass: &Pass, children: Option<Vec<Element>>) -> Result<Option<TreeId>, Failure> {
        let Pass { id, tree, .. } = *pass;
        if !self.is_bound(id, tree) {
            return Ok(self.torn_down(pass));
        }
        if pass.group.consults_gate() {
            if pass.ty.is_pure()
                && pass.next_props.shallow_eq(&pass.prev_props)
                && pass.next_state.shallow_eq(&pass.prev_state)
            {
                trace!("{}: pure, nothing changed", pass.ty.name());
                return Ok(None);
            }
            let proceed = self.invoke(id, Phase::ShouldUpdate, |component, cx| {
                component.should_update(&pass.next_props, &pass.next_state, cx)
            })?;
            if !proceed {
                trace!("{}: should_update declined", pass.ty.name());
                return Ok(None);
            }
            if !self.is_bound(id, tree) {
                return Ok(self.torn_down(pass));
            }
        }

        if let Some(instance) = self.engine.instances.get_mut(id) {
            if pass.received {
                instance.props = pass.next_props.clone();
            }
            if let Some(children) = children {
                instance.children = children;
            }
        }
        if pass.received {
            self.node_mut(tree)?.props = pass.next_props.clone();
        }

        self.invoke(id, Phase::WillUpdate, |component, cx| {
            component.will_update(&pass.next_props, &pass.next_state, cx)
        })?;
        self.clear_pending(id);
        if !self.is_bound(id, tree) {
            return Ok(self.torn_down(pass));
        }
        let rendered = self.invoke(id, Phase::Render, |component, cx| component.render(cx))?;
        if !self.is_bound(id, tree) {
            return Ok(self.torn_down(pass));
        }
        self.rebind_rendered(tree, rendered.shape())?;
        if !self.is_bound(id, tree) {
            return Ok(self.torn_down(pass));
        }
        self.invoke(id, Phase::DidUpdate, |component, cx| {
            component.did_update(&pass.prev_props, &pass.prev_state, cx)
        })?;
        Ok(Some(tree))
    }

    /// Whether `id` still sits at `tree`. A hook can re-render an ancestor
    /// that replaces the very subtree being updated.
    fn is_bound(&self, id: InstanceId, tree: TreeId) -> bool {
        self.engine.nodes.get(tree).is_some_and(|node| node.owner == Some(id))
            && self
                .engine
                .instances
                .get(id)
                .is_some_and(|instance| instance.tree == Some(tree))
    }

    fn torn_down(&self, pass: &Pass) -> Option<TreeId> {
        trace!("{}: unmounted during its own pass", pass.ty.name());
        None
    }
}
