//! Host patch primitives: mounting, in-place patching, children
//! reconciliation and removal.

use std::mem;

use log::{debug, trace, warn};

use crate::context::Context;
use crate::element::{ComponentElement, Element, HostElement, IncomingProps, Tag};
use crate::error::{Failure, HookError, Phase, Report};
use crate::host::{HostError, HostId};
use crate::instance::UpdateFlag;
use crate::tree::{InstanceId, TreeId, TreeNode};
use crate::value::Props;

impl Context<'_> {
    /// Builds the tree and host nodes for `element` under `parent`. Host
    /// nodes at the top of the new subtree are left detached; a failed mount
    /// leaves nothing behind.
    pub(crate) fn mount(&mut self, element: Element, parent: Option<TreeId>) -> Result<TreeId, Failure> {
        match element {
            Element::Empty => {
                let node = self.host.create_text("");
                let mut tree = TreeNode::new(Tag::Empty, parent);
                tree.node = Some(node);
                Ok(self.engine.nodes.insert(tree))
            }
            Element::Text(text) => {
                let node = self.host.create_text(&text);
                let mut tree = TreeNode::new(Tag::Text, parent);
                tree.node = Some(node);
                tree.text = Some(text);
                Ok(self.engine.nodes.insert(tree))
            }
            Element::Host(element) => self.mount_host(element, parent),
            Element::Fragment(children) => self.mount_fragment(children, parent),
            Element::Component(element) => self.mount_component(element, parent),
        }
    }

    /// Mounts and attaches in one step, then lifts the mount lock of every
    /// component mounted on the way.
    pub(crate) fn mount_at(
        &mut self,
        element: Element,
        parent: Option<TreeId>,
        host_parent: HostId,
        before: Option<HostId>,
    ) -> Result<TreeId, Failure> {
        let mark = self.engine.mounting.len();
        let result = self.mount(element, parent).and_then(|tree| {
            match self.attach(tree, host_parent, before) {
                Ok(()) => Ok(tree),
                Err(err) => {
                    self.discard(tree);
                    Err(err.into())
                }
            }
        });
        self.release_mounting(mark);
        result
    }

    fn mount_host(&mut self, element: HostElement, parent: Option<TreeId>) -> Result<TreeId, Failure> {
        let HostElement {
            name,
            props,
            children,
            key,
            reference,
        } = element;
        let node = self.host.create_element(&name);
        let mut tree_node = TreeNode::new(Tag::Element(name), parent);
        tree_node.key = key;
        tree_node.props = props.clone();
        tree_node.node = Some(node);
        let tree = self.engine.nodes.insert(tree_node);

        if let Err(err) = self.mount_host_body(tree, node, &props, children) {
            self.discard(tree);
            return Err(err);
        }
        self.attach_ref(tree, reference);
        Ok(tree)
    }

    fn mount_host_body(
        &mut self,
        tree: TreeId,
        node: HostId,
        props: &Props,
        children: Vec<Element>,
    ) -> Result<(), Failure> {
        for (name, value) in props.iter() {
            self.host.set_attribute(node, name, value)?;
        }
        for child in children {
            let child = self.mount(child, Some(tree))?;
            self.node_mut(tree)?.children.push(child);
            self.attach(child, node, None)?;
        }
        Ok(())
    }

    fn mount_fragment(&mut self, children: Vec<Element>, parent: Option<TreeId>) -> Result<TreeId, Failure> {
        let tree = self
            .engine
            .nodes
            .insert(TreeNode::new(Tag::Fragment, parent));
        for child in children {
            match self.mount(child, Some(tree)) {
                Ok(child) => self.node_mut(tree)?.children.push(child),
                Err(err) => {
                    self.discard(tree);
                    return Err(err);
                }
            }
        }
        Ok(tree)
    }

    fn mount_component(
        &mut self,
        element: ComponentElement,
        parent: Option<TreeId>,
    ) -> Result<TreeId, Failure> {
        let ComponentElement {
            ty,
            props,
            children,
            key,
            reference,
        } = element;
        let props = match props {
            IncomingProps::Supplied(props) => props,
            IncomingProps::Absent => Props::new(),
        }
        .with_defaults(ty.default_props());
        self.check_prop_types(&ty, &props);

        let mut tree_node = TreeNode::new(Tag::Component, parent);
        tree_node.ty = Some(ty.clone());
        tree_node.key = key;
        tree_node.props = props.clone();
        tree_node.flag = UpdateFlag::InProgress;
        let tree = self.engine.nodes.insert(tree_node);
        self.engine.mounting.push(tree);

        let id = self.construct_instance(&ty, props, children);
        if let Some(instance) = self.engine.instances.get_mut(id) {
            instance.tree = Some(tree);
        }
        self.node_mut(tree)?.owner = Some(id);
        debug!("mount {}", ty.name());

        match self.mount_rendered_initial(id, tree) {
            Ok(()) => {
                self.engine.pending_mounts.push(id);
                self.attach_ref(tree, reference);
                Ok(tree)
            }
            Err(err) => {
                self.discard(tree);
                Err(err)
            }
        }
    }

    fn mount_rendered_initial(&mut self, id: InstanceId, tree: TreeId) -> Result<(), Failure> {
        let rendered = self.first_render(id);
        let (element, caught) = match rendered {
            Ok(element) => (element, false),
            Err(err) => (self.catch_in_place(id, err)?, true),
        };
        let child = match self.mount(element.shape(), Some(tree)) {
            Ok(child) => child,
            Err(Failure::Hook(err)) if !caught && self.is_boundary(id) => {
                let fallback = self.catch_in_place(id, err)?;
                self.mount(fallback.shape(), Some(tree))?
            }
            Err(err) => return Err(err),
        };
        let node = self.node_mut(tree)?;
        node.host = Some(child);
        node.children = vec![child];
        Ok(())
    }

    /// `will_mount` and `render` run as one pass: state set from either is
    /// picked up by that render.
    fn first_render(&mut self, id: InstanceId) -> Result<Element, HookError> {
        let saved = self
            .engine
            .instances
            .get_mut(id)
            .map(|instance| mem::replace(&mut instance.flag, UpdateFlag::InProgress));
        let rendered = self
            .invoke(id, Phase::WillMount, |component, cx| component.will_mount(cx))
            .and_then(|()| self.invoke(id, Phase::Render, |component, cx| component.render(cx)));
        if let (Some(flag), Some(instance)) = (saved, self.engine.instances.get_mut(id)) {
            instance.flag = flag;
        }
        rendered
    }

    /// Updates a same-tag, non-component node in place.
    pub(crate) fn patch(&mut self, tree: TreeId, element: Element) -> Result<(), Failure> {
        match element {
            Element::Empty => Ok(()),
            Element::Text(text) => {
                let node = self.node(tree)?;
                if node.text.as_deref() == Some(&*text) {
                    return Ok(());
                }
                let host_node = node.node.ok_or(HostError::Unbound)?;
                self.host.set_text(host_node, &text)?;
                self.node_mut(tree)?.text = Some(text);
                Ok(())
            }
            Element::Host(element) => {
                let node = self.node(tree)?;
                let host_node = node.node.ok_or(HostError::Unbound)?;
                let previous = node.props.clone();
                for (name, value) in element.props.iter() {
                    if previous.get(name) != Some(value) {
                        self.host.set_attribute(host_node, name, value)?;
                    }
                }
                for name in previous.keys() {
                    if !element.props.contains_key(name) {
                        self.host.remove_attribute(host_node, name)?;
                    }
                }
                self.node_mut(tree)?.props = element.props;
                self.patch_children(tree, element.children)?;
                self.update_ref(tree, element.reference);
                Ok(())
            }
            Element::Fragment(children) => self.patch_children(tree, children),
            component @ Element::Component(_) => self.rebind(tree, component).map(|_| ()),
        }
    }

    /// Index-wise reconciliation of `parent`'s children.
    pub(crate) fn patch_children(&mut self, parent: TreeId, children: Vec<Element>) -> Result<(), Failure> {
        let previous = self.node(parent)?.children.clone();
        let count = children.len();
        for (index, element) in children.into_iter().enumerate() {
            match previous.get(index) {
                Some(&old) => {
                    self.rebind(old, element)?;
                }
                None => {
                    let (host_parent, before) = self.append_point(parent)?;
                    let child = self.mount_at(element, Some(parent), host_parent, before)?;
                    self.node_mut(parent)?.children.push(child);
                }
            }
        }
        for &extra in previous.iter().skip(count) {
            self.remove(extra)?;
            self.node_mut(parent)?.children.retain(|&child| child != extra);
        }
        Ok(())
    }

    fn append_point(&self, parent: TreeId) -> Result<(HostId, Option<HostId>), Failure> {
        let node = self.node(parent)?;
        match node.tag {
            Tag::Element(_) => Ok((node.node.ok_or(HostError::Unbound)?, None)),
            _ => Ok((self.host_parent(parent), self.next_host_sibling(parent))),
        }
    }

    /// Unmounts `tree` and takes its host nodes out of the host tree.
    pub(crate) fn remove(&mut self, tree: TreeId) -> Result<(), Failure> {
        let host_parent = self.host_parent(tree);
        self.unmount(tree);
        self.detach_subtree(tree, host_parent)
    }

    /// Forgets an already unmounted subtree and releases its host nodes.
    pub(crate) fn detach_subtree(&mut self, tree: TreeId, host_parent: HostId) -> Result<(), Failure> {
        let roots = self.host_nodes(tree);
        self.forget(tree);
        for node in roots {
            self.host.remove_child(host_parent, node)?;
            self.host.release(node)?;
        }
        Ok(())
    }

    /// Runs `will_unmount` parent-first, clears refs and detaches every
    /// instance below `tree` from its node.
    pub(crate) fn unmount(&mut self, tree: TreeId) {
        self.detach_ref(tree);
        let Some(node) = self.engine.nodes.get(tree) else {
            return;
        };
        if let Some(id) = node.owner {
            let live = self
                .engine
                .instances
                .get(id)
                .filter(|instance| instance.tree == Some(tree))
                .map(|instance| instance.is_busy());
            match live {
                Some(true) => trace!("skipping will_unmount of a component running a hook"),
                Some(false) => {
                    if let Err(err) =
                        self.invoke(id, Phase::WillUnmount, |component, cx| component.will_unmount(cx))
                    {
                        warn!("{err}");
                        self.report(Report::Teardown(err));
                    }
                }
                None => {}
            }
            if let Some(instance) = self.engine.instances.get_mut(id) {
                if instance.tree == Some(tree) {
                    instance.tree = None;
                }
            }
        }
        let children = self
            .engine
            .nodes
            .get(tree)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        for child in children {
            self.unmount(child);
        }
    }

    /// Drops a subtree from the arenas without running any hook.
    fn forget(&mut self, tree: TreeId) {
        self.detach_ref(tree);
        let Some(node) = self.engine.nodes.remove(tree) else {
            return;
        };
        if let Some(id) = node.owner {
            let owned = self
                .engine
                .instances
                .get(id)
                .is_some_and(|instance| instance.tree.is_none() || instance.tree == Some(tree));
            if owned {
                self.engine.instances.remove(id);
            }
        }
        for child in node.children {
            self.forget(child);
        }
    }

    /// Throws away a subtree whose mount failed.
    pub(crate) fn discard(&mut self, tree: TreeId) {
        let roots = self.host_nodes(tree);
        self.forget(tree);
        for node in roots {
            if let Err(err) = self.host.release(node) {
                self.engine.stash_host_error(err);
            }
        }
    }

    pub(crate) fn attach(&mut self, tree: TreeId, host_parent: HostId, before: Option<HostId>) -> Result<(), HostError> {
        for node in self.host_nodes(tree) {
            self.host.insert_before(host_parent, node, before)?;
        }
        Ok(())
    }

    /// Host nodes at the top of `tree`, in document order.
    pub(crate) fn host_nodes(&self, tree: TreeId) -> Vec<HostId> {
        let mut out = Vec::new();
        self.collect_host_nodes(tree, &mut out);
        out
    }

    fn collect_host_nodes(&self, tree: TreeId, out: &mut Vec<HostId>) {
        let Some(node) = self.engine.nodes.get(tree) else {
            return;
        };
        match node.tag {
            Tag::Empty | Tag::Text | Tag::Element(_) => out.extend(node.node),
            Tag::Fragment | Tag::Component => {
                for &child in &node.children {
                    self.collect_host_nodes(child, out);
                }
            }
        }
    }

    pub(crate) fn first_host_node(&self, tree: TreeId) -> Option<HostId> {
        let node = self.engine.nodes.get(tree)?;
        match node.tag {
            Tag::Empty | Tag::Text | Tag::Element(_) => node.node,
            Tag::Fragment | Tag::Component => node
                .children
                .iter()
                .find_map(|&child| self.first_host_node(child)),
        }
    }

    /// The host node that `tree`'s host nodes live under.
    pub(crate) fn host_parent(&self, tree: TreeId) -> HostId {
        let mut cursor = self.engine.nodes.get(tree).and_then(|node| node.parent);
        while let Some(current) = cursor {
            let Some(node) = self.engine.nodes.get(current) else {
                break;
            };
            if let (Tag::Element(_), Some(host_node)) = (&node.tag, node.node) {
                return host_node;
            }
            cursor = node.parent;
        }
        self.host.container()
    }

    /// First host node following `tree` under the same host parent.
    pub(crate) fn next_host_sibling(&self, tree: TreeId) -> Option<HostId> {
        let mut current = tree;
        loop {
            let parent_id = self.engine.nodes.get(current)?.parent?;
            let parent = self.engine.nodes.get(parent_id)?;
            let position = parent.children.iter().position(|&child| child == current)?;
            if let Some(node) = parent.children[position + 1..]
                .iter()
                .find_map(|&sibling| self.first_host_node(sibling))
            {
                return Some(node);
            }
            if matches!(parent.tag, Tag::Element(_)) {
                return None;
            }
            current = parent_id;
        }
    }
}
