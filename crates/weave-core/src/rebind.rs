//! Maps an old rendered subtree onto a freshly rendered element: reconcile
//! in place when the shape allows it, replace otherwise.

use log::{debug, trace};

use crate::component::Group;
use crate::context::Context;
use crate::element::{ComponentElement, Element, IncomingProps};
use crate::error::Failure;
use crate::tree::TreeId;

impl Context<'_> {
    /// Reconciles the node at `old` against `element` and returns the node
    /// now occupying that position.
    pub(crate) fn rebind(&mut self, old: TreeId, element: Element) -> Result<TreeId, Failure> {
        let node = self.node(old)?;
        let same_shape = node.tag == element.tag() && node.key == element.key();
        let reusable = match &element {
            Element::Component(component) => node
                .owner
                .and_then(|id| self.engine.instances.get(id))
                .is_some_and(|instance| {
                    instance.tree == Some(old) && instance.ty.accepts(&component.ty)
                }),
            _ => true,
        };
        if !same_shape || !reusable {
            return self.exchange(old, element);
        }
        match element {
            Element::Component(ComponentElement {
                props,
                children,
                reference,
                ..
            }) => {
                self.should_update(old, props, Some(children), Group::Props)?;
                self.update_ref(old, reference);
                Ok(old)
            }
            other => {
                self.patch(old, other)?;
                Ok(old)
            }
        }
    }

    /// Replaces the subtree at `old` with a newly mounted one: the old
    /// subtree is unmounted first, the new host nodes go where the old ones
    /// were, and back references are moved over before the old host nodes
    /// are released.
    pub(crate) fn exchange(&mut self, old: TreeId, element: Element) -> Result<TreeId, Failure> {
        let parent = self.node(old)?.parent;
        let host_parent = self.host_parent(old);
        let before = self
            .first_host_node(old)
            .or_else(|| self.next_host_sibling(old));
        debug!("exchange for {:?}", element.tag());
        self.unmount(old);
        let new = self.mount_at(element, parent, host_parent, before)?;
        self.refresh(old, new);
        self.detach_subtree(old, host_parent)?;
        Ok(new)
    }

    /// Points whatever referenced `old` (the root slot, or the parent's
    /// rendered-child and children entries) at `new`. Refs need no work
    /// here: the unmount cleared those under `old` and the mount delivered
    /// the new ones.
    pub(crate) fn refresh(&mut self, old: TreeId, new: TreeId) {
        let parent = self.engine.nodes.get(new).and_then(|node| node.parent);
        match parent.and_then(|parent| self.engine.nodes.get_mut(parent)) {
            Some(parent) => {
                if parent.host == Some(old) {
                    parent.host = Some(new);
                }
                for child in parent.children.iter_mut() {
                    if *child == old {
                        *child = new;
                    }
                }
            }
            None => {
                if self.engine.root == Some(old) {
                    self.engine.root = Some(new);
                }
            }
        }
    }

    /// Reconciles what the component at `tree` just rendered.
    pub(crate) fn rebind_rendered(&mut self, tree: TreeId, element: Element) -> Result<(), Failure> {
        match self.node(tree)?.host {
            Some(rendered) => self.rebind(rendered, element).map(|_| ()),
            None => self.mount_rendered(tree, element),
        }
    }

    /// Swaps the component's rendered subtree for `element` outright.
    pub(crate) fn replace_rendered(&mut self, tree: TreeId, element: Element) -> Result<(), Failure> {
        let element = element.shape();
        match self.node(tree)?.host {
            Some(rendered) => self.exchange(rendered, element).map(|_| ()),
            None => self.mount_rendered(tree, element),
        }
    }

    fn mount_rendered(&mut self, tree: TreeId, element: Element) -> Result<(), Failure> {
        let host_parent = self.host_parent(tree);
        let before = self.next_host_sibling(tree);
        let child = self.mount_at(element, Some(tree), host_parent, before)?;
        let node = self.node_mut(tree)?;
        node.host = Some(child);
        node.children = vec![child];
        Ok(())
    }

    pub(crate) fn render_root(&mut self, element: Element) -> Result<(), Failure> {
        let element = element.shape();
        match self.engine.root {
            Some(root) => {
                self.rebind(root, element)?;
            }
            None => {
                let container = self.host.container();
                let root = self.mount_at(element, None, container, None)?;
                self.engine.root = Some(root);
            }
        }
        Ok(())
    }

    pub(crate) fn unmount_root(&mut self) -> Result<bool, Failure> {
        let Some(root) = self.engine.root.take() else {
            return Ok(false);
        };
        self.remove(root)?;
        Ok(true)
    }

    /// One reconciliation step at an arbitrary position. `None` when the
    /// pass was refused: stale ancestor, guard, or gate.
    pub(crate) fn reconcile_at(
        &mut self,
        old: TreeId,
        element: Element,
        group: Group,
        ancestor: Option<TreeId>,
    ) -> Result<Option<TreeId>, Failure> {
        let Some(node) = self.engine.nodes.get(old) else {
            return Ok(None);
        };
        if ancestor.is_some_and(|ancestor| node.parent != Some(ancestor)) {
            trace!("reconcile refused: ancestor no longer owns the node");
            return Ok(None);
        }
        let element = element.shape();
        let reusable = match &element {
            Element::Component(component) => node
                .owner
                .and_then(|id| self.engine.instances.get(id))
                .is_some_and(|instance| {
                    instance.tree == Some(old) && instance.ty.accepts(&component.ty)
                }),
            _ => false,
        };
        match element {
            Element::Component(ComponentElement {
                props,
                children,
                reference,
                ..
            }) if reusable => {
                if !group.receives_props() {
                    return self.should_update(old, IncomingProps::Absent, None, group);
                }
                let outcome = self.should_update(old, props, Some(children), group)?;
                self.update_ref(old, reference);
                Ok(outcome)
            }
            other => self.rebind(old, other).map(Some),
        }
    }
}
