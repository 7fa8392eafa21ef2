//! Ref callbacks: tell user code where an element ended up.

use std::fmt;
use std::rc::Rc;

use log::trace;

use crate::context::Context;
use crate::host::HostId;
use crate::tree::{InstanceId, TreeId};

/// What a ref receives: the host node behind an element, or the instance
/// behind a component.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RefTarget {
    Host(HostId),
    Instance(InstanceId),
}

/// Called with the target once the element is mounted, and with `None` when
/// it goes away.
///
/// Refs compare by identity: handing the same `Ref` to the next render keeps
/// it attached, a fresh one is detached and re-attached.
#[derive(Clone)]
pub struct Ref(Rc<dyn Fn(Option<RefTarget>)>);

impl Ref {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Option<RefTarget>) + 'static,
    {
        Self(Rc::new(callback))
    }

    fn deliver(&self, target: Option<RefTarget>) {
        (self.0)(target)
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Ref {}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ref(..)")
    }
}

impl<F: Fn(Option<RefTarget>) + 'static> From<F> for Ref {
    fn from(f: F) -> Self {
        Ref::new(f)
    }
}

impl Context<'_> {
    /// Binds `reference` to the node at `tree`. Only nodes whose ref was
    /// delivered keep one, so teardown never clears a ref it never set.
    pub(crate) fn attach_ref(&mut self, tree: TreeId, reference: Option<Ref>) {
        let Some(reference) = reference else {
            return;
        };
        let Some(target) = self.ref_target(tree) else {
            return;
        };
        if let Some(node) = self.engine.nodes.get_mut(tree) {
            node.reference = Some(reference.clone());
            reference.deliver(Some(target));
        }
    }

    /// Swaps the ref of a node kept across an update. An unchanged ref is
    /// left alone.
    pub(crate) fn update_ref(&mut self, tree: TreeId, next: Option<Ref>) {
        let Some(node) = self.engine.nodes.get(tree) else {
            return;
        };
        if node.reference == next {
            return;
        }
        trace!("ref changed at {tree:?}");
        self.detach_ref(tree);
        self.attach_ref(tree, next);
    }

    pub(crate) fn detach_ref(&mut self, tree: TreeId) {
        if let Some(reference) = self
            .engine
            .nodes
            .get_mut(tree)
            .and_then(|node| node.reference.take())
        {
            reference.deliver(None);
        }
    }

    fn ref_target(&self, tree: TreeId) -> Option<RefTarget> {
        let node = self.engine.nodes.get(tree)?;
        match node.owner {
            Some(id) => Some(RefTarget::Instance(id)),
            None => node.node.map(RefTarget::Host),
        }
    }
}
