//! Nodes of the rendered tree.

use std::rc::Rc;

use slotmap::new_key_type;

use crate::component::ComponentType;
use crate::element::Tag;
use crate::hash::Key;
use crate::host::HostId;
use crate::instance::UpdateFlag;
use crate::reference::Ref;
use crate::value::Props;

new_key_type! {
    pub struct TreeId;
    pub struct InstanceId;
}

/// One position in the rendered tree.
///
/// Component nodes own an instance and point at the subtree it rendered
/// through `host`. Empty, text and element nodes own a host node.
pub struct TreeNode {
    pub(crate) tag: Tag,
    pub(crate) ty: Option<ComponentType>,
    pub(crate) key: Option<Key>,
    pub(crate) props: Props,
    pub(crate) text: Option<Rc<str>>,
    pub(crate) owner: Option<InstanceId>,
    pub(crate) host: Option<TreeId>,
    pub(crate) children: Vec<TreeId>,
    pub(crate) parent: Option<TreeId>,
    pub(crate) node: Option<HostId>,
    pub(crate) flag: UpdateFlag,
    /// Ref delivered for this position, cleared on unmount.
    pub(crate) reference: Option<Ref>,
}

impl TreeNode {
    pub(crate) fn new(tag: Tag, parent: Option<TreeId>) -> Self {
        Self {
            tag,
            ty: None,
            key: None,
            props: Props::new(),
            text: None,
            owner: None,
            host: None,
            children: Vec::new(),
            parent,
            node: None,
            flag: UpdateFlag::Idle,
            reference: None,
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn component_type(&self) -> Option<&ComponentType> {
        self.ty.as_ref()
    }

    pub fn key(&self) -> Option<Key> {
        self.key
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn owner(&self) -> Option<InstanceId> {
        self.owner
    }

    pub fn host(&self) -> Option<TreeId> {
        self.host
    }

    pub fn children(&self) -> &[TreeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<TreeId> {
        self.parent
    }

    pub fn host_node(&self) -> Option<HostId> {
        self.node
    }

    pub fn flag(&self) -> UpdateFlag {
        self.flag
    }
}
