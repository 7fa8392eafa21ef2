use crate::component::{Callback, Component, ComponentType, Group};
use crate::element::Element;
use crate::tree::TreeId;
use crate::value::{Props, State};

/// Per-position and per-instance update lock.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UpdateFlag {
    #[default]
    Idle,
    InProgress,
    /// A pass failed here; cleared when the operation settles.
    Aborted,
}

pub(crate) struct Instance {
    pub(crate) ty: ComponentType,
    pub(crate) props: Props,
    pub(crate) state: State,
    pub(crate) previous_state: State,
    pub(crate) children: Vec<Element>,
    pub(crate) flag: UpdateFlag,
    pub(crate) tree: Option<TreeId>,
    pub(crate) boundary: bool,
    /// Update requested by one of its own hooks, run once the hook returns
    /// unless a render picks the change up first.
    pub(crate) pending: Option<Group>,
    /// Callbacks of requests made while busy; they run after the pass that
    /// picks the change up.
    pub(crate) callbacks: Vec<Callback>,
    /// Checked out while one of its hooks runs.
    pub(crate) behavior: Option<Box<dyn Component>>,
}

impl Instance {
    pub(crate) fn new(ty: ComponentType, props: Props, children: Vec<Element>) -> Self {
        let behavior = ty.instantiate(&props);
        let boundary = behavior.is_error_boundary();
        Self {
            ty,
            props,
            state: State::new(),
            previous_state: State::new(),
            children,
            flag: UpdateFlag::Idle,
            tree: None,
            boundary,
            pending: None,
            callbacks: Vec::new(),
            behavior: Some(behavior),
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.behavior.is_none()
    }
}
