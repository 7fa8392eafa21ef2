//! The component contract and component types.

use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

use crate::context::Context;
use crate::element::{ComponentElement, Element};
use crate::error::HookError;
use crate::runtime::Deferred;
use crate::value::{Props, State};

/// A stateful component. Every hook receives a [`Context`] bound to the
/// instance it belongs to.
///
/// Hooks other than `render` default to no-ops. `should_update` defaults to
/// `true`; returning `false` skips the render and every later hook of that
/// pass.
pub trait Component: 'static {
    fn render(&mut self, cx: &mut Context<'_>) -> Result<Element, HookError>;

    fn initial_state(&mut self, _cx: &mut Context<'_>) -> Result<InitialState, HookError> {
        Ok(InitialState::Empty)
    }

    fn will_mount(&mut self, _cx: &mut Context<'_>) -> Result<(), HookError> {
        Ok(())
    }

    fn did_mount(&mut self, _cx: &mut Context<'_>) -> Result<(), HookError> {
        Ok(())
    }

    fn will_receive_props(
        &mut self,
        _next_props: &Props,
        _cx: &mut Context<'_>,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn should_update(
        &mut self,
        _next_props: &Props,
        _next_state: &State,
        _cx: &mut Context<'_>,
    ) -> Result<bool, HookError> {
        Ok(true)
    }

    fn will_update(
        &mut self,
        _next_props: &Props,
        _next_state: &State,
        _cx: &mut Context<'_>,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn did_update(
        &mut self,
        _prev_props: &Props,
        _prev_state: &State,
        _cx: &mut Context<'_>,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn will_unmount(&mut self, _cx: &mut Context<'_>) -> Result<(), HookError> {
        Ok(())
    }

    /// Boundaries get `did_catch` offered for errors raised at or below them.
    fn is_error_boundary(&self) -> bool {
        false
    }

    /// Returns what to render in place of the failed subtree.
    fn did_catch(&mut self, error: HookError, _cx: &mut Context<'_>) -> Result<Element, HookError> {
        Err(error)
    }
}

pub enum InitialState {
    Empty,
    Ready(State),
    /// Resolved later; the instance stays busy until then.
    Deferred(Deferred),
}

impl From<State> for InitialState {
    fn from(state: State) -> Self {
        InitialState::Ready(state)
    }
}

impl From<Deferred> for InitialState {
    fn from(deferred: Deferred) -> Self {
        InitialState::Deferred(deferred)
    }
}

pub type Updater =
    Box<dyn FnOnce(&State, &mut Context<'_>) -> Result<Option<SetState>, HookError>>;

pub type Callback = Box<dyn FnOnce(&mut Context<'_>) -> Result<(), HookError>>;

/// A partial state transition.
pub enum SetState {
    /// Shallow-merged over the current state.
    Merge(State),
    /// Computes the transition from the current state. `Ok(None)` cancels it.
    Update(Updater),
    /// Merged once the future resolves.
    Deferred(Deferred),
}

impl SetState {
    pub fn update<F>(updater: F) -> Self
    where
        F: FnOnce(&State, &mut Context<'_>) -> Result<Option<SetState>, HookError> + 'static,
    {
        SetState::Update(Box::new(updater))
    }
}

impl From<State> for SetState {
    fn from(state: State) -> Self {
        SetState::Merge(state)
    }
}

impl From<Deferred> for SetState {
    fn from(deferred: Deferred) -> Self {
        SetState::Deferred(deferred)
    }
}

impl From<State> for Option<SetState> {
    fn from(state: State) -> Self {
        Some(SetState::Merge(state))
    }
}

impl From<Deferred> for Option<SetState> {
    fn from(deferred: Deferred) -> Self {
        Some(SetState::Deferred(deferred))
    }
}

impl fmt::Debug for SetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetState::Merge(state) => f.debug_tuple("Merge").field(state).finish(),
            SetState::Update(_) => f.write_str("Update(..)"),
            SetState::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// What kind of update a pass performs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Group {
    /// The parent re-rendered with (possibly) new props.
    Props,
    /// The instance's own state changed.
    State,
    /// Unconditional re-render; skips the gate and keeps props.
    Force,
}

impl Group {
    pub fn receives_props(self) -> bool {
        !matches!(self, Group::Force)
    }

    pub fn consults_gate(self) -> bool {
        !matches!(self, Group::Force)
    }

    pub fn is_state_driven(self) -> bool {
        matches!(self, Group::State | Group::Force)
    }
}

type Validator = dyn Fn(&Props, &str, &'static str) -> Result<Option<String>, HookError>;

/// Validates one prop. `Ok(Some(message))` is a violation, `Err` means the
/// validator itself broke.
#[derive(Clone)]
pub struct PropType(Rc<Validator>);

impl PropType {
    pub fn custom<F>(validator: F) -> Self
    where
        F: Fn(&Props, &str, &'static str) -> Result<Option<String>, HookError> + 'static,
    {
        PropType(Rc::new(validator))
    }

    pub fn required() -> Self {
        Self::custom(|props, name, component| {
            Ok(match props.get(name) {
                None | Some(crate::Value::Null) => {
                    Some(format!("`{name}` is required by `{component}`"))
                }
                Some(_) => None,
            })
        })
    }

    pub fn int() -> Self {
        Self::kind("int", |value| value.as_int().is_some())
    }

    pub fn string() -> Self {
        Self::kind("string", |value| value.as_str().is_some())
    }

    pub fn bool() -> Self {
        Self::kind("bool", |value| value.as_bool().is_some())
    }

    fn kind(expected: &'static str, accepts: fn(&crate::Value) -> bool) -> Self {
        Self::custom(move |props, name, component| {
            Ok(match props.get(name) {
                Some(value) if !value.is_null() && !accepts(value) => Some(format!(
                    "`{name}` supplied to `{component}` should be {expected}, got {value:?}"
                )),
                _ => None,
            })
        })
    }

    pub(crate) fn check(
        &self,
        props: &Props,
        name: &str,
        component: &'static str,
    ) -> Result<Option<String>, HookError> {
        (self.0)(props, name, component)
    }
}

type Factory = dyn Fn(&Props) -> Box<dyn Component>;

struct ComponentTypeInner {
    name: &'static str,
    concrete: Option<TypeId>,
    factory: Box<Factory>,
    default_props: Props,
    prop_types: Vec<(String, PropType)>,
    pure: bool,
}

/// A constructible component kind. Clones share identity.
#[derive(Clone)]
pub struct ComponentType(Rc<ComponentTypeInner>);

impl ComponentType {
    pub fn builder<C, F>(name: &'static str, factory: F) -> ComponentTypeBuilder
    where
        C: Component,
        F: Fn(&Props) -> C + 'static,
    {
        ComponentTypeBuilder {
            inner: ComponentTypeInner {
                name,
                concrete: Some(TypeId::of::<C>()),
                factory: Box::new(move |props: &Props| -> Box<dyn Component> {
                    Box::new(factory(props))
                }),
                default_props: Props::new(),
                prop_types: Vec::new(),
                pure: false,
            },
        }
    }

    pub fn new<C, F>(name: &'static str, factory: F) -> Self
    where
        C: Component,
        F: Fn(&Props) -> C + 'static,
    {
        Self::builder(name, factory).build()
    }

    pub fn of<C: Component + Default>(name: &'static str) -> Self {
        Self::new(name, |_| C::default())
    }

    /// A stateless component rendered by `render`. Two function types are
    /// only interchangeable if they are the same handle.
    pub fn function<F>(name: &'static str, render: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> Result<Element, HookError> + 'static,
    {
        let render: Rc<RenderFn> = Rc::new(render);
        let mut builder = Self::builder(name, move |_| FunctionComponent {
            render: render.clone(),
        });
        builder.inner.concrete = None;
        builder.build()
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }

    pub fn default_props(&self) -> &Props {
        &self.0.default_props
    }

    pub fn prop_types(&self) -> &[(String, PropType)] {
        &self.0.prop_types
    }

    pub fn is_pure(&self) -> bool {
        self.0.pure
    }

    /// Whether an instance of `self` may be reused for an element of
    /// `other`: the same handle, or the same concrete component type.
    pub fn accepts(&self, other: &ComponentType) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (self.0.concrete, other.0.concrete) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn element(&self) -> ComponentElement {
        ComponentElement::new(self.clone())
    }

    pub fn with_props(&self, props: Props) -> ComponentElement {
        self.element().props(props)
    }

    pub(crate) fn instantiate(&self, props: &Props) -> Box<dyn Component> {
        (self.0.factory)(props)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.0.name)
            .field("pure", &self.0.pure)
            .finish_non_exhaustive()
    }
}

pub struct ComponentTypeBuilder {
    inner: ComponentTypeInner,
}

impl ComponentTypeBuilder {
    pub fn default_props(mut self, props: Props) -> Self {
        self.inner.default_props = props;
        self
    }

    pub fn prop_type(mut self, name: impl Into<String>, validator: PropType) -> Self {
        self.inner.prop_types.push((name.into(), validator));
        self
    }

    /// Skip renders when props and state are shallow-equal.
    pub fn pure(mut self) -> Self {
        self.inner.pure = true;
        self
    }

    pub fn build(self) -> ComponentType {
        ComponentType(Rc::new(self.inner))
    }
}

type RenderFn = dyn Fn(&mut Context<'_>) -> Result<Element, HookError>;

struct FunctionComponent {
    render: Rc<RenderFn>,
}

impl Component for FunctionComponent {
    fn render(&mut self, cx: &mut Context<'_>) -> Result<Element, HookError> {
        (self.render)(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[derive(Default)]
    struct Counter;

    impl Component for Counter {
        fn render(&mut self, _cx: &mut Context<'_>) -> Result<Element, HookError> {
            Ok(Element::Empty)
        }
    }

    #[test]
    fn accepts_same_handle_or_same_concrete_type() {
        let a = ComponentType::of::<Counter>("Counter");
        let b = ComponentType::of::<Counter>("Counter");
        let f = ComponentType::function("F", |_| Ok(Element::Empty));
        let g = ComponentType::function("F", |_| Ok(Element::Empty));

        assert!(a.accepts(&a.clone()));
        assert!(a.accepts(&b));
        assert!(f.accepts(&f.clone()));
        assert!(!f.accepts(&g));
        assert!(!a.accepts(&f));
    }

    #[test]
    fn builtin_prop_types_report_mismatches() {
        let props = props! { "count" => "three", "name" => "n" };
        let int = PropType::int().check(&props, "count", "Counter").unwrap();
        assert!(int.is_some_and(|message| message.contains("should be int")));
        assert_eq!(PropType::string().check(&props, "name", "Counter"), Ok(None));
        assert_eq!(PropType::int().check(&props, "missing", "Counter"), Ok(None));
        assert!(PropType::required()
            .check(&props, "missing", "Counter")
            .unwrap()
            .is_some());
    }

    #[test]
    fn group_semantics() {
        assert!(Group::Props.receives_props() && Group::Props.consults_gate());
        assert!(!Group::Props.is_state_driven());
        assert!(Group::State.is_state_driven() && Group::State.consults_gate());
        assert!(!Group::Force.receives_props() && !Group::Force.consults_gate());
    }
}
