//! Declarative element descriptions and their classification.

use std::hash::Hash;
use std::rc::Rc;

use crate::component::ComponentType;
use crate::hash::{key_of, Key};
use crate::reference::Ref;
use crate::value::{Props, Value};

#[derive(Clone, Debug, Default)]
pub enum Element {
    /// Renders nothing; still occupies a position.
    #[default]
    Empty,
    Text(Rc<str>),
    Fragment(Vec<Element>),
    Host(HostElement),
    Component(ComponentElement),
}

/// Classification used to decide between in-place update and replacement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    Empty,
    Text,
    Fragment,
    Element(Rc<str>),
    Component,
}

impl Element {
    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Element::Text(text.into())
    }

    pub fn fragment<I, E>(children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        Element::Fragment(children.into_iter().map(Into::into).collect())
    }

    pub fn tag(&self) -> Tag {
        match self {
            Element::Empty => Tag::Empty,
            Element::Text(_) => Tag::Text,
            Element::Fragment(_) => Tag::Fragment,
            Element::Host(host) => Tag::Element(host.name.clone()),
            Element::Component(_) => Tag::Component,
        }
    }

    pub fn key(&self) -> Option<Key> {
        match self {
            Element::Host(host) => host.key,
            Element::Component(component) => component.key,
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Element::Empty)
    }

    /// Host and component elements; what `children::only` accepts.
    pub fn is_valid(&self) -> bool {
        matches!(self, Element::Host(_) | Element::Component(_))
    }

    /// Normalizes a render result: nested fragments are flattened into their
    /// parent fragment.
    pub fn shape(self) -> Element {
        match self {
            Element::Fragment(children) => Element::Fragment(flatten_into(children, Vec::new())),
            other => other,
        }
    }
}

pub(crate) fn flatten_into(children: Vec<Element>, mut out: Vec<Element>) -> Vec<Element> {
    for child in children {
        match child {
            Element::Fragment(nested) => out = flatten_into(nested, out),
            other => out.push(other),
        }
    }
    out
}

fn push_child(children: &mut Vec<Element>, child: Element) {
    match child {
        Element::Fragment(nested) => children.extend(flatten_into(nested, Vec::new())),
        other => children.push(other),
    }
}

#[derive(Clone, Debug)]
pub struct HostElement {
    pub name: Rc<str>,
    pub props: Props,
    pub children: Vec<Element>,
    pub key: Option<Key>,
    pub reference: Option<Ref>,
}

/// Starts a host element.
pub fn h(name: &str) -> HostElement {
    HostElement {
        name: Rc::from(name),
        props: Props::new(),
        children: Vec::new(),
        key: None,
        reference: None,
    }
}

impl HostElement {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name, value);
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Appends a child; fragments are spliced in flat.
    pub fn child(mut self, child: impl Into<Element>) -> Self {
        push_child(&mut self.children, child.into());
        self
    }

    pub fn children<I, E>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        for child in children {
            push_child(&mut self.children, child.into());
        }
        self
    }

    pub fn key<K: Hash + ?Sized>(mut self, key: &K) -> Self {
        self.key = Some(key_of(key));
        self
    }

    /// Receives the host node once mounted, `None` on removal.
    pub fn with_ref(mut self, reference: impl Into<Ref>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Props a component element carries into an update.
#[derive(Clone, Debug)]
pub enum IncomingProps {
    Supplied(Props),
    /// Keep whatever the instance already has.
    Absent,
}

#[derive(Clone, Debug)]
pub struct ComponentElement {
    pub ty: ComponentType,
    pub props: IncomingProps,
    pub children: Vec<Element>,
    pub key: Option<Key>,
    pub reference: Option<Ref>,
}

impl ComponentElement {
    pub(crate) fn new(ty: ComponentType) -> Self {
        Self {
            ty,
            props: IncomingProps::Supplied(Props::new()),
            children: Vec::new(),
            key: None,
            reference: None,
        }
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props = IncomingProps::Supplied(props);
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut props = match self.props {
            IncomingProps::Supplied(props) => props,
            IncomingProps::Absent => Props::new(),
        };
        props.insert(name, value);
        self.props = IncomingProps::Supplied(props);
        self
    }

    /// Marks the element as carrying no props.
    pub fn without_props(mut self) -> Self {
        self.props = IncomingProps::Absent;
        self
    }

    pub fn child(mut self, child: impl Into<Element>) -> Self {
        push_child(&mut self.children, child.into());
        self
    }

    pub fn children<I, E>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        for child in children {
            push_child(&mut self.children, child.into());
        }
        self
    }

    pub fn key<K: Hash + ?Sized>(mut self, key: &K) -> Self {
        self.key = Some(key_of(key));
        self
    }

    /// Receives the instance handle once mounted, `None` on removal.
    pub fn with_ref(mut self, reference: impl Into<Ref>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

impl From<HostElement> for Element {
    fn from(element: HostElement) -> Self {
        Element::Host(element)
    }
}

impl From<ComponentElement> for Element {
    fn from(element: ComponentElement) -> Self {
        Element::Component(element)
    }
}

impl From<&ComponentType> for Element {
    fn from(ty: &ComponentType) -> Self {
        Element::Component(ty.element())
    }
}

impl From<ComponentType> for Element {
    fn from(ty: ComponentType) -> Self {
        Element::Component(ty.element())
    }
}

impl From<()> for Element {
    fn from(_: ()) -> Self {
        Element::Empty
    }
}

/// Booleans never render.
impl From<bool> for Element {
    fn from(_: bool) -> Self {
        Element::Empty
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::Text(Rc::from(text))
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Element::Text(Rc::from(text))
    }
}

impl From<Rc<str>> for Element {
    fn from(text: Rc<str>) -> Self {
        Element::Text(text)
    }
}

macro_rules! impl_text_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Element {
                fn from(value: $ty) -> Self {
                    Element::Text(Rc::from(value.to_string()))
                }
            }
        )*
    };
}

impl_text_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl<T: Into<Element>> From<Vec<T>> for Element {
    fn from(children: Vec<T>) -> Self {
        Element::fragment(children)
    }
}

impl<T: Into<Element>> From<Option<T>> for Element {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Element::Empty)
    }
}

impl From<&Value> for Element {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null | Value::Bool(_) | Value::Opaque(_) | Value::Map(_) => Element::Empty,
            Value::List(values) => Element::fragment(values.iter()),
            other => Element::Text(Rc::from(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(element: &Element) -> Vec<String> {
        match element {
            Element::Fragment(children) => children
                .iter()
                .map(|child| match child {
                    Element::Text(text) => text.to_string(),
                    Element::Empty => "_".to_string(),
                    other => format!("{:?}", other.tag()),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn conversions_classify_primitives() {
        assert_eq!(Element::from(true).tag(), Tag::Empty);
        assert_eq!(Element::from(false).tag(), Tag::Empty);
        assert_eq!(Element::from(None::<&str>).tag(), Tag::Empty);
        assert_eq!(Element::from(3).tag(), Tag::Text);
        assert_eq!(Element::from("x").tag(), Tag::Text);
        assert_eq!(Element::from(vec!["a"]).tag(), Tag::Fragment);
        assert_eq!(Element::from(h("div")).tag(), Tag::Element(Rc::from("div")));
    }

    #[test]
    fn shape_flattens_nested_fragments() {
        let nested = Element::fragment(vec![
            Element::from("a"),
            Element::fragment(vec![Element::from("b"), Element::fragment(vec!["c"])]),
            Element::from(false),
        ]);
        assert_eq!(texts(&nested.shape()), vec!["a", "b", "c", "_"]);
    }

    #[test]
    fn host_children_are_spliced_flat() {
        let element = h("ul").child(vec![vec!["1", "2"], vec!["3"]]).child("4");
        assert_eq!(element.children.len(), 4);
    }

    #[test]
    fn keys_distinguish_siblings() {
        let a = Element::from(h("li").key("a"));
        let b = Element::from(h("li").key("b"));
        assert_eq!(a.tag(), b.tag());
        assert_ne!(a.key(), b.key());
        assert_eq!(Element::from("text").key(), None);
    }

    #[test]
    fn value_lists_render_as_fragments() {
        let value = Value::from(vec![Value::from(1), Value::Null, Value::from("x")]);
        assert_eq!(texts(&Element::from(&value)), vec!["1", "_", "x"]);
    }
}
