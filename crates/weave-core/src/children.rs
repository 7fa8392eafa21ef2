//! Helpers over the children a component receives.
//!
//! Every helper sees nested fragments flattened, so `[a, [b, c]]` has three
//! children.

use crate::element::{flatten_into, Element};
use crate::error::HookError;

/// A flat copy of `children`.
pub fn to_vec(children: &[Element]) -> Vec<Element> {
    flatten_into(children.to_vec(), Vec::new())
}

pub fn count(children: &[Element]) -> usize {
    children
        .iter()
        .map(|child| match child {
            Element::Fragment(nested) => count(nested),
            _ => 1,
        })
        .sum()
}

pub fn for_each(children: &[Element], mut f: impl FnMut(&Element, usize)) {
    visit(children, &mut 0, &mut |child, index| {
        f(child, index);
        true
    });
}

pub fn map<T>(children: &[Element], mut f: impl FnMut(&Element, usize) -> T) -> Vec<T> {
    let mut out = Vec::new();
    for_each(children, |child, index| out.push(f(child, index)));
    out
}

pub fn filter(children: &[Element], mut f: impl FnMut(&Element, usize) -> bool) -> Vec<Element> {
    let mut out = Vec::new();
    for_each(children, |child, index| {
        if f(child, index) {
            out.push(child.clone());
        }
    });
    out
}

pub fn find(children: &[Element], mut f: impl FnMut(&Element, usize) -> bool) -> Option<Element> {
    let mut found = None;
    visit(children, &mut 0, &mut |child, index| {
        if f(child, index) {
            found = Some(child.clone());
            return false;
        }
        true
    });
    found
}

/// The single host or component element passed as children.
pub fn only(children: &[Element]) -> Result<Element, HookError> {
    let flat = to_vec(children);
    match flat.as_slice() {
        [single] if single.is_valid() => Ok(single.clone()),
        _ => Err(HookError::new("Expected single element!")),
    }
}

// Returns false once the visitor asked to stop.
fn visit(
    children: &[Element],
    index: &mut usize,
    f: &mut dyn FnMut(&Element, usize) -> bool,
) -> bool {
    for child in children {
        match child {
            Element::Fragment(nested) => {
                if !visit(nested, index, f) {
                    return false;
                }
            }
            other => {
                let keep_going = f(other, *index);
                *index += 1;
                if !keep_going {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::h;

    fn sample() -> Vec<Element> {
        vec![
            Element::from("a"),
            Element::fragment(vec![Element::from("b"), Element::from(h("i"))]),
            Element::Empty,
        ]
    }

    #[test]
    fn count_sees_nested_children() {
        assert_eq!(count(&sample()), 4);
        assert_eq!(to_vec(&sample()).len(), 4);
    }

    #[test]
    fn map_and_filter_use_flat_indices() {
        let indices = map(&sample(), |_, index| index);
        assert_eq!(indices, vec![0, 1, 2, 3]);
        let valid = filter(&sample(), |child, _| child.is_valid());
        assert_eq!(valid.len(), 1);
    }

    #[test]
    fn find_stops_at_first_match() {
        let mut seen = 0;
        let found = find(&sample(), |child, _| {
            seen += 1;
            matches!(child, Element::Text(_))
        });
        assert!(matches!(found, Some(Element::Text(text)) if &*text == "a"));
        assert_eq!(seen, 1);
    }

    #[test]
    fn only_requires_one_valid_element() {
        assert!(only(&[Element::from(h("p"))]).is_ok());
        let err = only(&sample()).unwrap_err();
        assert_eq!(err.message, "Expected single element!");
        assert!(only(&[Element::from("text")]).is_err());
    }
}
