use std::cell::RefCell;
use std::rc::Rc;

use weave_testing::prelude::*;

type Seen = Rc<RefCell<Vec<Option<RefTarget>>>>;

fn recorder(seen: &Seen) -> Ref {
    let seen = Rc::clone(seen);
    Ref::new(move |target| seen.borrow_mut().push(target))
}

fn root_host_node(rule: &RenderTestRule) -> Option<RefTarget> {
    let root = rule.root_id()?;
    rule.renderer()
        .tree(root)?
        .host_node()
        .map(RefTarget::Host)
}

#[test]
fn host_ref_is_set_on_mount_and_cleared_on_removal() {
    init_logging();
    let seen = Seen::default();
    let mut rule = RenderTestRule::new();

    rule.renderer_mut()
        .render(h("input").attr("autofocus", true).with_ref(recorder(&seen)))
        .expect("mount");
    let input = root_host_node(&rule);
    assert!(input.is_some());
    assert_eq!(*seen.borrow(), [input]);

    rule.renderer_mut().render(h("div")).expect("replace");
    assert_eq!(*seen.borrow(), [input, None]);
}

#[test]
fn shared_ref_stays_attached_and_a_fresh_one_is_swapped_in() {
    let seen = Seen::default();
    let shared = recorder(&seen);
    let mut rule = RenderTestRule::new();

    rule.renderer_mut()
        .render(h("h1").attr("n", 1).with_ref(shared.clone()))
        .expect("mount");
    rule.renderer_mut()
        .render(h("h1").attr("n", 2).with_ref(shared.clone()))
        .expect("same ref");
    let h1 = root_host_node(&rule);
    assert_eq!(*seen.borrow(), [h1]);

    let fresh = Seen::default();
    rule.renderer_mut()
        .render(h("h1").attr("n", 3).with_ref(recorder(&fresh)))
        .expect("fresh ref");
    assert_eq!(*seen.borrow(), [h1, None]);
    assert_eq!(*fresh.borrow(), [h1]);
    assert_eq!(rule.html(), "<h1 n=\"3\"></h1>");
}

#[test]
fn tag_change_delivers_the_replacement_node() {
    let seen = Seen::default();
    let shared = recorder(&seen);
    let mut rule = RenderTestRule::new();

    rule.renderer_mut()
        .render(h("div").child(h("a").with_ref(shared.clone())))
        .expect("mount");
    rule.renderer_mut()
        .render(h("div").child(h("b").with_ref(shared.clone())))
        .expect("swap");

    let seen = seen.borrow();
    assert!(matches!(
        seen.as_slice(),
        [Some(RefTarget::Host(a)), None, Some(RefTarget::Host(b))] if a != b
    ));
    assert_eq!(rule.html(), "<div><b></b></div>");
}

#[test]
fn component_ref_receives_the_instance_handle() {
    let seen = Seen::default();
    let shared = recorder(&seen);
    let first = ComponentType::function("First", |_| Ok(h("i").into()));
    let second = ComponentType::function("Second", |_| Ok(h("u").into()));
    let mut rule = RenderTestRule::new();

    rule.renderer_mut()
        .render(first.element().with_ref(shared.clone()))
        .expect("mount");
    let a = rule.root_instance().expect("first instance");
    assert_eq!(*seen.borrow(), [Some(RefTarget::Instance(a))]);

    rule.renderer_mut()
        .render(second.element().with_ref(shared.clone()))
        .expect("exchange");
    let b = rule.root_instance().expect("second instance");
    assert_eq!(
        *seen.borrow(),
        [Some(RefTarget::Instance(a)), None, Some(RefTarget::Instance(b))]
    );

    rule.renderer_mut().unmount().expect("unmount");
    assert_eq!(seen.borrow().last(), Some(&None));
}

struct Mounted {
    log: HookLog,
}

impl Component for Mounted {
    fn render(&mut self, _cx: &mut Context<'_>) -> Result<Element, HookError> {
        Ok(1.into())
    }

    fn did_mount(&mut self, _cx: &mut Context<'_>) -> Result<(), HookError> {
        self.log.push("did_mount");
        Ok(())
    }
}

#[test]
fn render_callback_runs_bound_to_the_root_after_did_mount() {
    let log = HookLog::new();
    let mounted = {
        let log = log.clone();
        ComponentType::new("Mounted", move |_| Mounted { log: log.clone() })
    };
    let handles = Rc::new(RefCell::new(Vec::new()));
    let mut rule = RenderTestRule::new();

    for _ in 0..2 {
        let log = log.clone();
        let handles = Rc::clone(&handles);
        rule.renderer_mut()
            .render_with(&mounted, move |cx| {
                log.push("callback");
                handles.borrow_mut().push(cx.handle());
                Ok(())
            })
            .expect("render");
    }

    let root = rule.root_instance().expect("instance");
    assert_eq!(log.take(), ["did_mount", "callback", "callback"]);
    assert_eq!(*handles.borrow(), [root, root]);
    assert_eq!(rule.html(), "1");
}

#[test]
fn failing_render_callback_is_reported() {
    let mut rule = RenderTestRule::new();

    rule.renderer_mut()
        .render_with(h("p").child("kept"), |_| Err(HookError::new("error!")))
        .expect("render");

    assert_eq!(rule.html(), "<p>kept</p>");
    match rule.reports() {
        [Report::Unhandled(err)] => {
            assert_eq!(err.message, "error!");
            assert_eq!(err.phase, Some(Phase::Callback));
        }
        other => panic!("unexpected reports: {other:?}"),
    }
}
