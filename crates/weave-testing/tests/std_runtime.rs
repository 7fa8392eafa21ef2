use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weave_runtime_std::StdRuntime;
use weave_testing::prelude::*;

fn counter() -> ComponentType {
    ComponentType::function("Counter", |cx| {
        Ok(h("b")
            .child(cx.state().get_int("count").unwrap_or_default())
            .into())
    })
}

fn drain(runtime: &StdRuntime, rule: &mut RenderTestRule) -> usize {
    runtime
        .flush_if_requested(rule.renderer_mut())
        .expect("flush")
}

#[test]
fn resolved_state_requests_a_flush_from_the_std_scheduler() {
    init_logging();
    let runtime = StdRuntime::new();
    let mut rule = RenderTestRule::with_runtime(runtime.runtime());
    let counter = counter();
    rule.set_content(move || counter.element().into()).expect("mount");
    let id = rule.root_instance().expect("instance");
    assert!(!runtime.take_flush_request());

    let (resolver, value) = deferred();
    rule.renderer_mut().set_state(id, value).expect("set_state");
    assert_eq!(drain(&runtime, &mut rule), 0);
    assert!(rule.renderer().has_pending_work());
    assert_eq!(rule.html(), "<b>0</b>");

    assert!(resolver.resolve(state! { "count" => 3 }));
    assert_eq!(drain(&runtime, &mut rule), 1);

    assert_eq!(rule.html(), "<b>3</b>");
    assert!(!rule.renderer().has_pending_work());
    assert!(!runtime.take_flush_request());
}

#[test]
fn flush_waker_fires_once_per_queued_value() {
    let runtime = StdRuntime::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    {
        let wakes = Arc::clone(&wakes);
        runtime.set_flush_waker(move || {
            wakes.fetch_add(1, Ordering::SeqCst);
        });
    }
    let mut rule = RenderTestRule::with_runtime(runtime.runtime());
    let counter = counter();
    rule.set_content(move || counter.element().into()).expect("mount");
    let id = rule.root_instance().expect("instance");

    for count in [1, 2] {
        rule.renderer_mut()
            .set_state(id, Deferred::ready(state! { "count" => count }))
            .expect("set_state");
        assert_eq!(drain(&runtime, &mut rule), 1);
    }

    assert_eq!(wakes.load(Ordering::SeqCst), 2);
    assert_eq!(rule.html(), "<b>2</b>");
}
