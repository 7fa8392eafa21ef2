use weave_testing::prelude::*;

struct Loader {
    log: HookLog,
}

impl Component for Loader {
    fn will_mount(&mut self, cx: &mut Context<'_>) -> Result<(), HookError> {
        cx.set_state(state! { "phase" => "loaded" });
        Ok(())
    }

    fn render(&mut self, cx: &mut Context<'_>) -> Result<Element, HookError> {
        let phase = cx.state().get_str("phase").unwrap_or("initial").to_string();
        self.log.push(format!("render {phase}"));
        Ok(h("p").child(phase).into())
    }
}

#[test]
fn state_set_in_will_mount_reaches_the_first_render() {
    init_logging();
    let log = HookLog::new();
    let loader = {
        let log = log.clone();
        ComponentType::new("Loader", move |_| Loader { log: log.clone() })
    };
    let mut rule = RenderTestRule::new();

    rule.set_content(move || loader.element().into()).expect("mount");

    assert_eq!(log.take(), ["render loaded"]);
    assert_eq!(rule.html(), "<p>loaded</p>");
}

#[derive(Default)]
struct Parent {
    child: Option<ComponentType>,
}

impl Component for Parent {
    fn initial_state(&mut self, _cx: &mut Context<'_>) -> Result<InitialState, HookError> {
        self.child = Some(ComponentType::of::<Notifier>("Notifier"));
        Ok(state! { "ready" => false }.into())
    }

    fn render(&mut self, cx: &mut Context<'_>) -> Result<Element, HookError> {
        let ready = cx.state().get_bool("ready").unwrap_or(false);
        let mut div = h("div").child(if ready { "ready" } else { "waiting" });
        if let Some(child) = &self.child {
            div = div.child(child.element().prop("parent", Value::opaque(cx.handle())));
        }
        Ok(div.into())
    }
}

#[derive(Default)]
struct Notifier;

impl Component for Notifier {
    fn render(&mut self, _cx: &mut Context<'_>) -> Result<Element, HookError> {
        Ok(h("span").into())
    }

    fn did_mount(&mut self, cx: &mut Context<'_>) -> Result<(), HookError> {
        let props = cx.props();
        let parent = props
            .get("parent")
            .and_then(|value| value.downcast_ref::<InstanceId>())
            .copied()
            .ok_or_else(|| HookError::new("missing parent handle"))?;
        cx.set_state_of(parent, state! { "ready" => true });
        Ok(())
    }
}

#[test]
fn child_did_mount_can_update_its_parent() {
    init_logging();
    let parent = ComponentType::of::<Parent>("Parent");
    let mut rule = RenderTestRule::new();

    rule.set_content(move || parent.element().into()).expect("mount");

    let id = rule.root_instance().expect("parent instance");
    assert_eq!(rule.state(id).and_then(|state| state.get_bool("ready")), Some(true));
    assert_eq!(rule.html(), "<div>ready<span></span></div>");
    assert!(rule.reports().is_empty());
}

struct Tally {
    log: HookLog,
}

impl Component for Tally {
    fn initial_state(&mut self, _cx: &mut Context<'_>) -> Result<InitialState, HookError> {
        Ok(state! { "count" => 0 }.into())
    }

    fn render(&mut self, cx: &mut Context<'_>) -> Result<Element, HookError> {
        let count = cx.state().get_int("count").unwrap_or_default();
        self.log.push(format!("render {count}"));
        Ok(count.into())
    }

    fn did_update(
        &mut self,
        _prev_props: &Props,
        prev_state: &State,
        cx: &mut Context<'_>,
    ) -> Result<(), HookError> {
        let before = prev_state.get_int("count").unwrap_or_default();
        let now = cx.state().get_int("count").unwrap_or_default();
        self.log.push(format!("did_update {before}->{now}"));
        Ok(())
    }
}

fn tally(log: &HookLog) -> ComponentType {
    let log = log.clone();
    ComponentType::new("Tally", move |_| Tally { log: log.clone() })
}

#[test]
fn did_update_sees_the_state_before_the_merge() {
    let log = HookLog::new();
    let ty = tally(&log);
    let mut rule = RenderTestRule::new();
    rule.set_content(move || ty.element().into()).expect("mount");
    let id = rule.root_instance().expect("instance");
    log.take();

    rule.renderer_mut()
        .set_state(id, state! { "count" => 1 })
        .expect("set_state");
    rule.renderer_mut()
        .set_state(id, state! { "count" => 4 })
        .expect("set_state");

    assert_eq!(
        log.take(),
        ["render 1", "did_update 0->1", "render 4", "did_update 1->4"]
    );
    assert_eq!(rule.html(), "4");
}

#[test]
fn force_update_callback_runs_after_the_render() {
    let log = HookLog::new();
    let ty = tally(&log);
    let mut rule = RenderTestRule::new();
    rule.set_content(move || ty.element().into()).expect("mount");
    let id = rule.root_instance().expect("instance");
    log.take();

    let seen = log.clone();
    rule.renderer_mut()
        .force_update_with(id, move |cx| {
            let count = cx.state().get_int("count").unwrap_or_default();
            seen.push(format!("callback {count}"));
            Ok(())
        })
        .expect("force_update");

    assert_eq!(log.take(), ["render 0", "did_update 0->0", "callback 0"]);
}

#[test]
fn updater_chain_resolves_to_a_merge() {
    let log = HookLog::new();
    let ty = tally(&log);
    let mut rule = RenderTestRule::new();
    rule.set_content(move || ty.element().into()).expect("mount");
    let id = rule.root_instance().expect("instance");
    log.take();

    rule.renderer_mut()
        .set_state(
            id,
            SetState::update(|current, _cx| {
                let count = current.get_int("count").unwrap_or_default();
                Ok(Some(SetState::update(move |_, _| {
                    Ok(Some(state! { "count" => count + 10 }.into()))
                })))
            }),
        )
        .expect("set_state");

    assert_eq!(log.take(), ["render 10", "did_update 0->10"]);
}

struct Guard {
    child: ComponentType,
    log: HookLog,
}

impl Component for Guard {
    fn render(&mut self, _cx: &mut Context<'_>) -> Result<Element, HookError> {
        Ok(self.child.element().into())
    }

    fn is_error_boundary(&self) -> bool {
        true
    }

    fn did_catch(&mut self, error: HookError, _cx: &mut Context<'_>) -> Result<Element, HookError> {
        let phase = error.phase.map(|phase| phase.to_string()).unwrap_or_default();
        self.log.push(format!("caught {phase}: {}", error.message));
        Ok(h("p").child(error.message).into())
    }
}

#[test]
fn updater_error_reaches_the_nearest_boundary() {
    init_logging();
    let log = HookLog::new();
    let guard = {
        let log = log.clone();
        let child = tally(&log);
        ComponentType::new("Guard", move |_| Guard {
            child: child.clone(),
            log: log.clone(),
        })
    };
    let mut rule = RenderTestRule::new();
    rule.set_content(move || guard.element().into()).expect("mount");
    let guard_id = rule.root_instance().expect("guard instance");
    let tally_id = rule.rendered_instance(guard_id).expect("tally instance");
    log.take();

    rule.renderer_mut()
        .set_state(tally_id, SetState::update(|_, _| Err(HookError::new("boom"))))
        .expect("set_state");

    assert_eq!(log.take(), ["caught set_state updater: boom"]);
    assert_eq!(rule.html(), "<p>boom</p>");
    assert!(!rule.renderer().is_alive(tally_id));
    assert!(rule.reports().is_empty());
}

struct Starter {
    log: HookLog,
}

impl Component for Starter {
    fn render(&mut self, cx: &mut Context<'_>) -> Result<Element, HookError> {
        let n = cx.state().get_int("n").unwrap_or_default();
        self.log.push(format!("render {n}"));
        Ok(n.into())
    }

    fn did_mount(&mut self, cx: &mut Context<'_>) -> Result<(), HookError> {
        let log = self.log.clone();
        cx.set_state_with(state! { "n" => 1 }, move |cx| {
            let n = cx.state().get_int("n").unwrap_or_default();
            log.push(format!("callback {n}"));
            Ok(())
        });
        Ok(())
    }
}

#[test]
fn callback_from_did_mount_waits_for_the_queued_render() {
    let log = HookLog::new();
    let starter = {
        let log = log.clone();
        ComponentType::new("Starter", move |_| Starter { log: log.clone() })
    };
    let mut rule = RenderTestRule::new();

    rule.set_content(move || starter.element().into()).expect("mount");

    assert_eq!(log.take(), ["render 0", "render 1", "callback 1"]);
    assert_eq!(rule.html(), "1");
}

#[derive(Default)]
struct Outer {
    inner: Option<ComponentType>,
}

impl Component for Outer {
    fn initial_state(&mut self, _cx: &mut Context<'_>) -> Result<InitialState, HookError> {
        self.inner = Some(ComponentType::of::<Inner>("Inner"));
        Ok(InitialState::Empty)
    }

    fn render(&mut self, cx: &mut Context<'_>) -> Result<Element, HookError> {
        if cx.state().get_bool("swap").unwrap_or(false) {
            return Ok(h("b").child("swapped").into());
        }
        Ok(self
            .inner
            .as_ref()
            .map(|inner| inner.element().prop("parent", Value::opaque(cx.handle())))
            .into())
    }
}

#[derive(Default)]
struct Inner {
    renders: usize,
}

impl Component for Inner {
    fn render(&mut self, cx: &mut Context<'_>) -> Result<Element, HookError> {
        self.renders += 1;
        if self.renders > 1 {
            let parent = cx
                .props()
                .get("parent")
                .and_then(|value| value.downcast_ref::<InstanceId>())
                .copied()
                .ok_or_else(|| HookError::new("missing parent handle"))?;
            cx.set_state_of(parent, state! { "swap" => true });
        }
        Ok(h("i").child(self.renders).into())
    }
}

#[test]
fn render_that_replaces_its_own_subtree_ends_quietly() {
    init_logging();
    let outer = ComponentType::of::<Outer>("Outer");
    let mut rule = RenderTestRule::new();
    rule.set_content(move || outer.element().into()).expect("mount");
    let outer_id = rule.root_instance().expect("outer");
    let inner_id = rule.rendered_instance(outer_id).expect("inner");
    assert_eq!(rule.html(), "<i>1</i>");

    rule.renderer_mut().force_update(inner_id).expect("force_update");

    assert_eq!(rule.html(), "<b>swapped</b>");
    assert!(!rule.renderer().is_alive(inner_id));
    assert!(rule.reports().is_empty());
}
