use weave_testing::prelude::*;

#[test]
fn primitive_children_render_as_text_or_nothing() {
    run_test_render(|rule| {
        rule.renderer_mut()
            .render(
                h("div")
                    .child(true)
                    .child(None::<&str>)
                    .child(7)
                    .child(2.5)
                    .child("x"),
            )
            .expect("render");

        assert_eq!(rule.html(), "<div>72.5x</div>");
    });
}

#[test]
fn boolean_attributes_toggle_presence() {
    run_test_render(|rule| {
        rule.renderer_mut()
            .render(
                h("input")
                    .attr("disabled", true)
                    .attr("hidden", false)
                    .attr("value", 3),
            )
            .expect("mount");
        assert_eq!(rule.html(), "<input disabled=\"\" value=\"3\"></input>");

        rule.renderer_mut()
            .render(h("input").attr("disabled", false).attr("value", 3))
            .expect("update");
        assert_eq!(rule.html(), "<input value=\"3\"></input>");
    });
}

#[test]
fn text_and_attribute_values_are_escaped() {
    run_test_render(|rule| {
        rule.renderer_mut()
            .render(h("p").attr("title", "a\"b").child("<tag> & co"))
            .expect("render");

        assert_eq!(
            rule.html(),
            "<p title=\"a&quot;b\">&lt;tag&gt; &amp; co</p>"
        );
    });
}

#[test]
fn only_rejects_several_children() {
    init_logging();
    let single = ComponentType::function("Single", |cx| children::only(&cx.children()));
    let mut rule = RenderTestRule::new();

    rule.renderer_mut()
        .render(single.element().child(h("a")).child(h("b")))
        .expect("render");

    assert_eq!(rule.html(), "");
    match rule.reports() {
        [Report::Unhandled(err)] => {
            assert_eq!(err.message, "Expected single element!");
            assert_eq!(err.phase, Some(Phase::Render));
        }
        other => panic!("unexpected reports: {other:?}"),
    }
}

#[test]
fn fragment_root_grows_in_place() {
    run_test_render(|rule| {
        rule.renderer_mut()
            .render(vec![h("a"), h("b")])
            .expect("mount");
        assert_eq!(rule.html(), "<a></a><b></b>");

        rule.renderer_mut()
            .render(vec![h("a"), h("b"), h("i")])
            .expect("grow");
        assert_eq!(rule.html(), "<a></a><b></b><i></i>");

        rule.renderer_mut().render(vec![h("b")]).expect("shrink");
        assert_eq!(rule.html(), "<b></b>");
    });
}

#[test]
fn changing_the_key_recreates_the_instance() {
    let echo = ComponentType::function("Echo", |cx| {
        Ok(cx.state().get_int("v").unwrap_or_default().into())
    });
    let mut rule = RenderTestRule::new();
    rule.renderer_mut()
        .render(echo.element().key("a"))
        .expect("mount");
    let first = rule.root_instance().expect("instance");
    rule.renderer_mut()
        .set_state(first, state! { "v" => 5 })
        .expect("set_state");

    rule.renderer_mut()
        .render(echo.element().key("a"))
        .expect("same key");
    assert_eq!(rule.root_instance(), Some(first));
    assert_eq!(rule.html(), "5");

    rule.renderer_mut()
        .render(echo.element().key("b"))
        .expect("new key");
    let second = rule.root_instance().expect("instance");
    assert_ne!(second, first);
    assert!(!rule.renderer().is_alive(first));
    assert_eq!(rule.html(), "0");
}

#[test]
fn dump_tree_lists_the_container_and_its_nodes() {
    run_test_render(|rule| {
        rule.renderer_mut()
            .render(h("div").child("hi"))
            .expect("render");

        let dump = rule.renderer().host().dump_tree();
        assert!(dump.starts_with("[0] #container"));
        assert!(dump.contains("<div>"));
        assert!(dump.contains("\"hi\""));
    });
}
