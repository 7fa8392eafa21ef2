use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use log::{debug, trace};

use weave_core::{
    Deferred, Element, HookError, HostError, InstanceId, MemoryHost, Renderer, RendererOptions,
    Report, Runtime, State, TreeId,
};

/// Headless harness for exercising component trees in tests.
///
/// `RenderTestRule` owns a renderer over a [`MemoryHost`] and keeps the
/// installed content around so it can be rendered again, the way a parent
/// re-rendering with fresh elements would.
pub struct RenderTestRule {
    renderer: Renderer<MemoryHost>,
    content: Option<Box<dyn FnMut() -> Element>>,
}

impl RenderTestRule {
    pub fn new() -> Self {
        Self::with_options(RendererOptions::default())
    }

    pub fn with_options(options: RendererOptions) -> Self {
        Self {
            renderer: Renderer::new(MemoryHost::new()).with_options(options),
            content: None,
        }
    }

    /// Runs the rule on `runtime`, e.g. one whose scheduler is polled by an
    /// event loop.
    pub fn with_runtime(runtime: Runtime) -> Self {
        Self {
            renderer: Renderer::with_runtime(MemoryHost::new(), runtime),
            content: None,
        }
    }

    /// Install the provided content and perform an initial render.
    pub fn set_content(&mut self, content: impl FnMut() -> Element + 'static) -> Result<(), HostError> {
        self.content = Some(Box::new(content));
        self.rerender()
    }

    /// Render the installed content again, reconciling against the current
    /// tree.
    pub fn rerender(&mut self) -> Result<(), HostError> {
        if let Some(content) = self.content.as_mut() {
            let element = content();
            trace!("rerendering {:?}", element.tag());
            self.renderer.render(element)?;
        }
        Ok(())
    }

    /// Apply resolved deferred values until none are ready.
    pub fn pump_until_idle(&mut self) -> Result<usize, HostError> {
        let mut applied = 0;
        loop {
            let round = self.renderer.run_until_idle()?;
            if round == 0 {
                debug!("pumped {applied} deferred values");
                return Ok(applied);
            }
            applied += round;
        }
    }

    pub fn html(&self) -> String {
        self.renderer.host().html()
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    pub fn root_id(&self) -> Option<TreeId> {
        self.renderer.root()
    }

    pub fn root_instance(&self) -> Option<InstanceId> {
        self.renderer.root_instance()
    }

    /// Instance of the component found by following rendered children from
    /// the root: each index picks a child, and component nodes are looked
    /// through to what they rendered.
    pub fn instance_at(&self, path: &[usize]) -> Option<InstanceId> {
        let mut tree = self.renderer.root()?;
        for &index in path {
            tree = self.look_through(tree)?;
            tree = *self.renderer.tree(tree)?.children().get(index)?;
        }
        self.renderer.tree(tree)?.owner()
    }

    /// The instance `id` rendered, when its output is itself a component.
    pub fn rendered_instance(&self, id: InstanceId) -> Option<InstanceId> {
        let tree = self.renderer.tree_of(id)?;
        let rendered = self.renderer.tree(tree)?.host()?;
        self.renderer.tree(rendered)?.owner()
    }

    fn look_through(&self, mut tree: TreeId) -> Option<TreeId> {
        while let Some(rendered) = self.renderer.tree(tree)?.host() {
            tree = rendered;
        }
        Some(tree)
    }

    pub fn state(&self, id: InstanceId) -> Option<State> {
        self.renderer.state(id)
    }

    pub fn reports(&self) -> &[Report] {
        self.renderer.reports()
    }

    pub fn take_reports(&mut self) -> Vec<Report> {
        self.renderer.take_reports()
    }

    pub fn renderer(&self) -> &Renderer<MemoryHost> {
        &self.renderer
    }

    /// Gain mutable access to the renderer for `set_state`, `force_update`
    /// and `reconcile` calls.
    pub fn renderer_mut(&mut self) -> &mut Renderer<MemoryHost> {
        &mut self.renderer
    }
}

impl Default for RenderTestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `RenderTestRule`.
pub fn run_test_render<R>(f: impl FnOnce(&mut RenderTestRule) -> R) -> R {
    let mut rule = RenderTestRule::new();
    f(&mut rule)
}

/// Settles a [`Deferred`] created by [`deferred`].
pub struct Resolver {
    sender: oneshot::Sender<Result<State, HookError>>,
}

impl Resolver {
    /// Returns `false` if the deferred value was already dropped.
    pub fn resolve(self, state: State) -> bool {
        self.sender.send(Ok(state)).is_ok()
    }

    pub fn reject(self, error: impl Into<HookError>) -> bool {
        self.sender.send(Err(error.into())).is_ok()
    }
}

/// A deferred state value settled by hand. Dropping the resolver rejects it.
pub fn deferred() -> (Resolver, Deferred) {
    let (sender, receiver) = oneshot::channel();
    let deferred = Deferred::new(async move {
        receiver
            .await
            .unwrap_or_else(|_| Err(HookError::new("deferred value was never settled")))
    });
    (Resolver { sender }, deferred)
}

/// Shared, ordered record of hook calls.
#[derive(Clone, Default)]
pub struct HookLog(Rc<RefCell<Vec<String>>>);

impl HookLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Returns and clears the recorded entries.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|recorded| *recorded == entry).count()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Routes `log` output to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
