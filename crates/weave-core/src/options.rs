/// Renderer configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendererOptions {
    /// Run prop-type validators on mount and on prop updates.
    pub check_prop_types: bool,
    /// Upper bound on did-mount flush rounds per operation and on deferred
    /// poll rounds per `run_until_idle`.
    pub max_flush_rounds: usize,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            check_prop_types: true,
            max_flush_rounds: 64,
        }
    }
}

impl RendererOptions {
    pub fn check_prop_types(mut self, enabled: bool) -> Self {
        self.check_prop_types = enabled;
        self
    }

    pub fn max_flush_rounds(mut self, rounds: usize) -> Self {
        self.max_flush_rounds = rounds.max(1);
        self
    }
}
