use std::fmt;

use crate::host::HostError;

/// Lifecycle phase a hook error was raised in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    InitialState,
    WillMount,
    Render,
    DidMount,
    WillReceiveProps,
    ShouldUpdate,
    WillUpdate,
    DidUpdate,
    WillUnmount,
    DidCatch,
    PropTypes,
    Updater,
    Callback,
    Deferred,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::InitialState => "initial_state",
            Phase::WillMount => "will_mount",
            Phase::Render => "render",
            Phase::DidMount => "did_mount",
            Phase::WillReceiveProps => "will_receive_props",
            Phase::ShouldUpdate => "should_update",
            Phase::WillUpdate => "will_update",
            Phase::DidUpdate => "did_update",
            Phase::WillUnmount => "will_unmount",
            Phase::DidCatch => "did_catch",
            Phase::PropTypes => "prop_types",
            Phase::Updater => "set_state updater",
            Phase::Callback => "callback",
            Phase::Deferred => "deferred state",
        };
        f.write_str(name)
    }
}

/// Error raised by user code: a hook, an updater, a callback or a deferred
/// value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookError {
    pub message: String,
    pub phase: Option<Phase>,
    pub component: Option<&'static str>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            phase: None,
            component: None,
        }
    }

    /// Tags the error with where it happened, keeping an earlier tag.
    pub fn at(mut self, phase: Phase, component: &'static str) -> Self {
        if self.phase.is_none() {
            self.phase = Some(phase);
        }
        if self.component.is_none() {
            self.component = Some(component);
        }
        self
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.component, self.phase) {
            (Some(component), Some(phase)) => {
                write!(f, "{component} ({phase}): {}", self.message)
            }
            (Some(component), None) => write!(f, "{component}: {}", self.message),
            (None, Some(phase)) => write!(f, "({phase}): {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for HookError {}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        HookError::new(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        HookError::new(message)
    }
}

/// Why a pass stopped early.
#[derive(Debug)]
pub(crate) enum Failure {
    /// Recoverable: offered to error boundaries on the way up.
    Hook(HookError),
    /// A boundary handler failed, or no boundary was willing; nothing above
    /// may try to recover it.
    Fatal(HookError),
    Host(HostError),
}

impl From<HostError> for Failure {
    fn from(err: HostError) -> Self {
        Failure::Host(err)
    }
}

impl From<HookError> for Failure {
    fn from(err: HookError) -> Self {
        Failure::Hook(err)
    }
}

/// Diagnostics recorded by the renderer instead of being returned.
#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    /// A prop-type validator rejected a value.
    PropType {
        component: &'static str,
        prop: String,
        message: String,
    },
    /// A prop-type validator itself failed.
    Validator {
        component: &'static str,
        prop: String,
        error: HookError,
    },
    /// `initial_state` or `will_receive_props` failed; execution continued.
    Data(HookError),
    /// `will_unmount` failed.
    Teardown(HookError),
    /// No error boundary recovered the error.
    Unhandled(HookError),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::PropType {
                component,
                prop,
                message,
            } => write!(f, "{component}: invalid prop `{prop}`: {message}"),
            Report::Validator {
                component,
                prop,
                error,
            } => write!(f, "{component}: validator for `{prop}` failed: {error}"),
            Report::Data(error) => write!(f, "data error: {error}"),
            Report::Teardown(error) => write!(f, "teardown error: {error}"),
            Report::Unhandled(error) => write!(f, "unhandled error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_keeps_first_location() {
        let err = HookError::from("boom")
            .at(Phase::Render, "Inner")
            .at(Phase::DidCatch, "Outer");
        assert_eq!(err.phase, Some(Phase::Render));
        assert_eq!(err.component, Some("Inner"));
        assert_eq!(err.to_string(), "Inner (render): boom");
    }
}
