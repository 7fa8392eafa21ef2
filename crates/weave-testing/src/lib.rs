//! Testing utilities and harness for Weave

pub mod testing;

// Re-export testing utilities
pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use weave_core::{
        children, h, props, state, Component, ComponentType, Context, Deferred, Element, Group,
        HookError, InitialState, InstanceId, Phase, PropType, Props, Ref, RefTarget, Report,
        SetState, State, UpdateFlag, Value,
    };
}
