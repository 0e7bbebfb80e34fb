//! Domain entities and invariants for the Flowgate execution core.

#![forbid(unsafe_code)]

mod connection;
mod definition;
mod field;
mod invocation;
mod run;

pub use connection::Connection;
pub use definition::{
    ActionDefinition, ActionHandler, DefinitionDescriptor, DescriptorInput, InterruptOutcomeHandler,
    TriggerDefinition, TriggerHandler, TriggerStrategy,
};
pub use field::{DynamicOptionsContext, DynamicOptionsProvider, FieldKind, FieldOption, InputField};
pub use invocation::Invocation;
pub use run::{ActionOutcome, PollCursor, RunResult};
