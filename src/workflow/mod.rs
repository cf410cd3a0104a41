// Workflow configuration and step resolution

pub mod resolver;
pub mod store;
pub mod types;

pub use resolver::{resolve, ContactLayout, Step, StepKind, WorkflowResolver};
pub use store::WorkflowConfigStore;
pub use types::{
    CustomField, CustomFieldId, FieldFlags, FieldKey, FieldOrigin, FieldSpec, InputKind,
    NotifyPolicy, StandardField, StandardFields, WorkflowConfig, WorkflowOptions,
};
