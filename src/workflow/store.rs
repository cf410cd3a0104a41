//! Per-button workflow definitions.
//!
//! Every mutation runs under one write lock, so concurrent admin edits are
//! last-writer-wins per call and can never leave a field `required` without
//! `collect`. Workflows of deleted buttons stay deleted: later edits against
//! those ids fail with `NotFound` instead of recreating a default.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::buttons::ButtonId;
use crate::error::ConfigError;
use crate::workflow::types::*;

#[derive(Debug, Default)]
struct Workflows {
    by_button: HashMap<ButtonId, WorkflowConfig>,
    retired: HashSet<ButtonId>,
}

#[derive(Debug, Default)]
pub struct WorkflowConfigStore {
    workflows: RwLock<Workflows>,
}

impl WorkflowConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Workflows> {
        self.workflows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Workflows> {
        self.workflows.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `edit` to the button's workflow, creating the default one first
    fn edit<T>(
        &self,
        button_id: &ButtonId,
        edit: impl FnOnce(&mut WorkflowConfig) -> T,
    ) -> Result<T, ConfigError> {
        let mut workflows = self.write();
        if workflows.retired.contains(button_id) {
            return Err(ConfigError::button_not_found(button_id));
        }
        let workflow = workflows
            .by_button
            .entry(*button_id)
            .or_insert_with(|| WorkflowConfig::with_defaults(*button_id));
        Ok(edit(workflow))
    }

    /// Workflow for a button, lazily created with defaults.
    ///
    /// A deleted button gets a detached default that is not stored.
    pub fn get(&self, button_id: &ButtonId) -> WorkflowConfig {
        if let Some(existing) = self.read().by_button.get(button_id) {
            return existing.clone();
        }
        self.edit(button_id, |workflow| {
            debug!(button_id = %button_id, "Created default workflow");
            workflow.clone()
        })
        .unwrap_or_else(|_| WorkflowConfig::with_defaults(*button_id))
    }

    /// Workflow for a button without creating one
    pub fn peek(&self, button_id: &ButtonId) -> Option<WorkflowConfig> {
        self.read().by_button.get(button_id).cloned()
    }

    /// Set flags on a standard field; `collect = false` clears `required`
    pub fn set_field_flags(
        &self,
        button_id: &ButtonId,
        field: StandardField,
        flags: FieldFlags,
    ) -> Result<FieldFlags, ConfigError> {
        let stored = self.edit(button_id, |workflow| workflow.fields.set(field, flags))?;
        info!(
            button_id = %button_id,
            field = field.key(),
            collect = stored.collect,
            required = stored.required,
            "Updated field flags"
        );
        Ok(stored)
    }

    pub fn add_custom_field(
        &self,
        button_id: &ButtonId,
        label: &str,
    ) -> Result<CustomField, ConfigError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ConfigError::invalid_field("custom field label must not be empty"));
        }

        let field = self.edit(button_id, |workflow| {
            let field = CustomField {
                id: workflow.allocate_custom_id(),
                label: label.to_string(),
                flags: FieldFlags::OPTIONAL,
            };
            workflow.custom_fields.push(field.clone());
            field
        })?;
        info!(button_id = %button_id, field_id = %field.id, "Added custom field");
        Ok(field)
    }

    pub fn remove_custom_field(
        &self,
        button_id: &ButtonId,
        field_id: &CustomFieldId,
    ) -> Result<CustomField, ConfigError> {
        let mut workflows = self.write();
        let workflow = workflows
            .by_button
            .get_mut(button_id)
            .ok_or_else(|| custom_field_not_found(field_id))?;
        let position = workflow
            .custom_fields
            .iter()
            .position(|f| &f.id == field_id)
            .ok_or_else(|| custom_field_not_found(field_id))?;
        let removed = workflow.custom_fields.remove(position);
        info!(button_id = %button_id, field_id = %field_id, "Removed custom field");
        Ok(removed)
    }

    pub fn set_custom_field_flags(
        &self,
        button_id: &ButtonId,
        field_id: &CustomFieldId,
        flags: FieldFlags,
    ) -> Result<FieldFlags, ConfigError> {
        let mut workflows = self.write();
        let field = workflows
            .by_button
            .get_mut(button_id)
            .and_then(|workflow| workflow.custom_field_mut(field_id))
            .ok_or_else(|| custom_field_not_found(field_id))?;
        field.flags = flags.normalized();
        Ok(field.flags)
    }

    pub fn set_options(
        &self,
        button_id: &ButtonId,
        options: WorkflowOptions,
    ) -> Result<WorkflowOptions, ConfigError> {
        self.edit(button_id, |workflow| workflow.options = options)?;
        info!(
            button_id = %button_id,
            capture_photo = options.capture_photo,
            print_badge = options.print_badge,
            require_nda = options.require_nda,
            "Updated workflow options"
        );
        Ok(options)
    }

    pub fn set_notify(&self, button_id: &ButtonId, policy: NotifyPolicy) -> Result<(), ConfigError> {
        let policy = match policy {
            NotifyPolicy::SpecificContact { contact } => {
                let contact = contact.trim();
                if contact.is_empty() {
                    return Err(ConfigError::invalid_field(
                        "specific_contact notification needs a contact",
                    ));
                }
                NotifyPolicy::SpecificContact {
                    contact: contact.to_string(),
                }
            }
            NotifyPolicy::EmployeeSearch => NotifyPolicy::EmployeeSearch,
        };
        self.edit(button_id, |workflow| workflow.notify = policy)
    }

    /// Cascade target for button deletion; the id stays closed to further edits
    pub(crate) fn remove(&self, button_id: &ButtonId) -> Option<WorkflowConfig> {
        let mut workflows = self.write();
        workflows.retired.insert(*button_id);
        workflows.by_button.remove(button_id)
    }

    /// Reopen an id that a catalog restore brings back
    pub(crate) fn reinstate(&self, button_id: &ButtonId) {
        self.write().retired.remove(button_id);
    }

    /// All workflows, ordered by button id for stable output
    pub fn snapshot(&self) -> Vec<WorkflowConfig> {
        let mut all: Vec<_> = self.read().by_button.values().cloned().collect();
        all.sort_by_key(|w| w.button_id);
        all
    }

    /// Check workflows read from untrusted input without touching the store
    pub fn validate(workflows: &[WorkflowConfig]) -> Result<(), ConfigError> {
        for (i, workflow) in workflows.iter().enumerate() {
            if workflows[..i].iter().any(|w| w.button_id == workflow.button_id) {
                return Err(ConfigError::invalid_field(format!(
                    "duplicate workflow for button {}",
                    workflow.button_id
                )));
            }
            for (j, field) in workflow.custom_fields.iter().enumerate() {
                if field.id.as_str().trim().is_empty() {
                    return Err(ConfigError::invalid_field("custom field id must not be empty"));
                }
                if field.label.trim().is_empty() {
                    return Err(ConfigError::invalid_field(format!(
                        "custom field {} has an empty label",
                        field.id
                    )));
                }
                if workflow.custom_fields[..j].iter().any(|f| f.id == field.id) {
                    return Err(ConfigError::invalid_field(format!(
                        "duplicate custom field id {} on button {}",
                        field.id, workflow.button_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Replace every workflow, re-normalizing flags from untrusted input.
    ///
    /// Nothing changes unless the whole set passes `validate`.
    pub fn restore(&self, workflows: Vec<WorkflowConfig>) -> Result<(), ConfigError> {
        Self::validate(&workflows)?;

        let mut restored = HashMap::with_capacity(workflows.len());
        for mut workflow in workflows {
            for field in StandardField::ALL {
                let flags = workflow.fields.get(field);
                workflow.fields.set(field, flags);
            }
            for custom in &mut workflow.custom_fields {
                custom.label = custom.label.trim().to_string();
                custom.flags = custom.flags.normalized();
            }
            restored.insert(workflow.button_id, workflow);
        }

        let mut store = self.write();
        for button_id in restored.keys() {
            store.retired.remove(button_id);
        }
        store.by_button = restored;
        info!(count = store.by_button.len(), "Restored workflows");
        Ok(())
    }
}

fn custom_field_not_found(field_id: &CustomFieldId) -> ConfigError {
    ConfigError::NotFound {
        kind: "custom field",
        id: field_id.to_string(),
    }
}
