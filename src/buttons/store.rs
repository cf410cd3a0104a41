//! Ordered catalog of check-in buttons.
//!
//! Order in the catalog is the kiosk display order. After every mutation the
//! store recomputes the enabled subset the kiosk grid shows, keeping that order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use crate::buttons::types::*;
use crate::error::ConfigError;
use crate::workflow::{WorkflowConfig, WorkflowConfigStore};

/// Liveness handle given to a session; revoked when its button is deleted
#[derive(Debug, Clone)]
pub struct ButtonLease {
    button_id: ButtonId,
    alive: Arc<AtomicBool>,
}

impl ButtonLease {
    pub fn button_id(&self) -> ButtonId {
        self.button_id
    }

    pub fn is_revoked(&self) -> bool {
        !self.alive.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct Entry {
    config: ButtonConfig,
    alive: Arc<AtomicBool>,
}

impl Entry {
    fn new(config: ButtonConfig) -> Self {
        Self {
            config,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    fn revoke(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct Catalog {
    entries: Vec<Entry>,
    enabled: Vec<ButtonConfig>,
}

impl Catalog {
    fn position(&self, id: &ButtonId) -> Result<usize, ConfigError> {
        self.entries
            .iter()
            .position(|e| &e.config.id == id)
            .ok_or_else(|| ConfigError::button_not_found(id))
    }

    fn refresh_enabled(&mut self) {
        self.enabled = self
            .entries
            .iter()
            .filter(|e| e.config.is_enabled)
            .map(|e| e.config.clone())
            .collect();
    }
}

#[derive(Debug)]
pub struct ButtonConfigStore {
    catalog: RwLock<Catalog>,
    workflows: Arc<WorkflowConfigStore>,
}

fn validate_label(label: &str) -> Result<String, ConfigError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(ConfigError::invalid_field("button label must not be empty"));
    }
    Ok(label.to_string())
}

impl ButtonConfigStore {
    pub fn new(workflows: Arc<WorkflowConfigStore>) -> Self {
        Self {
            catalog: RwLock::new(Catalog::default()),
            workflows,
        }
    }

    /// The workflow store that button deletion cascades into
    pub fn workflows(&self) -> &Arc<WorkflowConfigStore> {
        &self.workflows
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, new: NewButton) -> Result<ButtonConfig, ConfigError> {
        let config = ButtonConfig {
            id: ButtonId::generate(),
            label: validate_label(&new.label)?,
            icon: new.icon.unwrap_or_else(|| new.button_type.default_icon()),
            button_type: new.button_type,
            is_enabled: new.is_enabled,
        };

        let mut catalog = self.write();
        catalog.entries.push(Entry::new(config.clone()));
        catalog.refresh_enabled();
        info!(button_id = %config.id, label = %config.label, "Added check-in button");
        Ok(config)
    }

    pub fn update(&self, id: &ButtonId, patch: ButtonPatch) -> Result<ButtonConfig, ConfigError> {
        let label = patch.label.as_deref().map(validate_label).transpose()?;

        let mut catalog = self.write();
        let position = catalog.position(id)?;
        let config = &mut catalog.entries[position].config;
        if let Some(label) = label {
            config.label = label;
        }
        if let Some(icon) = patch.icon {
            config.icon = icon;
        }
        if let Some(button_type) = patch.button_type {
            config.button_type = button_type;
        }
        if let Some(is_enabled) = patch.is_enabled {
            config.is_enabled = is_enabled;
        }
        let updated = config.clone();
        catalog.refresh_enabled();
        info!(button_id = %id, "Updated check-in button");
        Ok(updated)
    }

    /// Hard-delete a button and its workflow; in-flight sessions lose their lease
    pub fn remove(&self, id: &ButtonId) -> Result<ButtonConfig, ConfigError> {
        let mut catalog = self.write();
        let position = catalog.position(id)?;
        let entry = catalog.entries.remove(position);
        entry.revoke();
        self.workflows.remove(id);
        catalog.refresh_enabled();
        info!(button_id = %id, "Removed check-in button and its workflow");
        Ok(entry.config)
    }

    /// Flip enabled state, returning the new value
    pub fn toggle_enabled(&self, id: &ButtonId) -> Result<bool, ConfigError> {
        let mut catalog = self.write();
        let position = catalog.position(id)?;
        let config = &mut catalog.entries[position].config;
        config.is_enabled = !config.is_enabled;
        let enabled = config.is_enabled;
        catalog.refresh_enabled();
        info!(button_id = %id, enabled, "Toggled check-in button");
        Ok(enabled)
    }

    /// Reorder to `ids`, which must be a permutation of every button id
    pub fn reorder(&self, ids: &[ButtonId]) -> Result<(), ConfigError> {
        let mut catalog = self.write();
        if ids.len() != catalog.entries.len() {
            return Err(ConfigError::InvalidReorder {
                reason: format!(
                    "expected {} ids, got {}",
                    catalog.entries.len(),
                    ids.len()
                ),
            });
        }

        let mut positions = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(ConfigError::InvalidReorder {
                    reason: format!("button {id} listed twice"),
                });
            }
            let position = catalog.position(id).map_err(|_| ConfigError::InvalidReorder {
                reason: format!("unknown button {id}"),
            })?;
            positions.push(position);
        }

        let mut slots: Vec<Option<Entry>> = catalog.entries.drain(..).map(Some).collect();
        catalog.entries = positions
            .into_iter()
            .filter_map(|p| slots[p].take())
            .collect();
        catalog.refresh_enabled();
        info!(count = ids.len(), "Reordered check-in buttons");
        Ok(())
    }

    pub fn get(&self, id: &ButtonId) -> Option<ButtonConfig> {
        let catalog = self.read();
        catalog
            .position(id)
            .ok()
            .map(|p| catalog.entries[p].config.clone())
    }

    /// Every button in display order, enabled or not
    pub fn list(&self) -> Vec<ButtonConfig> {
        self.read().entries.iter().map(|e| e.config.clone()).collect()
    }

    /// Enabled buttons in display order, as shown on the kiosk grid
    pub fn enabled(&self) -> Vec<ButtonConfig> {
        self.read().enabled.clone()
    }

    /// Current config plus a liveness lease, taken when a session starts
    pub fn lease(&self, id: &ButtonId) -> Result<(ButtonConfig, ButtonLease), ConfigError> {
        let catalog = self.read();
        let entry = &catalog.entries[catalog.position(id)?];
        Ok((
            entry.config.clone(),
            ButtonLease {
                button_id: entry.config.id,
                alive: Arc::clone(&entry.alive),
            },
        ))
    }

    /// Everything a session needs at start, read under one catalog lock so a
    /// concurrent delete cannot leave an orphaned default workflow behind
    pub fn checkout(
        &self,
        id: &ButtonId,
    ) -> Result<(ButtonConfig, WorkflowConfig, ButtonLease), ConfigError> {
        let catalog = self.read();
        let entry = &catalog.entries[catalog.position(id)?];
        let workflow = self.workflows.get(id);
        Ok((
            entry.config.clone(),
            workflow,
            ButtonLease {
                button_id: entry.config.id,
                alive: Arc::clone(&entry.alive),
            },
        ))
    }

    /// Check a catalog read from untrusted input without touching the store
    pub fn validate(buttons: &[ButtonConfig]) -> Result<(), ConfigError> {
        for (i, button) in buttons.iter().enumerate() {
            validate_label(&button.label)?;
            if buttons[..i].iter().any(|b| b.id == button.id) {
                return Err(ConfigError::invalid_field(format!(
                    "duplicate button id {}",
                    button.id
                )));
            }
        }
        Ok(())
    }

    /// Replace the whole catalog. Leases survive for ids that are still present.
    pub fn restore(&self, buttons: Vec<ButtonConfig>) -> Result<(), ConfigError> {
        Self::validate(&buttons)?;

        let mut catalog = self.write();
        let mut previous: Vec<Entry> = catalog.entries.drain(..).collect();
        for button in buttons {
            self.workflows.reinstate(&button.id);
            let entry = match previous.iter().position(|e| e.config.id == button.id) {
                Some(p) => {
                    let old = previous.swap_remove(p);
                    Entry {
                        config: button,
                        alive: old.alive,
                    }
                }
                None => Entry::new(button),
            };
            catalog.entries.push(entry);
        }
        for dropped in previous {
            dropped.revoke();
            self.workflows.remove(&dropped.config.id);
        }
        catalog.refresh_enabled();
        info!(count = catalog.entries.len(), "Restored button catalog");
        Ok(())
    }
}
