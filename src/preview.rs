//! Read-only projection of the catalog as the kiosk welcome grid shows it.

use serde::Serialize;

use crate::buttons::{ButtonConfigStore, ButtonIcon, ButtonId, ButtonType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonPreview {
    pub id: ButtonId,
    pub label: String,
    pub icon: ButtonIcon,
    pub glyph: &'static str,
    pub button_type: ButtonType,
}

pub fn glyph(icon: ButtonIcon) -> &'static str {
    match icon {
        ButtonIcon::UserCheck => "👤",
        ButtonIcon::Users => "👥",
        ButtonIcon::Package => "📦",
        ButtonIcon::Truck => "🚚",
        ButtonIcon::Coffee => "☕",
        ButtonIcon::Calendar => "📅",
        ButtonIcon::Briefcase => "💼",
        ButtonIcon::HelpCircle => "❓",
    }
}

/// Enabled buttons in display order; disabled buttons never appear
pub fn preview_buttons(store: &ButtonConfigStore) -> Vec<ButtonPreview> {
    store
        .enabled()
        .into_iter()
        .map(|button| ButtonPreview {
            id: button.id,
            glyph: glyph(button.icon),
            label: button.label,
            icon: button.icon,
            button_type: button.button_type,
        })
        .collect()
}

/// Plain-text welcome grid, row by row
pub fn render_grid(previews: &[ButtonPreview], columns: usize) -> String {
    if previews.is_empty() {
        return "(no buttons enabled)\n".to_string();
    }
    let cells: Vec<String> = previews
        .iter()
        .map(|p| format!("[ {} {} ]", p.glyph, p.label))
        .collect();
    let width = cells.iter().map(|c| c.chars().count()).max().unwrap_or(0);

    let mut grid = String::new();
    for row in cells.chunks(columns.max(1)) {
        let padded: Vec<String> = row.iter().map(|cell| format!("{cell:<width$}")).collect();
        grid.push_str(padded.join("  ").trim_end());
        grid.push('\n');
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::{ButtonPatch, NewButton};
    use crate::workflow::WorkflowConfigStore;
    use std::sync::Arc;

    fn store() -> ButtonConfigStore {
        ButtonConfigStore::new(Arc::new(WorkflowConfigStore::new()))
    }

    #[test]
    fn test_preview_hides_disabled_and_keeps_order() {
        let store = store();
        let visit = store
            .add(NewButton::new("Visit Employee", ButtonType::VisitEmployee))
            .unwrap();
        let food = store
            .add(NewButton::new("Food Delivery", ButtonType::Delivery).with_icon(ButtonIcon::Coffee))
            .unwrap();
        let event = store
            .add(NewButton::new("Town Hall", ButtonType::Event).disabled())
            .unwrap();

        store.reorder(&[event.id, food.id, visit.id]).unwrap();
        let previews = preview_buttons(&store);
        let labels: Vec<_> = previews.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Food Delivery", "Visit Employee"]);
        assert_eq!(previews[0].glyph, "☕");

        store.toggle_enabled(&event.id).unwrap();
        store.update(&visit.id, ButtonPatch::label("Meet someone")).unwrap();
        let labels: Vec<_> = preview_buttons(&store).into_iter().map(|p| p.label).collect();
        assert_eq!(labels, vec!["Town Hall", "Food Delivery", "Meet someone"]);
    }

    #[test]
    fn test_render_grid_wraps_rows() {
        let store = store();
        for label in ["A", "B", "C"] {
            store
                .add(NewButton::new(label, ButtonType::Other).with_icon(ButtonIcon::HelpCircle))
                .unwrap();
        }
        let grid = render_grid(&preview_buttons(&store), 2);
        let rows: Vec<_> = grid.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("A") && rows[0].contains("B"));
        assert_eq!(rows[1], "[ ❓ C ]");
        assert_eq!(render_grid(&[], 3), "(no buttons enabled)\n");
    }
}
