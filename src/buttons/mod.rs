// Button catalog - the kiosk's configurable entry points

pub mod store;
pub mod types;

pub use store::{ButtonConfigStore, ButtonLease};
pub use types::{ButtonConfig, ButtonIcon, ButtonId, ButtonPatch, ButtonType, NewButton, VisitType};
