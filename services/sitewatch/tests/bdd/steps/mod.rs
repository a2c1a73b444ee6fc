//! BDD step definitions for sitewatch

pub mod history_steps;
pub mod notification_steps;
pub mod transition_steps;
