//! Configuration loading and validation.

pub mod loader;
pub mod schema;

pub use loader::{load_or_default, load_settings, load_settings_from_str};
pub use schema::Settings;
