// State management module
// Handles user-configurable assistant preferences

pub mod preferences;

pub use preferences::{Diet, Language, Preferences, PreferencesStore, PreferencesUpdate, SkillLevel};
