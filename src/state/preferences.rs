//! User preferences
//!
//! Assistant behavior configuration (diet, cuisine, skill level, allergies,
//! language) and the store that merges partial edits into it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel for "no cuisine preference"
pub const ANY_CUISINE: &str = "Any";

/// Dietary preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Diet {
    /// No restriction
    #[default]
    Any,
    /// Vegetarian
    Vegetarian,
    /// Non-vegetarian
    #[serde(rename = "Non-Vegetarian")]
    NonVegetarian,
    /// Vegan
    Vegan,
}

impl Diet {
    /// All options, in display order
    pub const ALL: [Diet; 4] = [Diet::Any, Diet::Vegetarian, Diet::NonVegetarian, Diet::Vegan];

    /// Display label
    pub fn as_str(&self) -> &'static str {
        match self {
            Diet::Any => "Any",
            Diet::Vegetarian => "Vegetarian",
            Diet::NonVegetarian => "Non-Vegetarian",
            Diet::Vegan => "Vegan",
        }
    }
}

/// Cooking skill level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SkillLevel {
    /// Beginner
    #[default]
    Beginner,
    /// Intermediate
    Intermediate,
    /// Expert
    Expert,
}

impl SkillLevel {
    /// All options, in display order
    pub const ALL: [SkillLevel; 3] = [
        SkillLevel::Beginner,
        SkillLevel::Intermediate,
        SkillLevel::Expert,
    ];

    /// Display label
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Expert => "Expert",
        }
    }
}

/// Reply language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    /// English
    #[default]
    English,
    /// Hindi
    Hindi,
    /// Hinglish (Hindi-English mix)
    Hinglish,
}

impl Language {
    /// All options, in display order
    pub const ALL: [Language; 3] = [Language::English, Language::Hindi, Language::Hinglish];

    /// Display label
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Hinglish => "Hinglish",
        }
    }
}

macro_rules! label_impls {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        let options: Vec<_> = <$ty>::ALL.iter().map(|v| v.as_str()).collect();
                        format!(
                            "unknown {} '{}', expected one of: {}",
                            $what,
                            wanted,
                            options.join(", ")
                        )
                    })
            }
        }
    };
}

label_impls!(Diet, "diet");
label_impls!(SkillLevel, "skill level");
label_impls!(Language, "language");

/// Assistant behavior configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Dietary preference
    pub diet: Diet,
    /// Preferred cuisine, "Any" when unset
    pub cuisine: String,
    /// Cooking skill level
    pub skill_level: SkillLevel,
    /// Allergies or exclusions, empty for none
    pub allergies: String,
    /// Reply language
    pub language: Language,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            diet: Diet::Any,
            cuisine: ANY_CUISINE.to_string(),
            skill_level: SkillLevel::Beginner,
            allergies: String::new(),
            language: Language::English,
        }
    }
}

/// Partial preferences edit; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    /// New dietary preference
    pub diet: Option<Diet>,
    /// New cuisine (blank resets to "Any")
    pub cuisine: Option<String>,
    /// New skill level
    pub skill_level: Option<SkillLevel>,
    /// New allergies text
    pub allergies: Option<String>,
    /// New language
    pub language: Option<Language>,
}

impl PreferencesUpdate {
    /// Parse a single `field value` edit as typed in the settings surface
    ///
    /// Field names: `diet`, `cuisine`, `skill`, `allergies`, `language`.
    pub fn parse_field(field: &str, value: &str) -> Result<Self, String> {
        let mut update = Self::default();
        match field.trim().to_ascii_lowercase().as_str() {
            "diet" => update.diet = Some(value.parse()?),
            "cuisine" => update.cuisine = Some(value.to_string()),
            "skill" | "skill_level" | "skilllevel" => update.skill_level = Some(value.parse()?),
            "allergies" => update.allergies = Some(value.to_string()),
            "language" | "lang" => update.language = Some(value.parse()?),
            other => return Err(format!("unknown preference '{}'", other)),
        }
        Ok(update)
    }
}

/// Holds the current preferences; every edit produces a new snapshot
#[derive(Debug, Clone, Default)]
pub struct PreferencesStore {
    current: Preferences,
}

impl PreferencesStore {
    /// Create a store seeded with `initial`
    pub fn new(initial: Preferences) -> Self {
        Self { current: initial }
    }

    /// Current snapshot
    pub fn get(&self) -> Preferences {
        self.current.clone()
    }

    /// Merge `update` into the current preferences and return the new snapshot
    pub fn set(&mut self, update: PreferencesUpdate) -> Preferences {
        if let Some(diet) = update.diet {
            self.current.diet = diet;
        }
        if let Some(cuisine) = update.cuisine {
            let cuisine = cuisine.trim();
            self.current.cuisine = if cuisine.is_empty() {
                ANY_CUISINE.to_string()
            } else {
                cuisine.to_string()
            };
        }
        if let Some(skill_level) = update.skill_level {
            self.current.skill_level = skill_level;
        }
        if let Some(allergies) = update.allergies {
            self.current.allergies = allergies.trim().to_string();
        }
        if let Some(language) = update.language {
            self.current.language = language;
        }
        self.get()
    }
}
