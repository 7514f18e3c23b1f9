//! Prompt construction
//!
//! System instruction for the cooking assistant, the preferences block
//! appended to it, and the fixed templates for image and speech requests.

use crate::state::Preferences;

/// Persona and response rules for the assistant
pub const ASSISTANT_PERSONA: &str = "\
You are Chef Mate, a friendly cooking assistant.
You help people cook tasty, healthy and affordable meals at home.

What you do:
1. Suggest recipes from the ingredients the user has, respecting their diet, cuisine, available time and skill level.
2. For every recipe give:
   - the recipe name
   - an ingredients list with quantities
   - step-by-step instructions in plain language
   - cooking time and serving size
   - tips for better taste
   - healthier alternatives where useful
3. You can also help with budget meals, meals for students and families, diet plans (weight loss, weight gain, diabetic-friendly), festive dishes and ideas for leftovers.
4. Sound like a helpful home cook, not a robot: warm, encouraging and clear.
5. Never give unsafe cooking advice, and point out ingredients that commonly cause allergies.

Ask a follow-up question whenever ingredients, cuisine or preferences are unclear.
Format answers in Markdown with headings, bold text and lists.
";

/// Text part used when a photo is sent without any text
pub const DEFAULT_IMAGE_TURN_PROMPT: &str = "Analyze this image and suggest recipes.";

/// Reply shown when a chat turn fails
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I had trouble connecting to the kitchen server. Please try again.";

/// First message of a new conversation
pub const WELCOME_MESSAGE: &str = "👋 Hi! I'm Chef Mate. Tell me what ingredients you have, \
and I'll help you cook something delicious! You can also show me a photo of your fridge.";

/// Marker appended when speech input is truncated
pub const TRUNCATION_MARKER: &str = "...";

fn or_none(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "None"
    } else {
        trimmed
    }
}

/// Render the preferences block listed under the persona
pub fn render_preferences(prefs: &Preferences) -> String {
    format!(
        "Current user preferences:\n\
         - Diet: {}\n\
         - Cuisine: {}\n\
         - Skill level: {}\n\
         - Allergies: {}\n\
         - Preferred language: {}\n",
        prefs.diet,
        or_none(&prefs.cuisine),
        prefs.skill_level,
        or_none(&prefs.allergies),
        prefs.language,
    )
}

/// Full system instruction for a conversation session
pub fn system_instruction(prefs: &Preferences) -> String {
    format!("{}\n{}", ASSISTANT_PERSONA, render_preferences(prefs))
}

/// Wrap a dish name in the food-photography template
pub fn image_prompt(dish: &str) -> String {
    format!(
        "A high quality, appetizing food photography shot of: {}. Professional lighting, 4k.",
        dish.trim()
    )
}

/// Text for a user turn; photos without text get the default prompt
pub fn turn_text(text: &str, has_image: bool) -> String {
    if has_image && text.trim().is_empty() {
        DEFAULT_IMAGE_TURN_PROMPT.to_string()
    } else {
        text.to_string()
    }
}

/// Bound speech input to `limit` characters, marking truncation
pub fn truncate_for_speech(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
