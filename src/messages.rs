//! User-facing message catalog.
//!
//! Hosts surface these strings however they like (chat, toast, form label).
//! Every entry can be overridden at startup; templates use `{placeholder}`
//! tokens expanded by [`render`].

use std::collections::HashMap;

pub const ENTRY_DENIED: &str = "entry_denied";
pub const ENTRY_DEFAULT: &str = "entry_default";
pub const CORNER_A_PROMPT: &str = "corner_a_prompt";
pub const CORNER_B_PROMPT: &str = "corner_b_prompt";
pub const CORNER_SET: &str = "corner_set";
pub const CREATE_SUCCESS: &str = "create_success";
pub const EDIT_SUCCESS: &str = "edit_success";
pub const REMOVE_SUCCESS: &str = "remove_success";
pub const AREA_EXISTS: &str = "area_exists";
pub const AREA_NOT_FOUND: &str = "area_not_found";
pub const SESSION_CANCELLED: &str = "session_cancelled";
pub const SESSION_EXPIRED: &str = "session_expired";
pub const LIST_HEADER: &str = "list_header";
pub const LIST_EMPTY: &str = "list_empty";

/// Expand `{key}` tokens in `template` from the given pairs. Unknown tokens
/// are left in place so a misconfigured template stays diagnosable.
pub fn render(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in pairs {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

#[derive(Debug, Clone)]
pub struct MessageCatalog {
    entries: HashMap<String, String>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let mut entries = HashMap::new();
        for (key, text) in [
            (ENTRY_DENIED, "You do not have permission to enter {name}."),
            (ENTRY_DEFAULT, "Welcome to {name}!"),
            (CORNER_A_PROMPT, "Stand at the first corner and trigger a capture."),
            (CORNER_B_PROMPT, "Stand at the opposite corner and trigger a capture."),
            (CORNER_SET, "Corner set at X: {x}, Y: {y}, Z: {z}."),
            (CREATE_SUCCESS, "Area {name} created."),
            (EDIT_SUCCESS, "Area {name} updated."),
            (REMOVE_SUCCESS, "Area {name} removed."),
            (AREA_EXISTS, "An area named {name} already exists."),
            (AREA_NOT_FOUND, "No area named {name} exists."),
            (SESSION_CANCELLED, "Area editing cancelled."),
            (SESSION_EXPIRED, "Area editing timed out."),
            (LIST_HEADER, "Defined areas:"),
            (LIST_EMPTY, "No areas have been defined yet."),
        ] {
            entries.insert(key.to_string(), text.to_string());
        }
        Self { entries }
    }
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override a catalog entry. Unknown keys are accepted so hosts can add
    /// their own strings next to the built-ins.
    pub fn set(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(key.into(), text.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Look up and expand a catalog entry in one step.
    pub fn render(&self, key: &str, pairs: &[(&str, &str)]) -> String {
        match self.entries.get(key) {
            Some(template) => render(template, pairs),
            None => format!("missing message for key: {key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_known_tokens() {
        assert_eq!(
            render("Welcome to {name}!", &[("name", "shop")]),
            "Welcome to shop!"
        );
    }

    #[test]
    fn render_leaves_unknown_tokens() {
        assert_eq!(render("{who} entered", &[("name", "shop")]), "{who} entered");
    }

    #[test]
    fn catalog_lookup_and_override() {
        let mut catalog = MessageCatalog::new();
        assert_eq!(
            catalog.render(AREA_EXISTS, &[("name", "shop")]),
            "An area named shop already exists."
        );
        catalog.set(AREA_EXISTS, "{name} is taken");
        assert_eq!(catalog.render(AREA_EXISTS, &[("name", "shop")]), "shop is taken");
    }

    #[test]
    fn missing_key_is_diagnosable() {
        let catalog = MessageCatalog::new();
        assert_eq!(catalog.render("nope", &[]), "missing message for key: nope");
    }
}
