use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Point};
use crate::messages;

/// Named, permission-gated area of a single domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Normalized (lowercase, trimmed) unique name.
    pub name: String,
    pub bounds: BoundingBox,
    /// World/map the region belongs to; the region is only evaluated for
    /// users currently in this domain.
    pub domain: String,
    /// Capability key required to enter.
    pub permission: String,
    /// Template shown on entry; `{name}` expands to the region name.
    pub entry_message: String,
}

impl Region {
    pub fn new(
        name: impl Into<String>,
        bounds: BoundingBox,
        domain: impl Into<String>,
        permission: impl Into<String>,
        entry_message: impl Into<String>,
    ) -> Self {
        Self {
            name: normalize_name(name.into()),
            bounds,
            domain: domain.into(),
            permission: permission.into(),
            entry_message: entry_message.into(),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        self.bounds.contains(p)
    }

    /// Entry message with placeholders expanded, ready for display.
    pub fn entry_notice(&self) -> String {
        messages::render(&self.entry_message, &[("name", &self.name)])
    }
}

/// Canonical form used as the registry key.
pub fn normalize_name(name: impl AsRef<str>) -> String {
    name.as_ref().trim().to_lowercase()
}

/// Permission key convention: `<namespace>.entry.<name>`.
pub fn entry_permission(namespace: &str, name: &str) -> String {
    format!("{namespace}.entry.{}", normalize_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Point};

    fn region() -> Region {
        Region::new(
            "Shop ",
            BoundingBox::new(Point::new(0.0, 0.0, 0.0), Point::new(10.0, 5.0, 10.0)),
            "world",
            "ns.entry.shop",
            "Welcome to {name}!",
        )
    }

    #[test]
    fn name_is_normalized_on_construction() {
        assert_eq!(region().name, "shop");
    }

    #[test]
    fn entry_notice_substitutes_name() {
        assert_eq!(region().entry_notice(), "Welcome to shop!");
    }

    #[test]
    fn permission_key_convention() {
        assert_eq!(entry_permission("warden", "Shop"), "warden.entry.shop");
    }
}
