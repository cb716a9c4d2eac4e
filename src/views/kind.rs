use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// The two kinds of entity whose views are counted
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EntityKind {
    Shop,
    Product,
}

impl EntityKind {
    /// Plural path segment used by the HTTP routes (`shops`, `products`)
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Shop => "shops",
            EntityKind::Product => "products",
        }
    }

    pub fn from_collection(segment: &str) -> Option<Self> {
        match segment {
            "shops" => Some(EntityKind::Shop),
            "products" => Some(EntityKind::Product),
            _ => None,
        }
    }
}
