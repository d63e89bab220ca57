//! View model mapping.
//!
//! Turns normalized entries into the typed, fully-defaulted records the
//! page renderers consume. Mapping is pure: no I/O, no input mutation,
//! the same entry always yields the same model.
//!
//! ```text
//! NormalizedEntry → ContentSchema.map → PageModel (Homepage | Login)
//! ```

pub mod fields;
pub mod homepage;
pub mod login;
pub mod schema;

pub use homepage::HomepageModel;
pub use login::LoginModel;
pub use schema::ContentSchema;

use serde::Serialize;
use serde_json::Value;

/// The mapped page, one variant per content type.
///
/// Serializes untagged: a snapshot of a homepage is the homepage record
/// itself, not a wrapper object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PageModel {
    Homepage(HomepageModel),
    Login(LoginModel),
}

impl PageModel {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Homepage(_) => "homepage",
            Self::Login(_) => "login",
        }
    }

    /// Default model for a content type, for rendering before any entry
    /// has been committed.
    pub fn default_for(content_type: &str) -> Option<Self> {
        match content_type {
            "homepage" => Some(Self::Homepage(HomepageModel::default())),
            "login" => Some(Self::Login(LoginModel::default())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_serialization() {
        let model = PageModel::Homepage(HomepageModel::default());
        let value = model.to_value();
        // The wrapper is invisible: section keys sit at the top level
        assert!(value.get("hero").is_some());
        assert!(value.get("Homepage").is_none());
    }

    #[test]
    fn test_default_for() {
        assert_eq!(
            PageModel::default_for("homepage").map(|m| m.content_type()),
            Some("homepage")
        );
        assert_eq!(
            PageModel::default_for("login").map(|m| m.content_type()),
            Some("login")
        );
        assert!(PageModel::default_for("blog_post").is_none());
    }
}
