//! Content type schemas.
//!
//! One static [`ContentSchema`] per editorial content type. A schema
//! carries everything the engine needs to know about a type:
//! - its group keys, which drive the normalizer's shape detection,
//! - the renderer-referenced field names per group, which drive edit
//!   marker synthesis,
//! - the mapper turning a normalized entry into the page model.
//!
//! There is deliberately no schema discovery; the marketing site ships
//! exactly these types.

use super::PageModel;
use super::{homepage, login};
use crate::entry::NormalizedEntry;

/// One content group and its renderer-referenced fields.
pub struct GroupSpec {
    pub key: &'static str,
    pub fields: &'static [&'static str],
}

pub struct ContentSchema {
    pub content_type: &'static str,
    pub groups: &'static [GroupSpec],
    pub map: fn(&NormalizedEntry) -> Option<PageModel>,
}

impl ContentSchema {
    /// Group keys in schema order, for shape detection.
    pub fn group_keys(&self) -> Vec<&'static str> {
        self.groups.iter().map(|g| g.key).collect()
    }

    /// Look up a schema by content type uid.
    pub fn for_content_type(name: &str) -> Option<&'static ContentSchema> {
        SCHEMAS.iter().copied().find(|s| s.content_type == name)
    }
}

fn map_homepage_model(entry: &NormalizedEntry) -> Option<PageModel> {
    homepage::map_homepage(entry).map(PageModel::Homepage)
}

fn map_login_model(entry: &NormalizedEntry) -> Option<PageModel> {
    login::map_login(entry).map(PageModel::Login)
}

pub static HOMEPAGE: ContentSchema = ContentSchema {
    content_type: "homepage",
    groups: &[
        GroupSpec {
            key: "navigation",
            fields: &["brand", "links", "action"],
        },
        GroupSpec {
            key: "hero",
            fields: &[
                "heading",
                "subheading",
                "primary_action",
                "secondary_action",
                "highlights",
            ],
        },
        GroupSpec {
            key: "features",
            fields: &["items"],
        },
        GroupSpec {
            key: "benefits",
            fields: &["items"],
        },
        GroupSpec {
            key: "testimonials",
            fields: &["items"],
        },
        GroupSpec {
            key: "pricing",
            fields: &["heading", "subheading", "plans"],
        },
        GroupSpec {
            key: "cta",
            fields: &["heading", "subheading", "action"],
        },
        GroupSpec {
            key: "footer",
            fields: &["brand", "tagline", "columns", "copyright"],
        },
    ],
    map: map_homepage_model,
};

pub static LOGIN: ContentSchema = ContentSchema {
    content_type: "login",
    groups: &[
        GroupSpec {
            key: "header",
            fields: &["heading", "subheading"],
        },
        GroupSpec {
            key: "form",
            fields: &[
                "email_label",
                "password_label",
                "submit_label",
                "forgot_password",
                "signup_prompt",
                "signup_action",
            ],
        },
    ],
    map: map_login_model,
};

pub static SCHEMAS: &[&ContentSchema] = &[&HOMEPAGE, &LOGIN];

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_content_type() {
        assert!(ContentSchema::for_content_type("homepage").is_some());
        assert!(ContentSchema::for_content_type("login").is_some());
        assert!(ContentSchema::for_content_type("blog_post").is_none());
    }

    #[test]
    fn test_homepage_group_keys_cover_all_sections() {
        let keys = HOMEPAGE.group_keys();
        for expected in [
            "navigation",
            "hero",
            "features",
            "benefits",
            "testimonials",
            "pricing",
            "cta",
            "footer",
        ] {
            assert!(keys.contains(&expected), "missing group {expected}");
        }
    }

    #[test]
    fn test_schema_uids_are_unique() {
        let mut seen = Vec::new();
        for schema in SCHEMAS {
            assert!(!seen.contains(&schema.content_type));
            seen.push(schema.content_type);
        }
    }
}
