//! Login page view model.

use serde::Serialize;
use serde_json::Value;

use super::fields;
use super::homepage::ActionLink;
use crate::entry::NormalizedEntry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginModel {
    pub heading: String,
    pub subheading: String,
    pub email_label: String,
    pub password_label: String,
    pub submit_label: String,
    pub forgot_password: ActionLink,
    pub signup_prompt: String,
    pub signup_action: ActionLink,
}

impl Default for LoginModel {
    fn default() -> Self {
        Self {
            heading: String::new(),
            subheading: String::new(),
            email_label: "Email".to_string(),
            password_label: "Password".to_string(),
            submit_label: "Log in".to_string(),
            forgot_password: ActionLink::default(),
            signup_prompt: String::new(),
            signup_action: ActionLink::default(),
        }
    }
}

/// Map a normalized entry to the login model. Same contract as the
/// homepage mapper: `None` only for an entry with no content at all.
pub fn map_login(entry: &NormalizedEntry) -> Option<LoginModel> {
    let entry_fields = entry.fields()?;
    let header = fields::group(entry_fields, "header");
    let form = fields::group(entry_fields, "form");

    Some(LoginModel {
        heading: fields::text(header, &["heading", "title"], ""),
        subheading: fields::text(header, &["subheading", "subtitle"], ""),
        email_label: fields::text(form, &["email_label", "email"], "Email"),
        password_label: fields::text(form, &["password_label", "password"], "Password"),
        submit_label: fields::text(form, &["submit_label", "submit"], "Log in"),
        forgot_password: map_form_link(form, &["forgot_password", "forgot"]),
        signup_prompt: fields::text(form, &["signup_prompt", "signup_text"], ""),
        signup_action: map_form_link(form, &["signup_action", "signup"]),
    })
}

fn map_form_link(group: &Value, paths: &[&str]) -> ActionLink {
    let Some(link) = fields::pick(group, paths) else {
        return ActionLink::default();
    };
    if let Value::String(label) = link {
        return ActionLink {
            label: label.clone(),
            href: "#".to_string(),
        };
    }
    ActionLink {
        label: fields::text(link, &["title", "label", "text"], ""),
        href: fields::href(link, &["href", "url", "link"]),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::RawEntry;
    use crate::entry::normalize;
    use crate::model::schema;
    use serde_json::json;

    fn normalized(value: serde_json::Value) -> NormalizedEntry {
        normalize(&RawEntry::new(value), &schema::LOGIN.group_keys())
    }

    #[test]
    fn test_defaults_carry_form_labels() {
        let model = LoginModel::default();
        assert_eq!(model.email_label, "Email");
        assert_eq!(model.password_label, "Password");
        assert_eq!(model.submit_label, "Log in");
    }

    #[test]
    fn test_map_login() {
        let entry = normalized(json!({
            "uid": "login1",
            "header": { "heading": "Welcome back" },
            "form": {
                "submit_label": "Sign in",
                "forgot_password": { "title": "Forgot?", "href": "/reset" },
                "signup_prompt": "New here?",
                "signup_action": "Create an account",
            },
        }));

        let model = map_login(&entry).unwrap();
        assert_eq!(model.heading, "Welcome back");
        assert_eq!(model.email_label, "Email");
        assert_eq!(model.submit_label, "Sign in");
        assert_eq!(model.forgot_password.href, "/reset");
        assert_eq!(model.signup_action.label, "Create an account");
        assert_eq!(model.signup_action.href, "#");
    }

    #[test]
    fn test_no_content_maps_to_none() {
        let entry = normalized(json!({ "uid": "login1" }));
        assert!(map_login(&entry).is_none());
    }
}
