//! Homepage view model.
//!
//! One fully-defaulted record per section of the marketing page. Every
//! leaf a renderer reads has a defined value; the documented fallbacks
//! are empty string for text, `"#"` for link targets, 5 for ratings,
//! [`DEFAULT_ICON`] for icons and an empty list for repeatables.

use serde::Serialize;
use serde_json::Value;

use super::fields;
use crate::entry::NormalizedEntry;

/// Icon shown when a feature card does not name one.
pub const DEFAULT_ICON: &str = "sparkles";

// =============================================================================
// Model types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HomepageModel {
    pub navigation: Navigation,
    pub hero: Hero,
    pub features: Vec<FeatureCard>,
    pub benefits: Vec<Benefit>,
    pub testimonials: Vec<Testimonial>,
    pub pricing: Pricing,
    pub cta: CallToAction,
    pub footer: Footer,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Navigation {
    pub brand: String,
    pub links: Vec<NavLink>,
    pub action: ActionLink,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

/// A labelled link. The default target is the inert anchor, never an
/// empty string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionLink {
    pub label: String,
    pub href: String,
}

impl Default for ActionLink {
    fn default() -> Self {
        Self {
            label: String::new(),
            href: "#".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Hero {
    pub heading: String,
    pub subheading: String,
    pub primary_action: ActionLink,
    pub secondary_action: ActionLink,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCard {
    pub icon: String,
    pub title: String,
    pub description: String,
}

impl Default for FeatureCard {
    fn default() -> Self {
        Self {
            icon: DEFAULT_ICON.to_string(),
            title: String::new(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Benefit {
    pub title: String,
    pub description: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Testimonial {
    pub quote: String,
    pub author: String,
    pub role: String,
    pub rating: u8,
}

impl Default for Testimonial {
    fn default() -> Self {
        Self {
            quote: String::new(),
            author: String::new(),
            role: String::new(),
            rating: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Pricing {
    pub heading: String,
    pub subheading: String,
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Plan {
    pub name: String,
    pub price: String,
    pub period: String,
    pub description: String,
    pub features: Vec<String>,
    pub action: ActionLink,
    pub featured: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CallToAction {
    pub heading: String,
    pub subheading: String,
    pub action: ActionLink,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Footer {
    pub brand: String,
    pub tagline: String,
    pub columns: Vec<FooterColumn>,
    pub copyright: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FooterColumn {
    pub heading: String,
    pub links: Vec<NavLink>,
}

// =============================================================================
// Mapper
// =============================================================================

/// Map a normalized entry to the homepage model.
///
/// `None` only when the entry carries no content at all; an entry with an
/// empty `fields` container maps to a fully defaulted model instead, so
/// "nothing published yet" and "blank page" stay distinguishable.
pub fn map_homepage(entry: &NormalizedEntry) -> Option<HomepageModel> {
    let fields = entry.fields()?;

    Some(HomepageModel {
        navigation: map_navigation(fields::group(fields, "navigation")),
        hero: map_hero(fields::group(fields, "hero")),
        features: map_features(fields::group(fields, "features")),
        benefits: map_benefits(fields::group(fields, "benefits")),
        testimonials: map_testimonials(fields::group(fields, "testimonials")),
        pricing: map_pricing(fields::group(fields, "pricing")),
        cta: map_cta(fields::group(fields, "cta")),
        footer: map_footer(fields::group(fields, "footer")),
    })
}

fn map_navigation(group: &Value) -> Navigation {
    Navigation {
        brand: fields::text(group, &["brand", "logo_text", "title"], ""),
        links: fields::expanded(group, &["links", "items", "menu"])
            .into_iter()
            .map(map_nav_link)
            .collect(),
        action: map_action(group, &["action", "cta", "button"]),
    }
}

fn map_nav_link(item: &Value) -> NavLink {
    // A bare string is a label with nowhere to go
    if let Value::String(label) = item {
        return NavLink {
            label: label.clone(),
            href: "#".to_string(),
        };
    }
    NavLink {
        label: fields::text(item, &["label", "title", "text"], ""),
        href: fields::href(item, &["href", "url", "link"]),
    }
}

fn map_action(group: &Value, paths: &[&str]) -> ActionLink {
    let Some(action) = fields::pick(group, paths) else {
        return ActionLink::default();
    };
    if let Value::String(label) = action {
        return ActionLink {
            label: label.clone(),
            href: "#".to_string(),
        };
    }
    ActionLink {
        label: fields::text(action, &["title", "label", "text"], ""),
        href: fields::href(action, &["href", "url", "link"]),
    }
}

fn map_hero(group: &Value) -> Hero {
    Hero {
        heading: fields::text(group, &["heading", "title", "headline"], ""),
        subheading: fields::text(group, &["subheading", "subtitle", "description"], ""),
        primary_action: map_action(group, &["primary_action", "primary_cta", "cta"]),
        secondary_action: map_action(group, &["secondary_action", "secondary_cta"]),
        highlights: fields::string_list(group, &["highlights", "bullets", "points"]),
    }
}

fn map_features(group: &Value) -> Vec<FeatureCard> {
    fields::expanded(group, &["items", "cards", "list"])
        .into_iter()
        .map(|item| FeatureCard {
            icon: fields::icon(item, &["icon", "icon_name"], DEFAULT_ICON),
            title: fields::text(item, &["title", "heading", "name"], ""),
            description: fields::text(item, &["description", "text", "body"], ""),
        })
        .collect()
}

fn map_benefits(group: &Value) -> Vec<Benefit> {
    fields::expanded(group, &["items", "list"])
        .into_iter()
        .map(|item| Benefit {
            title: fields::text(item, &["title", "heading"], ""),
            description: fields::text(item, &["description", "text", "body"], ""),
            image: fields::text(item, &["image.url", "image", "icon"], ""),
        })
        .collect()
}

fn map_testimonials(group: &Value) -> Vec<Testimonial> {
    fields::expanded(group, &["items", "quotes", "list"])
        .into_iter()
        .map(|item| Testimonial {
            quote: fields::text(item, &["quote", "text", "body"], ""),
            author: fields::text(item, &["author", "name"], ""),
            role: fields::text(item, &["role", "title", "company"], ""),
            rating: fields::rating(item, &["rating", "stars"]),
        })
        .collect()
}

fn map_pricing(group: &Value) -> Pricing {
    Pricing {
        heading: fields::text(group, &["heading", "title"], ""),
        subheading: fields::text(group, &["subheading", "subtitle", "description"], ""),
        plans: fields::expanded(group, &["plans", "items", "tiers"])
            .into_iter()
            .map(map_plan)
            .collect(),
    }
}

fn map_plan(item: &Value) -> Plan {
    Plan {
        name: fields::text(item, &["name", "title"], ""),
        price: fields::text(item, &["price", "amount"], ""),
        period: fields::text(item, &["period", "interval"], ""),
        description: fields::text(item, &["description", "text"], ""),
        features: fields::string_list(item, &["features", "bullets", "includes"]),
        action: map_action(item, &["action", "cta", "button"]),
        featured: fields::flag(item, &["featured", "highlighted", "popular"], false),
    }
}

fn map_cta(group: &Value) -> CallToAction {
    CallToAction {
        heading: fields::text(group, &["heading", "title"], ""),
        subheading: fields::text(group, &["subheading", "subtitle", "description"], ""),
        action: map_action(group, &["action", "cta", "button"]),
    }
}

fn map_footer(group: &Value) -> Footer {
    Footer {
        brand: fields::text(group, &["brand", "title"], ""),
        tagline: fields::text(group, &["tagline", "description"], ""),
        columns: fields::expanded(group, &["columns", "link_groups"])
            .into_iter()
            .map(|column| FooterColumn {
                heading: fields::text(column, &["heading", "title"], ""),
                links: fields::expanded(column, &["links", "items"])
                    .into_iter()
                    .map(map_nav_link)
                    .collect(),
            })
            .collect(),
        copyright: fields::text(group, &["copyright", "legal"], ""),
    }
}

// =============================================================================
// Tests
// =============================================================================
