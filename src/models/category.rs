use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::categories;

lazy_static! {
    static ref CATEGORY_SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Seeded category set as `(id, name, slug)`; mirrors the categories migration.
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a01", "Go-Karts", "go-karts"),
    ("0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a02", "Engines", "engines"),
    ("0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a03", "Chassis", "chassis"),
    ("0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a04", "Wheels & Tires", "wheels-tires"),
    ("0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a05", "Safety Gear", "safety-gear"),
    ("0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a06", "Parts & Accessories", "parts-accessories"),
    ("0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a07", "Tools & Equipment", "tools-equipment"),
    ("0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a08", "Consumables", "consumables"),
];

#[derive(
    Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize, Deserialize, ToSchema,
)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[schema(example = json!({
    "id": "0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a01",
    "name": "Go-Karts",
    "slug": "go-karts",
    "created_at": "2025-01-10T12:00:00Z"
}))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl NewCategory {
    pub fn into_category(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
            slug: self.slug,
            created_at: self.created_at,
        }
    }
}

/// Builds the seeded categories; ids are fixed so both stores agree.
pub fn default_categories() -> Vec<NewCategory> {
    let now = Utc::now();
    DEFAULT_CATEGORIES
        .iter()
        .filter_map(|(id, name, slug)| {
            Uuid::parse_str(id).ok().map(|id| NewCategory {
                id,
                name: name.to_string(),
                slug: slug.to_string(),
                created_at: now,
            })
        })
        .collect()
}

/// A category reference from a query string: either a UUID or a slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRef {
    Id(Uuid),
    Slug(String),
}

impl CategoryRef {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(id) = Uuid::parse_str(raw) {
            return Some(CategoryRef::Id(id));
        }
        let slug = raw.to_lowercase();
        CATEGORY_SLUG_REGEX
            .is_match(&slug)
            .then_some(CategoryRef::Slug(slug))
    }
}
