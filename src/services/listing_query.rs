// Listing browse filter and pagination
// `ListingFilter` is an explicit value; `active_listings_query` is the only place that turns
// it into SQL and `ListingFilter::matches` is its in-memory twin.

use diesel::pg::Pg;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::category::CategoryRef;
use crate::models::listing::{Condition, Listing, ListingStatus};
use crate::schema::listings;
use crate::utils::validation::trim_optional_field;

// =============================================================================
// FILTER
// =============================================================================

/// Browse filter over active listings; every predicate is optional and independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingFilter {
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub condition: Option<Condition>,
    pub country: Option<String>,
    /// Only applied together with `country`
    pub city: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ListingFilter {
    /// Pattern for ILIKE with the user's own `%`, `_` and `\` matched literally
    fn search_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|search| {
            let mut escaped = String::with_capacity(search.len() + 2);
            for ch in search.chars() {
                if matches!(ch, '%' | '_' | '\\') {
                    escaped.push('\\');
                }
                escaped.push(ch);
            }
            format!("%{}%", escaped)
        })
    }

    /// Same semantics as `active_listings_query`, evaluated against one row.
    pub fn matches(&self, listing: &Listing) -> bool {
        if listing.status != ListingStatus::Active {
            return false;
        }

        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            if !listing.title.to_lowercase().contains(&needle)
                && !listing.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if self.category_id.is_some_and(|id| listing.category_id != id) {
            return false;
        }

        if self.condition.is_some_and(|condition| listing.condition != condition) {
            return false;
        }

        if let Some(ref country) = self.country {
            if &listing.country != country {
                return false;
            }
            if self.city.as_ref().is_some_and(|city| &listing.city != city) {
                return false;
            }
        }

        if self.min_price.is_some_and(|min| listing.price < min) {
            return false;
        }

        if self.max_price.is_some_and(|max| listing.price > max) {
            return false;
        }

        true
    }
}

/// Active-only base scope with every filter predicate applied.
pub fn active_listings_query(filter: &ListingFilter) -> listings::BoxedQuery<'static, Pg> {
    let mut query = listings::table
        .filter(listings::status.eq(ListingStatus::Active))
        .into_boxed();

    if let Some(pattern) = filter.search_pattern() {
        query = query.filter(
            listings::title
                .ilike(pattern.clone())
                .or(listings::description.ilike(pattern)),
        );
    }

    if let Some(category_id) = filter.category_id {
        query = query.filter(listings::category_id.eq(category_id));
    }

    if let Some(condition) = filter.condition {
        query = query.filter(listings::condition.eq(condition));
    }

    if let Some(ref country) = filter.country {
        query = query.filter(listings::country.eq(country.clone()));

        if let Some(ref city) = filter.city {
            query = query.filter(listings::city.eq(city.clone()));
        }
    }

    if let Some(min_price) = filter.min_price {
        query = query.filter(listings::price.ge(min_price));
    }

    if let Some(max_price) = filter.max_price {
        query = query.filter(listings::price.le(max_price));
    }

    query
}

/// Newest first, ties broken by id so pages are stable
pub fn sort_newest_first(listings: &mut [Listing]) {
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

// =============================================================================
// QUERY STRING
// =============================================================================

/// Raw browse query string; blank values count as absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
#[schema(example = json!({
    "search": "kart",
    "category": "go-karts",
    "condition": "used",
    "country": "Bulgaria",
    "city": "Sofia",
    "min_price": "100",
    "max_price": "500",
    "page": "2"
}))]
pub struct ListingQueryParams {
    pub search: Option<String>,
    /// Category UUID or slug
    pub category: Option<String>,
    pub condition: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub page: Option<String>,
}

/// Parsed query string before the category reference is resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedListingQuery {
    pub filter: ListingFilter,
    pub category: Option<CategoryRef>,
    pub page: i64,
}

impl ListingQueryParams {
    pub fn parse(&self) -> Result<ParsedListingQuery, String> {
        let parse_price = |name: &str, raw: Option<&String>| -> Result<Option<Decimal>, String> {
            match trim_optional_field(raw) {
                None => Ok(None),
                Some(value) => Decimal::from_str(&value)
                    .map(Some)
                    .map_err(|_| format!("{} must be a number", name)),
            }
        };

        let condition = match trim_optional_field(self.condition.as_ref()) {
            None => None,
            Some(value) => Some(Condition::from_str(&value.to_lowercase())?),
        };

        let category = match trim_optional_field(self.category.as_ref()) {
            None => None,
            Some(value) => Some(
                CategoryRef::parse(&value).ok_or_else(|| format!("Invalid category: {}", value))?,
            ),
        };

        let filter = ListingFilter {
            search: trim_optional_field(self.search.as_ref()),
            category_id: None,
            condition,
            country: trim_optional_field(self.country.as_ref()),
            city: trim_optional_field(self.city.as_ref()),
            min_price: parse_price("min_price", self.min_price.as_ref())?,
            max_price: parse_price("max_price", self.max_price.as_ref())?,
        };

        // Unparseable or out-of-range pages fall back to the first page
        let page = trim_optional_field(self.page.as_ref())
            .and_then(|p| p.parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        Ok(ParsedListingQuery {
            filter,
            category,
            page,
        })
    }

    /// Filter values with blanks dropped and no page, echoed back to clients
    pub fn applied_filters(&self) -> Self {
        let trimmed = |value: &Option<String>| trim_optional_field(value.as_ref());

        Self {
            search: trimmed(&self.search),
            category: trimmed(&self.category),
            condition: trimmed(&self.condition),
            country: trimmed(&self.country),
            city: trimmed(&self.city),
            min_price: trimmed(&self.min_price),
            max_price: trimmed(&self.max_price),
            page: None,
        }
    }

    /// Non-empty filter parameters in a stable order, for page links
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("search", &self.search),
            ("category", &self.category),
            ("condition", &self.condition),
            ("country", &self.country),
            ("city", &self.city),
            ("min_price", &self.min_price),
            ("max_price", &self.max_price),
        ]
        .into_iter()
        .filter_map(|(key, value)| trim_optional_field(value.as_ref()).map(|v| (key, v)))
        .collect()
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Pages past the last representable offset are clamped to it
    pub fn new(page: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);

        Self {
            page: page.clamp(1, i64::MAX / per_page),
            per_page,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "total": 30,
    "page": 2,
    "per_page": 12,
    "total_pages": 3,
    "prev_page_url": "/v1/listings?search=kart&page=1",
    "next_page_url": "/v1/listings?search=kart&page=3"
}))]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
    pub prev_page_url: Option<String>,
    pub next_page_url: Option<String>,
}

impl Pagination {
    /// Page metadata whose links keep `query` and only swap the page number
    pub fn new(
        total: i64,
        request: &PageRequest,
        base_path: &str,
        query: &[(&'static str, String)],
    ) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            (total + request.per_page - 1) / request.per_page
        };

        let link = |page: i64| -> String {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in query {
                serializer.append_pair(key, value);
            }
            serializer.append_pair("page", &page.to_string());
            format!("{}?{}", base_path, serializer.finish())
        };

        Self {
            total,
            page: request.page,
            per_page: request.per_page,
            total_pages,
            prev_page_url: (request.page > 1).then(|| link(request.page - 1)),
            next_page_url: (request.page < total_pages).then(|| link(request.page + 1)),
        }
    }
}
