use std::collections::{BTreeSet, HashSet};

use common::{Item, User};
use serde::Serialize;

use crate::filters::FilterRequest;
use crate::store::{ItemFields, ItemQuery};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyFilters {
    pub years: Vec<i32>,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub official_ratings: Vec<String>,
}

/// Membership-only scan: always recursive, no counts, genres and tags only.
pub fn legacy_query(request: &FilterRequest, user: Option<&User>) -> ItemQuery {
    ItemQuery {
        user: user.cloned(),
        include_item_types: request.include_item_types.clone(),
        predicates: request.predicates.clone(),
        recursive: true,
        enable_total_count: false,
        fields: ItemFields::GENRES_AND_TAGS,
    }
}

pub fn aggregate_facets(items: &[Item]) -> LegacyFilters {
    let mut years = BTreeSet::new();
    let mut genres = DistinctStrings::default();
    let mut tags = DistinctStrings::default();
    let mut ratings = DistinctStrings::default();

    for item in items {
        if let Some(year) = item.production_year.filter(|year| *year > 0) {
            years.insert(year);
        }
        for genre in &item.genres {
            genres.push(genre);
        }
        for tag in &item.tags {
            tags.push(tag);
        }
        if let Some(rating) = item.official_rating.as_deref() {
            if !rating.trim().is_empty() {
                ratings.push(rating);
            }
        }
    }

    LegacyFilters {
        years: years.into_iter().collect(),
        genres: genres.into_sorted(),
        tags: tags.into_sorted(),
        official_ratings: ratings.into_sorted(),
    }
}

/// Case-insensitive set that keeps the first spelling it sees.
#[derive(Default)]
struct DistinctStrings {
    seen: HashSet<String>,
    values: Vec<String>,
}

impl DistinctStrings {
    fn push(&mut self, value: &str) {
        if self.seen.insert(value.to_lowercase()) {
            self.values.push(value.to_string());
        }
    }

    fn into_sorted(mut self) -> Vec<String> {
        self.values.sort();
        self.values
    }
}
