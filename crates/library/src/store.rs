use common::{Item, ProgramFlags, User};
use serde::{Deserialize, Serialize};

use crate::LibraryError;

/// Detail fields the store hydrates on returned items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItemFields {
    pub genres: bool,
    pub tags: bool,
}

impl ItemFields {
    pub const NONE: ItemFields = ItemFields {
        genres: false,
        tags: false,
    };

    pub const GENRES_AND_TAGS: ItemFields = ItemFields {
        genres: true,
        tags: true,
    };
}

/// Tri-state content filters; `None` leaves the dimension unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentPredicates {
    pub is_airing: Option<bool>,
    pub is_movie: Option<bool>,
    pub is_sports: Option<bool>,
    pub is_kids: Option<bool>,
    pub is_news: Option<bool>,
    pub is_series: Option<bool>,
}

impl ContentPredicates {
    pub fn matches(&self, flags: &ProgramFlags) -> bool {
        let checks = [
            (self.is_airing, flags.airing),
            (self.is_movie, flags.movie),
            (self.is_sports, flags.sports),
            (self.is_kids, flags.kids),
            (self.is_news, flags.news),
            (self.is_series, flags.series),
        ];
        checks
            .iter()
            .all(|(wanted, actual)| wanted.map_or(true, |wanted| wanted == *actual))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemScope {
    /// Every descendant of the ancestor; `None` spans the whole library.
    Ancestor(Option<String>),
    /// Immediate children of the parent; `None` applies no parent constraint.
    Parent(Option<String>),
}

#[derive(Clone, Debug, Default)]
pub struct ItemQuery {
    pub user: Option<User>,
    pub include_item_types: Vec<String>,
    pub predicates: ContentPredicates,
    pub recursive: bool,
    pub enable_total_count: bool,
    pub fields: ItemFields,
}

#[derive(Clone, Debug)]
pub struct GenreQuery {
    pub user: Option<User>,
    pub include_item_types: Vec<String>,
    pub predicates: ContentPredicates,
    pub scope: ItemScope,
    pub fields: ItemFields,
}

#[derive(Clone, Debug, Default)]
pub struct QueryResult {
    pub items: Vec<Item>,
    pub total_record_count: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamedId {
    pub name: String,
    pub id: String,
}

pub trait ItemStore {
    fn get_item_by_id(&self, id: &str) -> Result<Option<Item>, LibraryError>;

    fn root_container(&self) -> Result<Item, LibraryError>;

    fn user_root_container(&self, user: &User) -> Result<Item, LibraryError>;

    fn list_items_recursive(
        &self,
        container: &Item,
        query: &ItemQuery,
    ) -> Result<QueryResult, LibraryError>;
}

/// A genre index answers with entries already deduplicated and ordered by name.
pub trait GenreIndex {
    fn query_genres(&self, query: &GenreQuery) -> Result<Vec<NamedId>, LibraryError>;
}

pub trait UserStore {
    fn get_user_by_id(&self, id: &str) -> Result<Option<User>, LibraryError>;
}

/// Shared item filter used by every store listing: type names, content
/// predicates and the viewing user's blocked tags.
pub fn item_matches(
    item: &Item,
    include_item_types: &[String],
    predicates: &ContentPredicates,
    user: Option<&User>,
) -> bool {
    if !include_item_types.is_empty()
        && !include_item_types
            .iter()
            .any(|name| item.kind.matches_name(name))
    {
        return false;
    }
    if !predicates.matches(&item.program) {
        return false;
    }
    match user {
        Some(user) => !user.blocks(item),
        None => true,
    }
}
