//! Filter facets for browse UIs.
//!
//! Two entry points share scope resolution. [`FilterService::legacy_filters`]
//! scans every matching item under the scope and folds years, genres, tags and
//! ratings into distinct sorted lists. [`FilterService::genre_filters`] builds
//! an ancestor- or parent-scoped query and routes it to the generic or music
//! genre index.

mod indexed;
mod legacy;
mod scope;

#[cfg(test)]
pub(crate) mod fakes;

use common::User;
use serde::Serialize;
use tracing::debug;

use crate::store::{ContentPredicates, GenreIndex, ItemStore, NamedId, UserStore};
use crate::LibraryError;

pub use indexed::{genre_query, item_scope, uses_music_genres};
pub use legacy::{aggregate_facets, legacy_query, LegacyFilters};
pub use scope::{forces_global_scope, resolve_scope, ResolvedScope};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterRequest {
    pub user_id: Option<String>,
    pub parent_id: Option<String>,
    pub include_item_types: Vec<String>,
    pub recursive: Option<bool>,
    pub predicates: ContentPredicates,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryFilters {
    pub genres: Vec<NamedId>,
}

#[derive(Debug)]
pub enum FilterError {
    Library(LibraryError),
    NotAContainer(String),
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::Library(err) => write!(f, "library error: {}", err),
            FilterError::NotAContainer(id) => {
                write!(f, "item {} cannot be scanned as a container", id)
            }
        }
    }
}

impl std::error::Error for FilterError {}

impl From<LibraryError> for FilterError {
    fn from(err: LibraryError) -> Self {
        FilterError::Library(err)
    }
}

pub struct FilterService<'a> {
    items: &'a dyn ItemStore,
    users: &'a dyn UserStore,
    genres: &'a dyn GenreIndex,
    music_genres: &'a dyn GenreIndex,
}

impl<'a> FilterService<'a> {
    pub fn new(
        items: &'a dyn ItemStore,
        users: &'a dyn UserStore,
        genres: &'a dyn GenreIndex,
        music_genres: &'a dyn GenreIndex,
    ) -> Self {
        Self {
            items,
            users,
            genres,
            music_genres,
        }
    }

    pub fn legacy_filters(&self, request: &FilterRequest) -> Result<LegacyFilters, FilterError> {
        let user = self.resolve_user(request.user_id.as_deref())?;
        let scope = resolve_scope(
            self.items,
            request.parent_id.as_deref(),
            user.as_ref(),
            &request.include_item_types,
        )?;

        let root = match scope.parent {
            Some(item) => item,
            None => match &user {
                Some(user) => self.items.user_root_container(user)?,
                None => self.items.root_container()?,
            },
        };
        if !root.is_container() {
            return Err(FilterError::NotAContainer(root.id));
        }

        let query = legacy_query(request, user.as_ref());
        let result = self.items.list_items_recursive(&root, &query)?;
        let filters = aggregate_facets(&result.items);
        debug!(
            root = %root.id,
            scanned = result.items.len(),
            years = filters.years.len(),
            genres = filters.genres.len(),
            "Computed legacy filters"
        );
        Ok(filters)
    }

    pub fn genre_filters(&self, request: &FilterRequest) -> Result<QueryFilters, FilterError> {
        let user = self.resolve_user(request.user_id.as_deref())?;
        let scope = resolve_scope(
            self.items,
            request.parent_id.as_deref(),
            user.as_ref(),
            &request.include_item_types,
        )?;

        let query = genre_query(request, user.as_ref(), scope.parent.as_ref());
        let music = uses_music_genres(&request.include_item_types);
        let index = if music { self.music_genres } else { self.genres };
        let genres = index.query_genres(&query)?;
        debug!(
            music,
            scope = ?query.scope,
            genres = genres.len(),
            "Resolved genre filters"
        );
        Ok(QueryFilters { genres })
    }

    fn resolve_user(&self, user_id: Option<&str>) -> Result<Option<User>, LibraryError> {
        let Some(user_id) = scope::normalize_id(user_id) else {
            return Ok(None);
        };
        let user = self.users.get_user_by_id(user_id)?;
        if user.is_none() {
            debug!("User {} not found; filtering without a user", user_id);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{types, FakeGenreIndex, FakeStore};
    use super::{FilterError, FilterRequest, FilterService};
    use crate::store::{ContentPredicates, ItemScope, NamedId};

    fn request(item_types: &[&str]) -> FilterRequest {
        FilterRequest {
            include_item_types: types(item_types),
            ..FilterRequest::default()
        }
    }

    #[test]
    fn legacy_filters_scan_the_parent_recursively() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);

        let filters = service
            .legacy_filters(&FilterRequest {
                parent_id: Some("movies".to_string()),
                ..request(&["Movie"])
            })
            .unwrap();

        assert_eq!(filters.years, vec![2001]);
        assert_eq!(filters.genres, vec!["Action".to_string()]);
        assert_eq!(filters.tags, vec!["Heist".to_string(), "Noir".to_string()]);
        assert_eq!(filters.official_ratings, vec!["PG-13".to_string(), "R".to_string()]);

        let scans = store.scans();
        assert_eq!(scans.len(), 1);
        assert_eq!(scans[0].0, "movies");
        assert!(scans[0].1.recursive);
    }

    #[test]
    fn legacy_scan_receives_the_content_predicates() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);
        let request = FilterRequest {
            parent_id: Some("movies".to_string()),
            predicates: ContentPredicates {
                is_sports: Some(false),
                is_news: Some(false),
                ..ContentPredicates::default()
            },
            ..request(&["Movie"])
        };

        let filters = service.legacy_filters(&request).unwrap();
        assert_eq!(filters.years, vec![2001]);
        let scans = store.scans();
        assert_eq!(scans[0].1.predicates, request.predicates);

        let sports_only = FilterRequest {
            predicates: ContentPredicates {
                is_sports: Some(true),
                ..ContentPredicates::default()
            },
            ..request
        };
        let filters = service.legacy_filters(&sports_only).unwrap();
        assert!(filters.years.is_empty());
        assert_eq!(store.scans()[1].1.predicates, sports_only.predicates);
    }

    #[test]
    fn legacy_override_type_falls_back_to_library_root() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);

        service
            .legacy_filters(&FilterRequest {
                parent_id: Some("movies".to_string()),
                ..request(&["boxset"])
            })
            .unwrap();
        assert_eq!(store.scans()[0].0, "root");
    }

    #[test]
    fn legacy_unknown_parent_falls_back_to_user_root() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);

        let filters = service
            .legacy_filters(&FilterRequest {
                user_id: Some("u1".to_string()),
                parent_id: Some("missing".to_string()),
                ..request(&["Movie"])
            })
            .unwrap();
        assert_eq!(store.scans()[0].0, "u1-root");
        assert_eq!(filters.genres, vec!["Drama".to_string()]);
    }

    #[test]
    fn legacy_rejects_a_leaf_root() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);

        let err = service
            .legacy_filters(&FilterRequest {
                parent_id: Some("m1".to_string()),
                ..request(&["Movie"])
            })
            .unwrap_err();
        assert!(matches!(err, FilterError::NotAContainer(id) if id == "m1"));
        assert!(store.scans().is_empty());
    }

    #[test]
    fn unknown_user_is_ignored() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);

        service
            .legacy_filters(&FilterRequest {
                user_id: Some("ghost".to_string()),
                ..request(&["Movie"])
            })
            .unwrap();
        let scans = store.scans();
        assert_eq!(scans[0].0, "root");
        assert!(scans[0].1.user.is_none());
    }

    #[test]
    fn library_wide_movies_use_an_unconstrained_ancestor_query() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);

        service.genre_filters(&request(&["Movie"])).unwrap();
        let calls = genres.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].scope, ItemScope::Ancestor(None));
        assert!(music.calls().is_empty());
    }

    #[test]
    fn override_type_without_parent_is_library_wide() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);

        service
            .genre_filters(&FilterRequest {
                parent_id: Some("shelf".to_string()),
                recursive: Some(false),
                ..request(&["Trailer"])
            })
            .unwrap();
        assert_eq!(genres.calls()[0].scope, ItemScope::Ancestor(None));
    }

    #[test]
    fn plain_folder_non_recursive_scopes_by_direct_parent() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);

        service
            .genre_filters(&FilterRequest {
                parent_id: Some("shelf".to_string()),
                recursive: Some(false),
                ..request(&["Movie"])
            })
            .unwrap();
        assert_eq!(
            genres.calls()[0].scope,
            ItemScope::Parent(Some("shelf".to_string()))
        );
    }

    #[test]
    fn audio_goes_to_the_music_index_only() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);

        let filters = service.genre_filters(&request(&["Audio"])).unwrap();
        assert_eq!(music.calls().len(), 1);
        assert!(genres.calls().is_empty());
        assert_eq!(
            filters.genres,
            vec![NamedId {
                name: "Jazz".to_string(),
                id: "music-jazz".to_string(),
            }]
        );
    }

    #[test]
    fn repeated_calls_are_identical() {
        let store = FakeStore::sample();
        let (genres, music) = (FakeGenreIndex::generic(), FakeGenreIndex::music());
        let service = FilterService::new(&store, &store, &genres, &music);
        let request = FilterRequest {
            parent_id: Some("movies".to_string()),
            ..request(&["Movie"])
        };

        assert_eq!(
            service.legacy_filters(&request).unwrap(),
            service.legacy_filters(&request).unwrap()
        );
        assert_eq!(
            service.genre_filters(&request).unwrap(),
            service.genre_filters(&request).unwrap()
        );
    }
}
