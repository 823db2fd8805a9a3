use std::cell::RefCell;
use std::collections::BTreeMap;

use common::{Item, ItemKind, ProgramFlags, User};

use crate::store::{
    item_matches, GenreIndex, GenreQuery, ItemQuery, ItemStore, NamedId, QueryResult, UserStore,
};
use crate::LibraryError;

pub fn types(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub fn item(id: &str, kind: ItemKind) -> Item {
    Item {
        id: id.to_string(),
        parent_id: None,
        kind,
        name: id.to_string(),
        production_year: None,
        genres: Vec::new(),
        tags: Vec::new(),
        official_rating: None,
        program: ProgramFlags::default(),
        linked_children: Vec::new(),
    }
}

fn child(id: &str, parent: &str, kind: ItemKind) -> Item {
    let mut value = item(id, kind);
    value.parent_id = Some(parent.to_string());
    value
}

pub struct FakeStore {
    items: BTreeMap<String, Item>,
    users: BTreeMap<String, User>,
    scans: RefCell<Vec<(String, ItemQuery)>>,
}

impl FakeStore {
    /// root
    /// ├─ movies (CollectionFolder): m1, m2, shelf (Folder): m3
    /// └─ music (CollectionFolder): album (MusicAlbum): track
    /// u1-root
    /// └─ u1-view (UserView): m4
    pub fn sample() -> Self {
        let mut m1 = child("m1", "movies", ItemKind::Movie);
        m1.production_year = Some(2001);
        m1.genres = vec!["Action".to_string()];
        m1.tags = vec!["Heist".to_string()];
        m1.official_rating = Some("PG-13".to_string());
        let mut m2 = child("m2", "movies", ItemKind::Movie);
        m2.production_year = Some(2001);
        m2.genres = vec!["action".to_string()];
        m2.official_rating = Some("pg-13".to_string());
        let mut m3 = child("m3", "shelf", ItemKind::Movie);
        m3.production_year = Some(-1);
        m3.tags = vec!["Noir".to_string()];
        m3.official_rating = Some("R".to_string());
        let mut m4 = child("m4", "u1-view", ItemKind::Movie);
        m4.production_year = Some(2015);
        m4.genres = vec!["Drama".to_string()];
        let mut album = child("album", "music", ItemKind::MusicAlbum);
        album.genres = vec!["Jazz".to_string()];
        let mut track = child("track", "album", ItemKind::Audio);
        track.genres = vec!["Jazz".to_string()];

        let items = vec![
            item("root", ItemKind::AggregateFolder),
            child("movies", "root", ItemKind::CollectionFolder),
            child("shelf", "movies", ItemKind::Folder),
            child("music", "root", ItemKind::CollectionFolder),
            item("u1-root", ItemKind::UserRootFolder),
            child("u1-view", "u1-root", ItemKind::UserView),
            m1,
            m2,
            m3,
            m4,
            album,
            track,
        ];
        let user = User {
            id: "u1".to_string(),
            name: "alice".to_string(),
            root_id: "u1-root".to_string(),
            blocked_tags: Vec::new(),
        };

        Self {
            items: items
                .into_iter()
                .map(|item| (item.id.clone(), item))
                .collect(),
            users: [(user.id.clone(), user)].into_iter().collect(),
            scans: RefCell::new(Vec::new()),
        }
    }

    pub fn user(&self, id: &str) -> User {
        self.users[id].clone()
    }

    pub fn scans(&self) -> Vec<(String, ItemQuery)> {
        self.scans.borrow().clone()
    }

    fn descendants(&self, parent_id: &str, recursive: bool, out: &mut Vec<Item>) {
        for item in self.items.values() {
            if item.parent_id.as_deref() == Some(parent_id) {
                out.push(item.clone());
                if recursive {
                    self.descendants(&item.id, recursive, out);
                }
            }
        }
    }
}

impl ItemStore for FakeStore {
    fn get_item_by_id(&self, id: &str) -> Result<Option<Item>, LibraryError> {
        Ok(self.items.get(id).cloned())
    }

    fn root_container(&self) -> Result<Item, LibraryError> {
        Ok(self.items["root"].clone())
    }

    fn user_root_container(&self, user: &User) -> Result<Item, LibraryError> {
        self.items
            .get(&user.root_id)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound(user.root_id.clone()))
    }

    fn list_items_recursive(
        &self,
        container: &Item,
        query: &ItemQuery,
    ) -> Result<QueryResult, LibraryError> {
        self.scans
            .borrow_mut()
            .push((container.id.clone(), query.clone()));
        let mut found = Vec::new();
        self.descendants(&container.id, query.recursive, &mut found);
        found.retain(|item| {
            item_matches(
                item,
                &query.include_item_types,
                &query.predicates,
                query.user.as_ref(),
            )
        });
        Ok(QueryResult {
            items: found,
            total_record_count: None,
        })
    }
}

impl UserStore for FakeStore {
    fn get_user_by_id(&self, id: &str) -> Result<Option<User>, LibraryError> {
        Ok(self.users.get(id).cloned())
    }
}

pub struct FakeGenreIndex {
    entries: Vec<NamedId>,
    calls: RefCell<Vec<GenreQuery>>,
}

impl FakeGenreIndex {
    pub fn generic() -> Self {
        Self::with_entries(&[("Action", "genre-action"), ("Drama", "genre-drama")])
    }

    pub fn music() -> Self {
        Self::with_entries(&[("Jazz", "music-jazz")])
    }

    fn with_entries(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(name, id)| NamedId {
                    name: name.to_string(),
                    id: id.to_string(),
                })
                .collect(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<GenreQuery> {
        self.calls.borrow().clone()
    }
}

impl GenreIndex for FakeGenreIndex {
    fn query_genres(&self, query: &GenreQuery) -> Result<Vec<NamedId>, LibraryError> {
        self.calls.borrow_mut().push(query.clone());
        Ok(self.entries.clone())
    }
}
