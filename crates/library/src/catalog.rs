use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use common::{stable_id, Item, ItemKind, User};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::NamedId;
use crate::{
    child_key, clear_table, encode_value, genre_key, genre_name_key, GenreFamily, Library,
    LibraryError, LibraryStats, CHILDREN_TABLE, GENRES_BY_NAME_TABLE, INDEX_VERSION, ITEMS_TABLE,
    META_ROOT_KEY, META_STATS_KEY, META_TABLE, META_VERSION_KEY, MUSIC_GENRES_BY_NAME_TABLE,
    USERS_TABLE,
};

/// Snapshot of a media library as exchanged with the import tool.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub users: Vec<User>,
    pub items: Vec<Item>,
}

impl Catalog {
    pub fn from_path(path: &Path) -> Result<Self, LibraryError> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn clean(&mut self) {
        for item in &mut self.items {
            item.genres = clean_labels(&item.genres);
            item.tags = clean_labels(&item.tags);
            if let Some(rating) = &item.official_rating {
                if rating.trim().is_empty() {
                    item.official_rating = None;
                }
            }
        }
    }

    /// Checks ids and references; returns the id of the library root.
    fn validate(&self) -> Result<String, LibraryError> {
        let mut ids = HashSet::new();
        for item in &self.items {
            if item.id.trim().is_empty() {
                return Err(LibraryError::Catalog(format!("item {:?} has no id", item.name)));
            }
            if !ids.insert(item.id.as_str()) {
                return Err(LibraryError::Catalog(format!("duplicate item id {}", item.id)));
            }
        }

        let roots: Vec<&Item> = self
            .items
            .iter()
            .filter(|item| item.kind == ItemKind::AggregateFolder)
            .collect();
        let root = match roots.as_slice() {
            [root] => root,
            [] => return Err(LibraryError::Catalog("missing library root".to_string())),
            _ => return Err(LibraryError::Catalog("more than one library root".to_string())),
        };
        if root.parent_id.is_some() {
            return Err(LibraryError::Catalog("library root cannot have a parent".to_string()));
        }

        for item in &self.items {
            let references = item.parent_id.iter().chain(item.linked_children.iter());
            for reference in references {
                if !ids.contains(reference.as_str()) {
                    return Err(LibraryError::Catalog(format!(
                        "item {} references missing item {}",
                        item.id, reference
                    )));
                }
            }
        }

        let mut user_ids = HashSet::new();
        for user in &self.users {
            if !user_ids.insert(user.id.as_str()) {
                return Err(LibraryError::Catalog(format!("duplicate user id {}", user.id)));
            }
            if !ids.contains(user.root_id.as_str()) {
                return Err(LibraryError::Catalog(format!(
                    "user {} has missing root {}",
                    user.id, user.root_id
                )));
            }
        }

        Ok(root.id.clone())
    }
}

impl Library {
    pub fn import_catalog(&self, path: &Path) -> Result<LibraryStats, LibraryError> {
        let catalog = Catalog::from_path(path)?;
        info!(
            "Read catalog {:?}: {} items, {} users",
            path,
            catalog.items.len(),
            catalog.users.len()
        );
        self.import(catalog)
    }

    /// Replaces the whole index with the catalog in one write transaction.
    pub fn import(&self, mut catalog: Catalog) -> Result<LibraryStats, LibraryError> {
        catalog.clean();
        let root_id = catalog.validate()?;

        let mut genres: BTreeMap<String, NamedId> = BTreeMap::new();
        let mut music_genres: BTreeMap<String, NamedId> = BTreeMap::new();
        for item in &catalog.items {
            let family = GenreFamily::of(item);
            let target = match family {
                GenreFamily::Generic => &mut genres,
                GenreFamily::Music => &mut music_genres,
            };
            for genre in &item.genres {
                let key = genre_key(genre);
                target.entry(key.clone()).or_insert_with(|| NamedId {
                    name: genre.clone(),
                    id: stable_id(&format!("{}{}", family.id_prefix(), key)),
                });
            }
        }

        let stats = LibraryStats {
            items: catalog.items.len(),
            users: catalog.users.len(),
            genres: genres.len(),
            music_genres: music_genres.len(),
        };

        let write_txn = self.db.begin_write()?;
        clear_table(&write_txn, META_TABLE)?;
        clear_table(&write_txn, ITEMS_TABLE)?;
        clear_table(&write_txn, CHILDREN_TABLE)?;
        clear_table(&write_txn, USERS_TABLE)?;
        clear_table(&write_txn, GENRES_BY_NAME_TABLE)?;
        clear_table(&write_txn, MUSIC_GENRES_BY_NAME_TABLE)?;
        {
            let mut item_table = write_txn.open_table(ITEMS_TABLE)?;
            let mut children_table = write_txn.open_table(CHILDREN_TABLE)?;
            for item in &catalog.items {
                let bytes = encode_value(item)?;
                item_table.insert(item.id.as_str(), bytes.as_slice())?;
                if let Some(parent_id) = &item.parent_id {
                    children_table.insert(child_key(parent_id, &item.id).as_str(), &[][..])?;
                }
                for linked in &item.linked_children {
                    children_table.insert(child_key(&item.id, linked).as_str(), &[][..])?;
                }
            }

            let mut user_table = write_txn.open_table(USERS_TABLE)?;
            for user in &catalog.users {
                let bytes = encode_value(user)?;
                user_table.insert(user.id.as_str(), bytes.as_slice())?;
            }

            let tables = [
                (GENRES_BY_NAME_TABLE, &genres),
                (MUSIC_GENRES_BY_NAME_TABLE, &music_genres),
            ];
            for (definition, entries) in tables {
                let mut table = write_txn.open_table(definition)?;
                for (key, genre) in entries {
                    let bytes = encode_value(genre)?;
                    table.insert(genre_name_key(key, &genre.id).as_str(), bytes.as_slice())?;
                }
            }

            let mut meta_table = write_txn.open_table(META_TABLE)?;
            let version_bytes = encode_value(&INDEX_VERSION)?;
            meta_table.insert(META_VERSION_KEY, version_bytes.as_slice())?;
            let stats_bytes = encode_value(&stats)?;
            meta_table.insert(META_STATS_KEY, stats_bytes.as_slice())?;
            let root_bytes = encode_value(&root_id)?;
            meta_table.insert(META_ROOT_KEY, root_bytes.as_slice())?;
        }
        write_txn.commit()?;

        info!(
            "Imported {} items, {} users, {} genres, {} music genres",
            stats.items, stats.users, stats.genres, stats.music_genres
        );
        Ok(stats)
    }
}

fn clean_labels(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
