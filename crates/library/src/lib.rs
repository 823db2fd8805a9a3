mod catalog;
pub mod filters;
pub mod store;

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{Item, User};
use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError, WriteTransaction,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use catalog::Catalog;
pub use filters::{FilterError, FilterRequest, FilterService, LegacyFilters, QueryFilters};
pub use store::{
    ContentPredicates, GenreIndex, GenreQuery, ItemFields, ItemQuery, ItemScope, ItemStore,
    NamedId, QueryResult, UserStore,
};

use store::item_matches;

const INDEX_VERSION: u32 = 1;
const KEY_SEP: char = '\x1f';

const META_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");
const ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("items");
const CHILDREN_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("children");
const USERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const GENRES_BY_NAME_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("genres_by_name");
const MUSIC_GENRES_BY_NAME_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("music_genres_by_name");

const META_VERSION_KEY: &str = "version";
const META_STATS_KEY: &str = "stats";
const META_ROOT_KEY: &str = "root";

#[derive(Clone)]
pub struct Library {
    db: Arc<Database>,
}

impl Library {
    pub fn load_or_import(
        db_path: &Path,
        catalog: Option<&Path>,
    ) -> Result<(Self, bool), LibraryError> {
        let db = open_or_create_db(db_path)?;
        Self::load_or_import_with_db(Arc::new(db), catalog)
    }

    /// Returns the library and whether the catalog was (re)imported.
    pub fn load_or_import_with_db(
        db: Arc<Database>,
        catalog: Option<&Path>,
    ) -> Result<(Self, bool), LibraryError> {
        let library = Self { db };
        let reason = match read_version(&library.db)? {
            Some(version) if version == INDEX_VERSION => {
                info!("Loaded index from existing database");
                return Ok((library, false));
            }
            Some(version) => format!("Index version mismatch ({})", version),
            None => "Index missing".to_string(),
        };

        match catalog {
            Some(path) => {
                warn!("{}; importing catalog {:?}", reason, path);
                library.import_catalog(path)?;
                Ok((library, true))
            }
            None => {
                warn!("{}; no catalog configured, library stays empty", reason);
                Ok((library, false))
            }
        }
    }

    /// Opens the index without checking its version or importing anything.
    pub fn open(db_path: &Path) -> Result<Self, LibraryError> {
        let db = open_or_create_db(db_path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn open_db(path: &Path) -> Result<Arc<Database>, LibraryError> {
        let db = open_or_create_db(path)?;
        Ok(Arc::new(db))
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Result<Self, LibraryError> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn stats(&self) -> Result<LibraryStats, LibraryError> {
        read_stats(&self.db)
    }

    pub fn genre_index(&self) -> GenreIndexReader {
        GenreIndexReader {
            db: Arc::clone(&self.db),
            family: GenreFamily::Generic,
        }
    }

    pub fn music_genre_index(&self) -> GenreIndexReader {
        GenreIndexReader {
            db: Arc::clone(&self.db),
            family: GenreFamily::Music,
        }
    }

    pub fn legacy_filters(&self, request: &FilterRequest) -> Result<LegacyFilters, FilterError> {
        let genres = self.genre_index();
        let music_genres = self.music_genre_index();
        FilterService::new(self, self, &genres, &music_genres).legacy_filters(request)
    }

    pub fn genre_filters(&self, request: &FilterRequest) -> Result<QueryFilters, FilterError> {
        let genres = self.genre_index();
        let music_genres = self.music_genre_index();
        FilterService::new(self, self, &genres, &music_genres).genre_filters(request)
    }
}

impl ItemStore for Library {
    fn get_item_by_id(&self, id: &str) -> Result<Option<Item>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let item_table = match read_txn.open_table(ITEMS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        read_item(&item_table, id)
    }

    fn root_container(&self) -> Result<Item, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let meta_table = match read_txn.open_table(META_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => {
                return Err(LibraryError::NotFound("library root".to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        let root_id: String = match meta_table.get(META_ROOT_KEY)? {
            Some(value) => decode_value(value.value())?,
            None => return Err(LibraryError::NotFound("library root".to_string())),
        };
        let item_table = read_txn.open_table(ITEMS_TABLE)?;
        read_item(&item_table, &root_id)?.ok_or(LibraryError::NotFound(root_id))
    }

    fn user_root_container(&self, user: &User) -> Result<Item, LibraryError> {
        self.get_item_by_id(&user.root_id)?
            .ok_or_else(|| LibraryError::NotFound(user.root_id.clone()))
    }

    fn list_items_recursive(
        &self,
        container: &Item,
        query: &ItemQuery,
    ) -> Result<QueryResult, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let item_table = read_txn.open_table(ITEMS_TABLE)?;
        let children_table = read_txn.open_table(CHILDREN_TABLE)?;

        let mut items = collect_descendants(
            &item_table,
            &children_table,
            &container.id,
            query.recursive,
        )?;
        items.retain(|item| {
            item_matches(
                item,
                &query.include_item_types,
                &query.predicates,
                query.user.as_ref(),
            )
        });
        for item in &mut items {
            hydrate_fields(item, query.fields);
        }

        let total_record_count = if query.enable_total_count {
            Some(items.len())
        } else {
            None
        };
        Ok(QueryResult {
            items,
            total_record_count,
        })
    }
}

impl UserStore for Library {
    fn get_user_by_id(&self, id: &str) -> Result<Option<User>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let user_table = match read_txn.open_table(USERS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let user = match user_table.get(id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(user)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenreFamily {
    Generic,
    Music,
}

impl GenreFamily {
    fn of(item: &Item) -> Self {
        if item.kind.is_music() {
            GenreFamily::Music
        } else {
            GenreFamily::Generic
        }
    }

    fn table(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match self {
            GenreFamily::Generic => GENRES_BY_NAME_TABLE,
            GenreFamily::Music => MUSIC_GENRES_BY_NAME_TABLE,
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            GenreFamily::Generic => "genre:",
            GenreFamily::Music => "musicgenre:",
        }
    }
}

/// Genre lookups for one family, ordered by the lower-cased name table.
#[derive(Clone)]
pub struct GenreIndexReader {
    db: Arc<Database>,
    family: GenreFamily,
}

impl GenreIndex for GenreIndexReader {
    fn query_genres(&self, query: &GenreQuery) -> Result<Vec<NamedId>, LibraryError> {
        let read_txn = self.db.begin_read()?;
        let item_table = read_txn.open_table(ITEMS_TABLE).map_err(missing_library)?;
        let children_table = read_txn.open_table(CHILDREN_TABLE).map_err(missing_library)?;
        let name_table = read_txn
            .open_table(self.family.table())
            .map_err(missing_library)?;

        let candidates = match &query.scope {
            ItemScope::Ancestor(Some(id)) => {
                collect_descendants(&item_table, &children_table, id, true)?
            }
            ItemScope::Parent(Some(id)) => {
                collect_descendants(&item_table, &children_table, id, false)?
            }
            ItemScope::Ancestor(None) | ItemScope::Parent(None) => {
                let mut items = Vec::new();
                for entry in item_table.iter()? {
                    let entry = entry?;
                    items.push(decode_value::<Item>(entry.1.value())?);
                }
                items
            }
        };

        let mut wanted = HashSet::new();
        for item in &candidates {
            if GenreFamily::of(item) != self.family {
                continue;
            }
            if !item_matches(
                item,
                &query.include_item_types,
                &query.predicates,
                query.user.as_ref(),
            ) {
                continue;
            }
            for genre in &item.genres {
                wanted.insert(genre_key(genre));
            }
        }
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let mut genres = Vec::new();
        for entry in name_table.iter()? {
            let entry = entry?;
            let (name_lower, _) = split_key_last(entry.0.value())?;
            if wanted.contains(name_lower) {
                genres.push(decode_value::<NamedId>(entry.1.value())?);
            }
        }
        Ok(genres)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub items: usize,
    pub users: usize,
    pub genres: usize,
    pub music_genres: usize,
}

#[derive(Debug)]
pub enum LibraryError {
    Io(std::io::Error),
    Redb(redb::Error),
    Bincode(Box<bincode::ErrorKind>),
    Json(serde_json::Error),
    KeyParse(String),
    NotFound(String),
    Catalog(String),
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::Io(err) => write!(f, "io error: {}", err),
            LibraryError::Redb(err) => write!(f, "db error: {}", err),
            LibraryError::Bincode(err) => write!(f, "bincode error: {}", err),
            LibraryError::Json(err) => write!(f, "json error: {}", err),
            LibraryError::KeyParse(value) => write!(f, "key parse error: {}", value),
            LibraryError::NotFound(value) => write!(f, "not found: {}", value),
            LibraryError::Catalog(value) => write!(f, "invalid catalog: {}", value),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err)
    }
}

impl From<redb::Error> for LibraryError {
    fn from(err: redb::Error) -> Self {
        LibraryError::Redb(err)
    }
}

impl From<DatabaseError> for LibraryError {
    fn from(err: DatabaseError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<TableError> for LibraryError {
    fn from(err: TableError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<TransactionError> for LibraryError {
    fn from(err: TransactionError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<StorageError> for LibraryError {
    fn from(err: StorageError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<CommitError> for LibraryError {
    fn from(err: CommitError) -> Self {
        LibraryError::Redb(err.into())
    }
}

impl From<Box<bincode::ErrorKind>> for LibraryError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        LibraryError::Bincode(err)
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Json(err)
    }
}

fn open_or_create_db(path: &Path) -> Result<Database, LibraryError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if path.exists() {
        Ok(Database::open(path)?)
    } else {
        Ok(Database::create(path)?)
    }
}

fn read_version(db: &Database) -> Result<Option<u32>, LibraryError> {
    let read_txn = db.begin_read()?;
    let table = match read_txn.open_table(META_TABLE) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let version = match table.get(META_VERSION_KEY)? {
        Some(value) => Some(decode_value(value.value())?),
        None => None,
    };
    Ok(version)
}

fn read_stats(db: &Database) -> Result<LibraryStats, LibraryError> {
    let read_txn = db.begin_read()?;
    let table = match read_txn.open_table(META_TABLE) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(LibraryStats::default()),
        Err(err) => return Err(err.into()),
    };
    let stats = match table.get(META_STATS_KEY)? {
        Some(value) => decode_value(value.value())?,
        None => LibraryStats::default(),
    };
    Ok(stats)
}

fn read_item<T>(item_table: &T, id: &str) -> Result<Option<Item>, LibraryError>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let item = match item_table.get(id)? {
        Some(value) => Some(decode_value(value.value())?),
        None => None,
    };
    Ok(item)
}

fn child_ids<T>(children_table: &T, parent_id: &str) -> Result<Vec<String>, LibraryError>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let prefix = prefix_key(parent_id);
    let mut end = prefix.clone();
    end.push('\u{10ffff}');
    let mut ids = Vec::new();
    for entry in children_table.range(prefix.as_str()..end.as_str())? {
        let entry = entry?;
        let (_, child_id) = split_key_last(entry.0.value())?;
        ids.push(child_id.to_string());
    }
    Ok(ids)
}

/// Breadth-first walk over parent and linked-child edges, each item at most once.
fn collect_descendants<I, C>(
    item_table: &I,
    children_table: &C,
    root_id: &str,
    recursive: bool,
) -> Result<Vec<Item>, LibraryError>
where
    I: ReadableTable<&'static str, &'static [u8]>,
    C: ReadableTable<&'static str, &'static [u8]>,
{
    let mut visited = HashSet::new();
    visited.insert(root_id.to_string());
    let mut queue = VecDeque::new();
    queue.push_back(root_id.to_string());
    let mut items = Vec::new();

    while let Some(parent_id) = queue.pop_front() {
        for child_id in child_ids(children_table, &parent_id)? {
            if !visited.insert(child_id.clone()) {
                continue;
            }
            let Some(item) = read_item(item_table, &child_id)? else {
                warn!("Dangling child {} under {}", child_id, parent_id);
                continue;
            };
            if recursive && item.is_container() {
                queue.push_back(child_id);
            }
            items.push(item);
        }
    }
    Ok(items)
}

/// Tables only exist once a catalog has been imported.
fn missing_library(err: TableError) -> LibraryError {
    match err {
        TableError::TableDoesNotExist(_) => LibraryError::NotFound("library root".to_string()),
        err => err.into(),
    }
}

fn hydrate_fields(item: &mut Item, fields: ItemFields) {
    if !fields.genres {
        item.genres.clear();
    }
    if !fields.tags {
        item.tags.clear();
    }
}

fn clear_table(
    txn: &WriteTransaction,
    table: TableDefinition<&str, &[u8]>,
) -> Result<(), LibraryError> {
    match txn.delete_table(table) {
        Ok(_) => Ok(()),
        Err(TableError::TableDoesNotExist(_)) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, LibraryError> {
    Ok(bincode::serialize(value)?)
}

fn decode_value<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, LibraryError> {
    Ok(bincode::deserialize(bytes)?)
}

fn genre_key(value: &str) -> String {
    value.trim().to_lowercase()
}

fn genre_name_key(name_lower: &str, genre_id: &str) -> String {
    let mut out = String::new();
    out.push_str(name_lower);
    out.push(KEY_SEP);
    out.push_str(genre_id);
    out
}

fn child_key(parent_id: &str, child_id: &str) -> String {
    let mut out = prefix_key(parent_id);
    out.push_str(child_id);
    out
}

fn prefix_key(prefix: &str) -> String {
    let mut out = String::new();
    out.push_str(prefix);
    out.push(KEY_SEP);
    out
}

fn split_key_last(value: &str) -> Result<(&str, &str), LibraryError> {
    let idx = value
        .rfind(KEY_SEP)
        .ok_or_else(|| LibraryError::KeyParse(value.to_string()))?;
    let next = idx + KEY_SEP.len_utf8();
    Ok((&value[..idx], &value[next..]))
}
