use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    AggregateFolder,
    UserRootFolder,
    CollectionFolder,
    UserView,
    Folder,
    BoxSet,
    Playlist,
    Trailer,
    Program,
    Movie,
    Series,
    Season,
    Episode,
    MusicAlbum,
    MusicArtist,
    MusicVideo,
    Audio,
    Other(String),
}

const KNOWN_KINDS: &[ItemKind] = &[
    ItemKind::AggregateFolder,
    ItemKind::UserRootFolder,
    ItemKind::CollectionFolder,
    ItemKind::UserView,
    ItemKind::Folder,
    ItemKind::BoxSet,
    ItemKind::Playlist,
    ItemKind::Trailer,
    ItemKind::Program,
    ItemKind::Movie,
    ItemKind::Series,
    ItemKind::Season,
    ItemKind::Episode,
    ItemKind::MusicAlbum,
    ItemKind::MusicArtist,
    ItemKind::MusicVideo,
    ItemKind::Audio,
];

impl ItemKind {
    pub fn name(&self) -> &str {
        match self {
            ItemKind::AggregateFolder => "AggregateFolder",
            ItemKind::UserRootFolder => "UserRootFolder",
            ItemKind::CollectionFolder => "CollectionFolder",
            ItemKind::UserView => "UserView",
            ItemKind::Folder => "Folder",
            ItemKind::BoxSet => "BoxSet",
            ItemKind::Playlist => "Playlist",
            ItemKind::Trailer => "Trailer",
            ItemKind::Program => "Program",
            ItemKind::Movie => "Movie",
            ItemKind::Series => "Series",
            ItemKind::Season => "Season",
            ItemKind::Episode => "Episode",
            ItemKind::MusicAlbum => "MusicAlbum",
            ItemKind::MusicArtist => "MusicArtist",
            ItemKind::MusicVideo => "MusicVideo",
            ItemKind::Audio => "Audio",
            ItemKind::Other(name) => name.as_str(),
        }
    }

    /// Parses a type name case-insensitively; unknown names are kept verbatim.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        KNOWN_KINDS
            .iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(trimmed))
            .cloned()
            .unwrap_or_else(|| ItemKind::Other(trimmed.to_string()))
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ItemKind::AggregateFolder
                | ItemKind::UserRootFolder
                | ItemKind::CollectionFolder
                | ItemKind::UserView
                | ItemKind::Folder
                | ItemKind::BoxSet
                | ItemKind::Playlist
                | ItemKind::Series
                | ItemKind::Season
                | ItemKind::MusicAlbum
                | ItemKind::MusicArtist
        )
    }

    /// Containers whose children are always filtered as if the query were recursive.
    pub fn implies_recursive(&self) -> bool {
        matches!(self, ItemKind::UserView | ItemKind::CollectionFolder)
    }

    /// Kinds whose genres belong to the music genre index.
    pub fn is_music(&self) -> bool {
        matches!(
            self,
            ItemKind::MusicAlbum | ItemKind::MusicArtist | ItemKind::MusicVideo | ItemKind::Audio
        )
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name.trim())
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for ItemKind {
    fn from(value: String) -> Self {
        ItemKind::parse(&value)
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        kind.name().to_string()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramFlags {
    pub airing: bool,
    pub movie: bool,
    pub sports: bool,
    pub kids: bool,
    pub news: bool,
    pub series: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub kind: ItemKind,
    pub name: String,
    #[serde(default)]
    pub production_year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub official_rating: Option<String>,
    #[serde(default)]
    pub program: ProgramFlags,
    /// Extra children referenced by id, e.g. movies collected in a box set.
    #[serde(default)]
    pub linked_children: Vec<String>,
}

impl Item {
    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub root_id: String,
    #[serde(default)]
    pub blocked_tags: Vec<String>,
}

impl User {
    pub fn blocks(&self, item: &Item) -> bool {
        item.tags.iter().any(|tag| {
            self.blocked_tags
                .iter()
                .any(|blocked| blocked.trim().eq_ignore_ascii_case(tag.trim()))
        })
    }
}

pub fn stable_id(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}
