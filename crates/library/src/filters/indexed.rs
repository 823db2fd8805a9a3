use common::{Item, ItemKind, User};

use crate::filters::scope::is_single_type_in;
use crate::filters::FilterRequest;
use crate::store::{GenreQuery, ItemFields, ItemScope};

/// Single-type requests for these kinds are answered by the music genre index.
const MUSIC_TYPES: [&str; 4] = ["MusicAlbum", "MusicVideo", "MusicArtist", "Audio"];

pub fn uses_music_genres(include_item_types: &[String]) -> bool {
    is_single_type_in(include_item_types, &MUSIC_TYPES)
}

pub fn item_scope(parent: Option<&Item>, recursive: Option<bool>) -> ItemScope {
    let parent_implies_recursive = parent.map_or(false, |item| item.kind.implies_recursive());
    if recursive.unwrap_or(true) || parent_implies_recursive {
        // Descendants of the library root are the whole library.
        let ancestor = parent
            .filter(|item| item.kind != ItemKind::AggregateFolder)
            .map(|item| item.id.clone());
        ItemScope::Ancestor(ancestor)
    } else {
        ItemScope::Parent(parent.map(|item| item.id.clone()))
    }
}

pub fn genre_query(request: &FilterRequest, user: Option<&User>, parent: Option<&Item>) -> GenreQuery {
    GenreQuery {
        user: user.cloned(),
        include_item_types: request.include_item_types.clone(),
        predicates: request.predicates.clone(),
        scope: item_scope(parent, request.recursive),
        fields: ItemFields::NONE,
    }
}
