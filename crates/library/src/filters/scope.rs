use common::{Item, User};
use tracing::debug;

use crate::store::ItemStore;
use crate::LibraryError;

/// Item types that are always searched library-wide, whatever parent was asked for.
const GLOBAL_SCOPE_TYPES: [&str; 4] = ["BoxSet", "Playlist", "Trailer", "Program"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedScope {
    pub parent: Option<Item>,
    pub overridden: bool,
}

pub fn forces_global_scope(include_item_types: &[String]) -> bool {
    is_single_type_in(include_item_types, &GLOBAL_SCOPE_TYPES)
}

pub(crate) fn is_single_type_in(include_item_types: &[String], names: &[&str]) -> bool {
    match include_item_types {
        [only] => names.iter().any(|name| name.eq_ignore_ascii_case(only.trim())),
        _ => false,
    }
}

pub(crate) fn normalize_id(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub fn resolve_scope(
    store: &dyn ItemStore,
    parent_id: Option<&str>,
    user: Option<&User>,
    include_item_types: &[String],
) -> Result<ResolvedScope, LibraryError> {
    if forces_global_scope(include_item_types) {
        return Ok(ResolvedScope {
            parent: None,
            overridden: true,
        });
    }

    let parent = match normalize_id(parent_id) {
        Some(id) => {
            let item = store.get_item_by_id(id)?;
            if item.is_none() {
                debug!("Parent {} not found; using unscoped query", id);
            }
            item
        }
        None => Some(match user {
            Some(user) => store.user_root_container(user)?,
            None => store.root_container()?,
        }),
    };

    Ok(ResolvedScope {
        parent,
        overridden: false,
    })
}
