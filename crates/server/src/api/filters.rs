use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use library::{
    ContentPredicates, FilterError, FilterRequest, LegacyFilters, LibraryError, QueryFilters,
};
use tracing::error;

use crate::state::{AppState, ErrorResponse, FilterParams, JsonResult};
use crate::utils::json_error;

use super::library_or_json_error;

pub async fn get_legacy_filters(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> JsonResult<LegacyFilters> {
    let request = filter_request(&params, false)?;
    let library = library_or_json_error(&state)?;
    let result = tokio::task::spawn_blocking(move || library.legacy_filters(&request)).await;
    finish(result)
}

pub async fn get_query_filters(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> JsonResult<QueryFilters> {
    let request = filter_request(&params, true)?;
    let library = library_or_json_error(&state)?;
    let result = tokio::task::spawn_blocking(move || library.genre_filters(&request)).await;
    finish(result)
}

fn finish<T>(
    result: Result<Result<T, FilterError>, tokio::task::JoinError>,
) -> JsonResult<T> {
    match result {
        Ok(Ok(filters)) => Ok(Json(filters)),
        Ok(Err(err)) => Err(filter_error(err)),
        Err(err) => {
            error!("Filter task failed: {}", err);
            Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("filter task failed: {}", err),
            ))
        }
    }
}

fn filter_error(err: FilterError) -> (StatusCode, Json<ErrorResponse>) {
    match &err {
        FilterError::Library(LibraryError::NotFound(_)) => {
            json_error(StatusCode::NOT_FOUND, err.to_string())
        }
        FilterError::NotAContainer(_) => {
            error!("Filter contract violation: {}", err);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        FilterError::Library(_) => {
            error!("Filter query failed: {}", err);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn filter_request(
    params: &FilterParams,
    allow_recursive: bool,
) -> Result<FilterRequest, (StatusCode, Json<ErrorResponse>)> {
    let recursive = if allow_recursive {
        parse_flag("recursive", params.recursive.as_deref())?
    } else {
        None
    };
    Ok(FilterRequest {
        user_id: non_blank(params.user_id.as_deref()),
        parent_id: non_blank(params.parent_id.as_deref()),
        include_item_types: split_list(params.include_item_types.as_deref()),
        recursive,
        predicates: ContentPredicates {
            is_airing: parse_flag("isAiring", params.is_airing.as_deref())?,
            is_movie: parse_flag("isMovie", params.is_movie.as_deref())?,
            is_sports: parse_flag("isSports", params.is_sports.as_deref())?,
            is_kids: parse_flag("isKids", params.is_kids.as_deref())?,
            is_news: parse_flag("isNews", params.is_news.as_deref())?,
            is_series: parse_flag("isSeries", params.is_series.as_deref())?,
        },
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(
    name: &str,
    value: Option<&str>,
) -> Result<Option<bool>, (StatusCode, Json<ErrorResponse>)> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if value.eq_ignore_ascii_case("true") {
        Ok(Some(true))
    } else if value.eq_ignore_ascii_case("false") {
        Ok(Some(false))
    } else {
        Err(json_error(
            StatusCode::BAD_REQUEST,
            format!("{} must be true or false", name),
        ))
    }
}
