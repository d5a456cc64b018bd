//! Image endpoints

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::api::AppState;
use crate::api::error::{ApiError, Envelope, Result};
use crate::api::extract::{IdQuery, resolve_id};
use crate::container::{ImageDeletion, ImageRecord, PullSummary, RunCommand, SearchHit};

/// `?image=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    pub image: Option<String>,
}

impl ImageQuery {
    fn require(self) -> Result<String> {
        self.image
            .map(|image| image.trim().to_string())
            .filter(|image| !image.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing 'image' query parameter".to_string()))
    }
}

/// `?search=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

pub async fn list_images(State(state): State<AppState>) -> Result<Json<Envelope<Vec<ImageRecord>>>> {
    let images = state.images.list().await?;
    Ok(Json(Envelope::new(images)))
}

/// What the image runs by default, with its exposed ports.
pub async fn run_command(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Result<Json<Envelope<RunCommand>>> {
    let image = query.require()?;
    let run = state.manager.describe_run_command(&image).await?;
    Ok(Json(Envelope::new(run)))
}

pub async fn search_images(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Envelope<Vec<SearchHit>>>> {
    let hits = state.images.search(query.search.as_deref()).await?;
    Ok(Json(Envelope::new(hits)))
}

pub async fn pull_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Result<Json<Envelope<PullSummary>>> {
    let image = query.require()?;
    let summary = state.images.pull(&image).await?;
    Ok(Json(Envelope::new(summary)))
}

/// Force-remove an image named by `?id=` or a `{"id"}` body.
pub async fn remove_image(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    body: Bytes,
) -> Result<Json<Envelope<Vec<ImageDeletion>>>> {
    let id = resolve_id(query, &body)?;
    let removed = state.images.remove(&id).await?;
    Ok(Json(Envelope::new(removed)))
}
