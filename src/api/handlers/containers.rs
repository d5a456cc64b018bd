//! Container endpoints

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
};

use crate::api::AppState;
use crate::api::error::{Envelope, Result};
use crate::api::extract::{IdQuery, IdRequest, JsonBody, non_empty_id, resolve_id};
use crate::container::{ContainerRecord, ContainerSpec};

pub async fn list_containers(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<ContainerRecord>>>> {
    let containers = state.manager.list_containers().await?;
    Ok(Json(Envelope::new(containers)))
}

/// Create and start a container, or start the existing one with the same name.
/// Responds with the container id.
pub async fn run_container(
    State(state): State<AppState>,
    JsonBody(spec): JsonBody<ContainerSpec>,
) -> Result<Json<Envelope<String>>> {
    let id = state.manager.provision_and_run(&spec).await?;
    Ok(Json(Envelope::new(id)))
}

pub async fn run_existing(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<IdRequest>,
) -> Result<Json<Envelope<String>>> {
    let id = non_empty_id(request.id)?;
    let id = state.manager.start_existing(&id).await?;
    Ok(Json(Envelope::new(id)))
}

/// Stop with the configured grace period.
pub async fn stop_container(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<IdRequest>,
) -> Result<Json<Envelope<&'static str>>> {
    let id = non_empty_id(request.id)?;
    state.manager.stop(&id, state.stop_grace).await?;
    Ok(Json(Envelope::new("container stopped")))
}

pub async fn remove_container(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    body: Bytes,
) -> Result<Json<Envelope<&'static str>>> {
    let id = resolve_id(query, &body)?;
    state.manager.remove(&id).await?;
    Ok(Json(Envelope::new("container deleted")))
}
