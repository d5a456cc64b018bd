//! Image listing, introspection, removal, pull and registry search.

use crate::container::{
    ContainerError, Engine, ImageDeletion, ImageDetails, ImageRecord, PullSummary, Result,
    SearchHit,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// What an image runs by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCommand {
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    /// Exposed container ports without protocol suffix, ascending
    pub ports: Vec<String>,
}

impl RunCommand {
    /// Derive the run command from inspected image details.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NoCommandDefined`] when the image has neither a
    /// command nor an entrypoint, since such an image cannot be run as-is.
    pub fn from_details(reference: &str, details: ImageDetails) -> Result<Self> {
        if details.cmd.is_empty() && details.entrypoint.is_empty() {
            return Err(ContainerError::NoCommandDefined(reference.to_string()));
        }

        let mut ports: Vec<String> = details
            .exposed_ports
            .iter()
            .map(|key| strip_protocol(key).to_string())
            .collect();
        ports.sort_by_key(|port| (port.parse::<u32>().unwrap_or(u32::MAX), port.clone()));
        ports.dedup();

        Ok(Self {
            cmd: details.cmd,
            entrypoint: details.entrypoint,
            ports,
        })
    }
}

/// `8080/tcp` -> `8080`.
fn strip_protocol(key: &str) -> &str {
    key.split_once('/').map_or(key, |(port, _)| port)
}

/// Result limits for registry search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Limit when no query is given and popular images are listed
    pub default_limit: u32,
    /// Limit for an explicit query
    pub query_limit: u32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            query_limit: 20,
        }
    }
}

/// Search term used when the caller gives none.
pub const POPULAR_TERM: &str = "popular";

/// Image operations passed through to the engine.
#[derive(Clone)]
pub struct ImageCatalog {
    engine: Arc<dyn Engine>,
    limits: SearchLimits,
}

impl ImageCatalog {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self::with_limits(engine, SearchLimits::default())
    }

    pub fn with_limits(engine: Arc<dyn Engine>, limits: SearchLimits) -> Self {
        Self { engine, limits }
    }

    /// Local images.
    ///
    /// # Errors
    ///
    /// Returns error if listing fails.
    pub async fn list(&self) -> Result<Vec<ImageRecord>> {
        self.engine
            .list_images()
            .await
            .map_err(|e| ContainerError::operation("list", "images", e))
    }

    /// Force-remove an image, pruning untagged parents.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotFound`] for unknown images.
    pub async fn remove(&self, reference: &str) -> Result<Vec<ImageDeletion>> {
        if reference.trim().is_empty() {
            return Err(ContainerError::Validation("id is required".to_string()));
        }

        let removed = self
            .engine
            .remove_image(reference)
            .await
            .map_err(|e| ContainerError::from_engine("remove", reference, e))?;
        info!("Removed image {} ({} entries)", reference, removed.len());
        Ok(removed)
    }

    /// Pull an image, waiting for the engine to finish.
    ///
    /// # Errors
    ///
    /// Returns error if the pull fails.
    pub async fn pull(&self, reference: &str) -> Result<PullSummary> {
        if reference.trim().is_empty() {
            return Err(ContainerError::Validation(
                "Missing image name".to_string(),
            ));
        }

        info!("Pulling image: {}", reference);
        self.engine
            .pull_image(reference)
            .await
            .map_err(|e| ContainerError::from_engine("pull", reference, e))
    }

    /// Search the registry, most starred first.
    ///
    /// A blank query lists popular images with the smaller default limit.
    ///
    /// # Errors
    ///
    /// Returns error if the search fails.
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<SearchHit>> {
        let (term, limit) = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => (query, self.limits.query_limit),
            None => (POPULAR_TERM, self.limits.default_limit),
        };

        debug!("Searching images for '{}' (limit {})", term, limit);
        let mut hits = self
            .engine
            .search_images(term, limit)
            .await
            .map_err(|e| ContainerError::operation("search", term, e))?;

        hits.sort_by(|a, b| b.star_count.cmp(&a.star_count));
        Ok(hits)
    }
}
