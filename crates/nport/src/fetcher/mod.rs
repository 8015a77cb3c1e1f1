//! Document fetcher: downloads a filing's primary XML document.
//!
//! The raw document name is derived from the submissions index. When that
//! guess is wrong (a 404), the filing folder's `index.json` listing is
//! consulted for the most plausible XML document instead.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::EdgarClient;
use crate::errors::NportError;
use crate::models::{Cik, FilingLocation};

/// A downloaded primary document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedDocument {
    pub url: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct FolderIndex {
    directory: Option<FolderDirectory>,
}

#[derive(Debug, Deserialize)]
struct FolderDirectory {
    #[serde(default)]
    item: Vec<FolderItem>,
}

#[derive(Debug, Deserialize)]
struct FolderItem {
    #[serde(default)]
    name: String,
}

/// Order XML file names by how likely they are to be the N-PORT primary
/// document: names mentioning `primary` or `nport` first, then by name.
pub fn rank_xml_candidates(names: &[String], exclude: &str) -> Vec<String> {
    let mut candidates: Vec<String> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| n.to_ascii_lowercase().ends_with(".xml") && *n != exclude)
        .map(str::to_string)
        .collect();

    candidates.sort_by_key(|n| {
        let lower = n.to_ascii_lowercase();
        let preferred = lower.contains("primary") || lower.contains("nport");
        (!preferred, lower)
    });
    candidates.dedup();
    candidates
}

pub struct DocumentFetcher {
    client: Arc<EdgarClient>,
}

impl DocumentFetcher {
    pub fn new(client: Arc<EdgarClient>) -> Self {
        Self { client }
    }

    /// Download the primary XML document of a filing.
    ///
    /// # Errors
    ///
    /// - `NotFound` when neither the derived document nor any folder
    ///   candidate exists
    /// - `UpstreamUnavailable` / `RateLimited` / `Rejected` from the client
    pub async fn fetch_primary(
        &self,
        cik: &Cik,
        location: &FilingLocation,
    ) -> Result<FetchedDocument, NportError> {
        let folder = self.client.endpoints().filing_folder_url(cik, location);
        let document = location.raw_document_name();
        let url = format!("{}{}", folder, document);

        match self.client.get_text(&url).await {
            Ok(body) => {
                debug!(url = %url, bytes = body.len(), "Fetched primary document");
                Ok(FetchedDocument { url, body })
            }
            Err(NportError::NotFound(reason)) => {
                warn!(url = %url, "Primary document missing, scanning filing folder");
                match self.fetch_from_folder_index(&folder, &document).await {
                    Some(fetched) => Ok(fetched),
                    None => Err(NportError::NotFound(reason)),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Best-effort lookup through `index.json`; any failure yields `None`.
    async fn fetch_from_folder_index(
        &self,
        folder: &str,
        tried: &str,
    ) -> Option<FetchedDocument> {
        let listing_url = format!("{}index.json", folder);
        let listing = self.client.get_text(&listing_url).await.ok()?;
        let index: FolderIndex = serde_json::from_str(&listing).ok()?;
        let names: Vec<String> = index
            .directory?
            .item
            .into_iter()
            .map(|item| item.name)
            .collect();

        let candidate = rank_xml_candidates(&names, tried).into_iter().next()?;
        let url = format!("{}{}", folder, candidate);
        let body = self.client.get_text(&url).await.ok()?;

        info!(url = %url, "Using primary document found in folder index");
        Some(FetchedDocument { url, body })
    }
}
