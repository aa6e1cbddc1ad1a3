//! Remote taxonomy lookups.
//!
//! The service is queried one taxid at a time and answers with a JSON array
//! of taxonomy records carrying per-rank name fields (`species_name`,
//! `genus_name`, ...) and a generic `taxon_name`.

use super::DatabaseError;
use crate::bio::{Rank, TaxId, ROOT_TAXID};
use log::debug;
use reqwest::{blocking::Client, header};
use serde_json::Value;
use std::time::Duration;

/// Default taxonomy API endpoint.
pub const DEFAULT_BASE_URL: &str = "http://api.unipept.ugent.be";

/// A source of taxon names keyed by taxid.
pub trait TaxonomyService {
    /// Returns the name of `taxid` at `rank`.
    ///
    /// A missing taxid is looked up as the root taxon.
    fn taxon_name(&self, taxid: Option<TaxId>, rank: Rank) -> Result<String, DatabaseError>;
}

/// Blocking client for the Unipept taxonomy API.
pub struct UnipeptClient {
    client: Client,
    base_url: String,
}

impl UnipeptClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DatabaseError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("nanoclust-abundance/0.1"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(UnipeptClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn taxonomy_url(&self, taxid: TaxId) -> String {
        format!(
            "{}/api/v1/taxonomy.json?input[]={}&extra=true&names=true",
            self.base_url, taxid
        )
    }
}

/// Extracts the rank name from a taxonomy response body.
///
/// An empty or null rank field falls back to `taxon_name`.
pub fn parse_taxon_name(body: &str, rank: Rank) -> Result<String, DatabaseError> {
    let data: Value = serde_json::from_str(body)?;
    let record = data
        .as_array()
        .and_then(|records| records.first())
        .ok_or_else(|| DatabaseError::ApiError("Expected a non-empty JSON array".to_string()))?;

    let field = rank.remote_field();
    match record.get(field) {
        Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
        Some(Value::String(_)) | Some(Value::Null) => record
            .get("taxon_name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DatabaseError::MissingField("taxon_name".to_string())),
        _ => Err(DatabaseError::MissingField(field.to_string())),
    }
}

impl TaxonomyService for UnipeptClient {
    fn taxon_name(&self, taxid: Option<TaxId>, rank: Rank) -> Result<String, DatabaseError> {
        let url = self.taxonomy_url(taxid.unwrap_or(ROOT_TAXID));
        debug!("Querying taxonomy service: {}", url);

        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(DatabaseError::ApiError(format!(
                "Taxonomy lookup failed with status: {}",
                status
            )));
        }

        let body = response.text()?;
        parse_taxon_name(&body, rank)
    }
}
