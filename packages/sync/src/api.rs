//! HTTP client for the unit-map REST API.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use unit_map_pipeline::reconcile::effective_overrides;
use unit_map_source::normalize::normalize_rows;
use unit_map_unit_models::{UnitPatch, UnitRecord};

use crate::SyncError;

/// Client for the remote units API. Writes carry the admin bearer token
/// when one is configured.
pub struct ApiClient {
    base_url: String,
    admin_token: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    /// Client rooted at `base_url` (no trailing slash). An empty token
    /// means the deployment has writes open.
    #[must_use]
    pub fn new(base_url: impl Into<String>, admin_token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            admin_token: admin_token.filter(|t| !t.is_empty()),
            client: reqwest::Client::new(),
        }
    }

    /// Fetches all units (`GET /api/units`), normalized.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the request fails or the payload is not
    /// a JSON array.
    pub async fn list_units(&self) -> Result<Vec<UnitRecord>, SyncError> {
        let url = format!("{}/api/units", self.base_url);
        let body: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let rows = body
            .as_array()
            .ok_or_else(|| SyncError::Api(format!("{url} did not return a JSON array")))?;
        Ok(normalize_rows(rows))
    }

    /// Transmits the edit set as one upsert batch
    /// (`POST /api/units/bulk`), returning the applied count.
    ///
    /// Blank patch values are dropped before transmission — they mean
    /// "no override" locally and must not clobber stored fields.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Unauthorized`] on HTTP 401, [`SyncError`]
    /// variants for transport or payload failures.
    pub async fn bulk_upsert(
        &self,
        edits: &BTreeMap<String, UnitPatch>,
    ) -> Result<u64, SyncError> {
        let payload: Vec<Value> = edits
            .iter()
            .map(|(id, patch)| {
                let mut entry = Map::new();
                entry.insert("id".to_string(), Value::String(id.clone()));
                for (key, value) in effective_overrides(patch) {
                    entry.insert(key, value);
                }
                Value::Object(entry)
            })
            .collect();

        if payload.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/api/units/bulk", self.base_url);
        let mut request = self.client.post(&url).json(&json!({ "edits": payload }));
        if let Some(token) = &self.admin_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SyncError::Unauthorized);
        }
        let body: Value = response.error_for_status()?.json().await?;

        body.get("updated")
            .and_then(Value::as_u64)
            .ok_or_else(|| SyncError::Api(format!("{url} returned no updated count: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_token_disables_auth() {
        let client = ApiClient::new("http://localhost:8080", Some(String::new()));
        assert!(client.admin_token.is_none());
        let client = ApiClient::new("http://localhost:8080", Some("secret".to_string()));
        assert_eq!(client.admin_token.as_deref(), Some("secret"));
    }

    #[test]
    fn bulk_payload_drops_blank_overrides() {
        let mut patch = UnitPatch::new();
        patch.insert("today".to_string(), json!(7));
        patch.insert("name".to_string(), json!(""));
        patch.insert("lat".to_string(), Value::Null);
        let kept = effective_overrides(&patch);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.get("today"), Some(&json!(7)));
    }
}
