//! Remote platform API contract
//!
//! Provides [`ApiClient`], the collaborator validation fetches entities
//! through, and [`ApiResponse`]. Transport, authentication and retries
//! belong to the implementor.

use crate::error::ValidateResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How to address a remote entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum EntityLookup {
    /// Group by platform id
    Group {
        /// Group type
        kind: String,
        /// Owning organization
        owner: String,
        /// Platform id
        id: String,
    },
    /// Indicator by normalized summary
    Indicator {
        /// Indicator type
        kind: String,
        /// Owning organization
        owner: String,
        /// Summary as normalized by [`crate::normalize_summary`]
        summary: String,
    },
}

impl EntityLookup {
    /// Entity type
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Group { kind, .. } | Self::Indicator { kind, .. } => kind,
        }
    }

    /// Check if this addresses a group
    #[inline]
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }
}

/// Response to an entity fetch
///
/// A successful body looks like
/// `{"status": "Success", "data": {"<entity>": {...}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Transport-level success (2xx)
    pub ok: bool,
    /// Decoded JSON body
    pub body: Value,
}

impl ApiResponse {
    /// Successful response wrapping one entity
    #[must_use]
    pub fn entity(key: &str, entity: Value) -> Self {
        let mut data = Map::new();
        data.insert(key.to_string(), entity);
        Self {
            ok: true,
            body: serde_json::json!({"status": "Success", "data": data}),
        }
    }

    /// Failed response with a status body
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            body: serde_json::json!({"status": "Failure", "message": message.into()}),
        }
    }

    /// Check transport success and a `Success` status
    #[inline]
    #[must_use]
    pub fn success(&self) -> bool {
        success(self)
    }

    /// Entity object inside `data`
    #[must_use]
    pub fn data_entity(&self) -> Option<&Map<String, Value>> {
        self.body
            .get("data")?
            .as_object()?
            .values()
            .find_map(Value::as_object)
    }
}

/// Check transport success and a `Success` status
#[must_use]
pub fn success(response: &ApiResponse) -> bool {
    response.ok && response.body.get("status").and_then(Value::as_str) == Some("Success")
}

/// Group summary returned by a name search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Platform id
    pub id: String,
    /// Group name
    pub name: String,
    /// External id
    #[serde(default)]
    pub xid: Option<String>,
}

/// Remote platform collaborator
pub trait ApiClient {
    /// Search groups of a type and owner by exact name
    ///
    /// # Errors
    /// Returns error on transport failure.
    fn search_groups(&self, kind: &str, owner: &str, name: &str) -> ValidateResult<Vec<GroupSummary>>;

    /// Fetch an entity with its attributes, tags and security labels
    ///
    /// # Errors
    /// Returns error on transport failure. A missing entity is an
    /// unsuccessful response, not an error.
    fn fetch_entity(&self, lookup: &EntityLookup) -> ValidateResult<ApiResponse>;

    /// Download the file attached to a Document or Report
    ///
    /// # Errors
    /// Returns error on transport failure.
    fn download_file(&self, lookup: &EntityLookup) -> ValidateResult<Vec<u8>>;
}

impl<T: ApiClient + ?Sized> ApiClient for &T {
    fn search_groups(&self, kind: &str, owner: &str, name: &str) -> ValidateResult<Vec<GroupSummary>> {
        (**self).search_groups(kind, owner, name)
    }

    fn fetch_entity(&self, lookup: &EntityLookup) -> ValidateResult<ApiResponse> {
        (**self).fetch_entity(lookup)
    }

    fn download_file(&self, lookup: &EntityLookup) -> ValidateResult<Vec<u8>> {
        (**self).download_file(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_requires_status() {
        assert!(ApiResponse::entity("host", json!({})).success());
        assert!(!ApiResponse::failure("nope").success());
        let ok_without_status = ApiResponse {
            ok: true,
            body: json!({"data": {}}),
        };
        assert!(!success(&ok_without_status));
        let bad_transport = ApiResponse {
            ok: false,
            body: json!({"status": "Success"}),
        };
        assert!(!success(&bad_transport));
    }

    #[test]
    fn data_entity() {
        let response = ApiResponse::entity("adversary", json!({"name": "x"}));
        assert_eq!(response.data_entity().unwrap()["name"], "x");
        assert!(ApiResponse::failure("gone").data_entity().is_none());
    }
}
