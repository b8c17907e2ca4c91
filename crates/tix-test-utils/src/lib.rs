//! tix Test Utils - shared fixtures
//!
//! Provides:
//! - [`init_tracing`]: one-time `RUST_LOG`-driven subscriber for tests
//! - [`client_with`]: a store client preloaded with variables
//! - [`FakeApi`]: a scripted [`ApiClient`] that can mirror batch entities
//! - [`indicator`] / [`group`]: entity builders with fixed xids

#![warn(unreachable_pub)]
#![warn(missing_docs)]

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::sync::Once;
use tix_batch::{
    is_group_type, Attribute, BatchEntity, EntityBuilder, GroupBuilder, IndicatorBuilder,
};
use tix_playbook::{KvStoreClient, MemoryStore};
use tix_validate::{
    normalize_summary, ApiClient, ApiResponse, EntityLookup, GroupSummary, ValidateError,
    ValidateResult,
};
use tix_variable::{TypedValue, Variable};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test subscriber filtered by `RUST_LOG` (default `warn`)
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Store client for `context` preloaded with `(variable, value)` pairs
///
/// # Panics
/// Panics on a malformed variable or a value that does not fit its type.
#[must_use]
pub fn client_with(context: &str, values: &[(&str, TypedValue)]) -> KvStoreClient<MemoryStore> {
    let client = KvStoreClient::new(MemoryStore::new(), context);
    for (raw, value) in values {
        let variable = Variable::parse(raw).expect("fixture variable");
        client.write(&variable, value).expect("fixture value");
    }
    client
}

/// Indicator with a rating, a confidence, one attribute and one tag
#[must_use]
pub fn indicator(kind: &str, summary: &str) -> BatchEntity {
    IndicatorBuilder::new(kind, summary)
        .rating(3.0)
        .confidence(75)
        .attribute(Attribute::new("Description", format!("{kind} {summary}")))
        .tag("fixture")
        .build()
}

/// Group with a fixed xid, one attribute and one tag
#[must_use]
pub fn group(kind: &str, name: &str, xid: &str) -> BatchEntity {
    GroupBuilder::new(kind, name)
        .with_xid(xid)
        .attribute(Attribute::new("Description", name))
        .tag("fixture")
        .build()
}

/// Remote form of a batch entity, as the platform would return it
#[must_use]
pub fn remote_form(entity: &BatchEntity) -> Value {
    let mut remote = Map::new();
    remote.insert("type".into(), json!(entity.kind));
    remote.insert(
        "value".into(),
        json!(match &entity.summary {
            Some(summary) => normalize_summary(&entity.kind, summary),
            None => entity.label().to_string(),
        }),
    );
    if let Some(rating) = entity.rating {
        remote.insert("rating".into(), json!(rating));
    }
    if let Some(confidence) = entity.confidence {
        remote.insert("confidence".into(), json!(confidence));
    }
    remote.insert(
        "attribute".into(),
        json!(entity
            .attribute
            .iter()
            .map(|a| json!({"type": a.kind, "value": a.value}))
            .collect::<Vec<_>>()),
    );
    remote.insert("tag".into(), json!(entity.tag));
    remote.insert(
        "securityLabel".into(),
        json!(entity
            .security_label
            .iter()
            .map(|l| json!({"name": l.name}))
            .collect::<Vec<_>>()),
    );
    Value::Object(remote)
}

/// Scripted platform API
///
/// Lookups with no scripted response answer with an unsuccessful
/// response. Every fetch is recorded.
#[derive(Debug, Default)]
pub struct FakeApi {
    groups: IndexMap<(String, String, String), Vec<GroupSummary>>,
    entities: IndexMap<EntityLookup, ApiResponse>,
    files: IndexMap<EntityLookup, Vec<u8>>,
    fetched: Mutex<Vec<EntityLookup>>,
    offline: bool,
}

impl FakeApi {
    /// Create empty fake
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake whose every call fails in transport
    #[must_use]
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Script a group name search result
    pub fn with_group_search(&mut self, kind: &str, owner: &str, name: &str, found: GroupSummary) -> &mut Self {
        self.groups
            .entry((kind.into(), owner.into(), name.into()))
            .or_default()
            .push(found);
        self
    }

    /// Script a fetch response
    pub fn with_response(&mut self, lookup: EntityLookup, response: ApiResponse) -> &mut Self {
        self.entities.insert(lookup, response);
        self
    }

    /// Script an attached file
    pub fn with_file(&mut self, lookup: EntityLookup, content: Vec<u8>) -> &mut Self {
        self.files.insert(lookup, content);
        self
    }

    /// Script `entity` as present remotely with exactly its batch contents
    ///
    /// Groups get the platform id `id-<xid>`. Returns the lookup.
    pub fn mirror(&mut self, entity: &BatchEntity, owner: &str) -> EntityLookup {
        self.mirror_as(entity, owner, remote_form(entity))
    }

    /// Script `entity` as present remotely with the given remote form
    pub fn mirror_as(&mut self, entity: &BatchEntity, owner: &str, remote: Value) -> EntityLookup {
        let lookup = if is_group_type(&entity.kind) {
            let id = format!("id-{}", entity.xid);
            let name = entity.label().to_string();
            self.with_group_search(
                &entity.kind,
                owner,
                &name,
                GroupSummary {
                    id: id.clone(),
                    name: name.clone(),
                    xid: Some(entity.xid.clone()),
                },
            );
            EntityLookup::Group {
                kind: entity.kind.clone(),
                owner: owner.into(),
                id,
            }
        } else {
            EntityLookup::Indicator {
                kind: entity.kind.clone(),
                owner: owner.into(),
                summary: normalize_summary(&entity.kind, entity.label()),
            }
        };
        let key = entity.kind.to_lowercase();
        self.with_response(lookup.clone(), ApiResponse::entity(&key, remote));
        lookup
    }

    /// Lookups fetched so far, in order
    #[must_use]
    pub fn fetched(&self) -> Vec<EntityLookup> {
        self.fetched.lock().clone()
    }

    fn check_online(&self, op: &'static str) -> ValidateResult<()> {
        if self.offline {
            Err(ValidateError::api(op, "connection refused"))
        } else {
            Ok(())
        }
    }
}

impl ApiClient for FakeApi {
    fn search_groups(&self, kind: &str, owner: &str, name: &str) -> ValidateResult<Vec<GroupSummary>> {
        self.check_online("search")?;
        Ok(self
            .groups
            .get(&(kind.to_string(), owner.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn fetch_entity(&self, lookup: &EntityLookup) -> ValidateResult<ApiResponse> {
        self.check_online("fetch")?;
        self.fetched.lock().push(lookup.clone());
        Ok(self
            .entities
            .get(lookup)
            .cloned()
            .unwrap_or_else(|| ApiResponse::failure("not found")))
    }

    fn download_file(&self, lookup: &EntityLookup) -> ValidateResult<Vec<u8>> {
        self.check_online("download")?;
        self.files
            .get(lookup)
            .cloned()
            .ok_or_else(|| ValidateError::api("download", "no file attached"))
    }
}
