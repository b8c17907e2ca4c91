//! Platform-side validation
//!
//! Provides [`PlatformValidator`], which resolves expected entities to live
//! platform objects and compares their attributes, tags, security labels,
//! rating, confidence and summary. Batch validation samples submitted
//! entities from the run's batch logs.

use crate::api::{ApiClient, EntityLookup};
use crate::config::ValidatorConfig;
use crate::error::{EntityError, ValidateError, ValidateResult};
use crate::sampling::{partition, partition_total, SampleCriteria, Sampler};
use crate::store::ValidationOutcome;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tix_batch::{is_group_type, log_files, BatchData, BatchEntity};
use tracing::{debug, error, info};

/// Message of a failed batch validation
pub const BATCH_FAILURE: &str = "One or more of the Batch Requests did not match with what is \
currently in ThreatConnect. View tests.log for additional details.";

/// Validation report for one entity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityReport {
    /// Entity type
    pub kind: String,
    /// Name or summary
    pub label: String,
    /// Every discrepancy found
    pub errors: Vec<EntityError>,
}

impl EntityReport {
    fn new(entity: &BatchEntity) -> Self {
        Self {
            kind: entity.kind.clone(),
            label: entity.label().to_string(),
            errors: Vec::new(),
        }
    }

    /// Check if no discrepancy was found
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Decode `%XX` escapes; malformed escapes are kept as-is
#[must_use]
pub fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
            if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                let digits = [hi, lo];
                let byte = std::str::from_utf8(&digits)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                if let Some(byte) = byte {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Normalize an indicator summary for lookup
///
/// Percent escapes are decoded, empty `:`-separated parts dropped, and
/// File hashes upper-cased.
#[must_use]
pub fn normalize_summary(kind: &str, summary: &str) -> String {
    let decoded = percent_decode(summary);
    let joined = decoded
        .split(':')
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(":");
    if kind.eq_ignore_ascii_case("file") {
        joined.to_uppercase()
    } else {
        joined
    }
}

/// Compare `name -> value` maps, logging one error per discrepancy
pub fn compare_dicts<V: Display>(
    expected: &IndexMap<String, V>,
    actual: &IndexMap<String, V>,
    error_type: &str,
) -> bool {
    let errors = tix_compare::compare_dicts(expected, actual, error_type);
    for message in &errors {
        error!("{message}");
    }
    errors.is_empty()
}

/// Compare lists as multisets, logging one error per discrepancy
pub fn compare_lists<T: PartialEq + Display>(expected: &[T], actual: &[T], error_type: &str) -> bool {
    let errors = tix_compare::compare_lists(expected, actual, error_type);
    for message in &errors {
        error!("{message}");
    }
    errors.is_empty()
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn names(items: Option<&Value>) -> Vec<String> {
    items
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    other => other.get("name").and_then(Value::as_str).map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn response_attributes(entity: &Map<String, Value>) -> IndexMap<String, String> {
    entity
        .get("attribute")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|a| {
            let kind = a.get("type")?.as_str()?;
            let value = match a.get("value")? {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((kind.to_string(), value))
        })
        .collect()
}

fn response_label(entity: &Map<String, Value>) -> String {
    ["value", "summary", "name"]
        .iter()
        .find_map(|key| entity.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Asserts expected entities against the live platform
#[derive(Debug)]
pub struct PlatformValidator<C> {
    client: C,
    config: ValidatorConfig,
}

impl<C: ApiClient> PlatformValidator<C> {
    /// Create validator with default configuration
    #[inline]
    #[must_use]
    pub fn new(client: C) -> Self {
        Self::with_config(client, ValidatorConfig::default())
    }

    /// Create validator with configuration
    #[inline]
    #[must_use]
    pub fn with_config(client: C, config: ValidatorConfig) -> Self {
        Self { client, config }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// API client in use
    #[inline]
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    fn resolve(&self, entity: &BatchEntity, owner: &str) -> ValidateResult<Option<EntityLookup>> {
        if is_group_type(&entity.kind) {
            let name = entity.name.as_deref().unwrap_or_default();
            let found = self
                .client
                .search_groups(&entity.kind, owner, name)?
                .into_iter()
                .find(|g| g.xid.as_deref() == Some(entity.xid.as_str()));
            return Ok(found.map(|g| EntityLookup::Group {
                kind: entity.kind.clone(),
                owner: owner.to_string(),
                id: g.id,
            }));
        }
        if self.config.is_indicator_type(&entity.kind) {
            let summary = entity.summary.as_deref().unwrap_or_default();
            return Ok(Some(EntityLookup::Indicator {
                kind: entity.kind.clone(),
                owner: owner.to_string(),
                summary: normalize_summary(&entity.kind, summary),
            }));
        }
        // victims and unknown types cannot be looked up
        Ok(None)
    }

    /// Validate one entity, collecting every discrepancy
    ///
    /// # Errors
    /// Returns error on API transport failure or an unreadable file.
    pub fn inspect_entity(
        &self,
        entity: &BatchEntity,
        owner: &str,
        file: Option<&Path>,
    ) -> ValidateResult<EntityReport> {
        let mut report = EntityReport::new(entity);
        let not_found = || EntityError::NotFound {
            kind: entity.kind.clone(),
            label: entity.label().to_string(),
        };

        let Some(lookup) = self.resolve(entity, owner)? else {
            report.errors.push(not_found());
            return Ok(report);
        };
        let response = self.client.fetch_entity(&lookup)?;
        let Some(actual) = response.data_entity().filter(|_| response.success()) else {
            debug!(?lookup, "entity fetch unsuccessful");
            report.errors.push(not_found());
            return Ok(report);
        };

        let expected_attributes: IndexMap<String, String> = entity
            .attribute
            .iter()
            .filter_map(|a| Some((a.kind.clone(), a.value.clone()?)))
            .collect();
        report.errors.extend(
            tix_compare::compare_dicts(&expected_attributes, &response_attributes(actual), "")
                .into_iter()
                .map(EntityError::Attribute),
        );

        let expected_tags: Vec<String> = entity.tag.iter().map(|t| t.name.clone()).collect();
        report.errors.extend(
            tix_compare::compare_lists(&expected_tags, &names(actual.get("tag")), "")
                .into_iter()
                .map(EntityError::Tag),
        );

        let expected_labels: Vec<String> =
            entity.security_label.iter().map(|l| l.name.clone()).collect();
        report.errors.extend(
            tix_compare::compare_lists(&expected_labels, &names(actual.get("securityLabel")), "")
                .into_iter()
                .map(EntityError::SecurityLabel),
        );

        if let Some(path) = file {
            if matches!(lookup.kind(), "Document" | "Report") {
                let provided = fs::read(path).map_err(|e| ValidateError::io(path, e))?;
                let provided = sha256_hex(&provided);
                let actual_hash = sha256_hex(&self.client.download_file(&lookup)?);
                if provided != actual_hash {
                    report.errors.push(EntityError::Digest {
                        provided,
                        actual: actual_hash,
                    });
                }
            }
        }

        match &lookup {
            EntityLookup::Indicator { summary, .. } => {
                let actual_rating = actual.get("rating").and_then(Value::as_f64);
                if entity.rating != actual_rating {
                    report.errors.push(EntityError::Rating {
                        provided: entity.rating,
                        actual: actual_rating,
                    });
                }
                let actual_confidence = actual.get("confidence").and_then(Value::as_i64);
                if entity.confidence != actual_confidence {
                    report.errors.push(EntityError::Confidence {
                        provided: entity.confidence,
                        actual: actual_confidence,
                    });
                }
                let actual_summary = percent_decode(&response_label(actual));
                if *summary != actual_summary {
                    report.errors.push(EntityError::Summary {
                        provided: summary.clone(),
                        actual: actual_summary,
                    });
                }
            }
            EntityLookup::Group { .. } => {
                let provided = entity.name.clone().unwrap_or_default();
                let actual_name = response_label(actual);
                if provided != actual_name {
                    report.errors.push(EntityError::Summary {
                        provided,
                        actual: actual_name,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Validate one entity, logging every discrepancy
    ///
    /// # Errors
    /// Returns error on API transport failure or an unreadable file.
    pub fn tc_entity(&self, entity: &BatchEntity, owner: &str, file: Option<&Path>) -> ValidateResult<bool> {
        let report = self.inspect_entity(entity, owner, file)?;
        for reason in &report.errors {
            error!("{reason}");
        }
        debug!(kind = %report.kind, label = %report.label, passed = report.passed(), "validated entity");
        Ok(report.passed())
    }

    /// Validate entities, pairing each with a file when files are given
    ///
    /// A file count that differs from the entity count yields a single
    /// failed result.
    ///
    /// # Errors
    /// Returns error on API transport failure or an unreadable file.
    pub fn tc_entities(
        &self,
        entities: &[BatchEntity],
        owner: &str,
        files: Option<&[PathBuf]>,
    ) -> ValidateResult<Vec<bool>> {
        if let Some(files) = files {
            if files.len() != entities.len() {
                error!("{}", EntityError::Length);
                return Ok(vec![false]);
            }
        }
        entities
            .iter()
            .enumerate()
            .map(|(i, entity)| {
                let file = files.map(|f| f[i].as_path());
                self.tc_entity(entity, owner, file)
            })
            .collect()
    }

    /// Validate a JSON file holding an array of entities
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or on API
    /// transport failure.
    pub fn file(&self, path: &Path, owner: &str) -> ValidateResult<Vec<bool>> {
        let text = fs::read_to_string(path).map_err(|e| ValidateError::io(path, e))?;
        let entities: Vec<BatchEntity> =
            serde_json::from_str(&text).map_err(|source| ValidateError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), entities = entities.len(), "validating file");
        self.tc_entities(&entities, owner, None)
    }

    /// Validate every `validate_*.json` file in a directory, sorted by name
    ///
    /// # Errors
    /// Returns error if the directory or a file cannot be read.
    pub fn dir(&self, directory: &Path, owner: &str) -> ValidateResult<Vec<Vec<bool>>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(directory).map_err(|e| ValidateError::io(directory, e))? {
            let path = entry.map_err(|e| ValidateError::io(directory, e))?.path();
            let is_validation = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("validate_") && n.ends_with(".json"));
            if is_validation {
                files.push(path);
            }
        }
        files.sort();
        files.iter().map(|path| self.file(path, owner)).collect()
    }

    /// Validate a sample of the entities submitted in a run
    ///
    /// Reads every batch log of the context, partitions by (section,
    /// entity type) and samples each partition with the configured seed.
    ///
    /// # Errors
    /// Returns error if a batch log cannot be read, or on API transport
    /// failure.
    pub fn batch(&self, context: &str, owner: &str, criteria: SampleCriteria) -> ValidateResult<ValidationOutcome> {
        let dir = self.config.log_dir(context);
        let documents = log_files(&dir)?
            .iter()
            .map(|path| BatchData::read(path))
            .collect::<Result<Vec<_>, _>>()?;
        let partitions = partition(&documents);
        let percent = criteria.effective_percent(partition_total(&partitions));

        let mut sampler = Sampler::new(self.config.sample_seed);
        let sampled = sampler.sample_partitions(&partitions, percent);
        info!(context, percent, sampled = sampled.len(), total = partition_total(&partitions), "validating batch");

        let mut passed = true;
        for entity in sampled {
            passed &= self.tc_entity(entity, owner, None)?;
        }
        Ok(ValidationOutcome {
            passed,
            assert_error: if passed {
                String::new()
            } else {
                BATCH_FAILURE.to_string()
            },
        })
    }
}
