//! Group and indicator builders
//!
//! Provides [`GroupBuilder`] and [`IndicatorBuilder`]. Both share the
//! [`EntityBuilder`] surface for metadata, attributes, tags, labels and
//! associations. Snake-case metadata keys are mapped to their batch names
//! and date keys are normalized to `%Y-%m-%dT%H:%M:%SZ`.

use crate::error::{BatchError, BatchResult};
use crate::model::{Attribute, BatchEntity, SecurityLabel, Tag};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Batch timestamp format
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const METADATA_KEYS: [(&str, &str); 11] = [
    ("date_added", "dateAdded"),
    ("event_date", "eventDate"),
    ("file_name", "fileName"),
    ("file_text", "fileText"),
    ("file_type", "fileType"),
    ("first_seen", "firstSeen"),
    ("from_addr", "from"),
    ("last_modified", "lastModified"),
    ("private_flag", "privateFlag"),
    ("publish_date", "publishDate"),
    ("to_addr", "to"),
];

const DATE_KEYS: [&str; 5] = [
    "dateAdded",
    "eventDate",
    "firstSeen",
    "lastModified",
    "publishDate",
];

// file bytes travel separately from the entity
const IGNORED_KEYS: [&str; 1] = ["file_content"];

/// Map a metadata key onto its batch name
#[must_use]
pub fn metadata_key(key: &str) -> &str {
    METADATA_KEYS
        .iter()
        .find(|(from, _)| *from == key)
        .map_or(key, |(_, to)| to)
}

/// Format a timestamp the way batch documents expect
#[inline]
#[must_use]
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a date value
///
/// Accepts RFC 3339 text, `YYYY-MM-DD[ T]HH:MM:SS`, `YYYY-MM-DD` or epoch
/// seconds.
///
/// # Errors
/// Returns [`BatchError::InvalidDate`] when no form matches.
pub fn parse_date(key: &str, value: &Value) -> BatchResult<DateTime<Utc>> {
    let invalid = || BatchError::InvalidDate {
        key: key.to_string(),
        value: value.to_string(),
    };
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(invalid),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(date) = DateTime::parse_from_rfc3339(s) {
                return Ok(date.with_timezone(&Utc));
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Ok(naive.and_utc());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// How a new attribute interacts with existing ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUniqueness {
    /// Always append
    None,
    /// Replace any attribute of the same type
    Type,
    /// Skip when the same type and value already exist
    #[default]
    TypeValue,
}

/// Entity under construction
#[derive(Debug, Clone)]
pub struct EntityDraft {
    entity: BatchEntity,
    file: Option<Vec<u8>>,
}

impl EntityDraft {
    fn new(kind: String, xid: Option<String>) -> Self {
        Self {
            entity: BatchEntity {
                kind,
                xid: xid.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                ..BatchEntity::default()
            },
            file: None,
        }
    }

    fn key_value(&mut self, key: &str, value: Value) -> BatchResult<()> {
        if IGNORED_KEYS.contains(&key) {
            return Ok(());
        }
        let key = metadata_key(key);
        let value = if DATE_KEYS.contains(&key) {
            Value::String(format_date(&parse_date(key, &value)?))
        } else {
            value
        };
        match key {
            "name" => self.entity.name = value.as_str().map(str::to_string),
            "summary" => self.entity.summary = value.as_str().map(str::to_string),
            "xid" => {
                if let Some(xid) = value.as_str() {
                    self.entity.xid = xid.to_string();
                }
            }
            "rating" => self.entity.rating = value.as_f64(),
            "confidence" => self.entity.confidence = value.as_i64(),
            _ => {
                self.entity.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    fn attribute(&mut self, attribute: Attribute, unique: AttributeUniqueness) {
        let attributes = &mut self.entity.attribute;
        match unique {
            AttributeUniqueness::None => attributes.push(attribute),
            AttributeUniqueness::Type => {
                attributes.retain(|a| a.kind != attribute.kind);
                attributes.push(attribute);
            }
            AttributeUniqueness::TypeValue => {
                let exists = attributes
                    .iter()
                    .any(|a| a.kind == attribute.kind && a.value == attribute.value);
                if !exists {
                    attributes.push(attribute);
                }
            }
        }
    }

    fn tag(&mut self, tag: Tag) {
        if !self.entity.tag.contains(&tag) {
            self.entity.tag.push(tag);
        }
    }

    fn security_label(&mut self, label: SecurityLabel) {
        if !self.entity.security_label.iter().any(|l| l.name == label.name) {
            self.entity.security_label.push(label);
        }
    }

    fn association(&mut self, xid: String) {
        if !self.entity.associated_group_xid.contains(&xid) {
            self.entity.associated_group_xid.push(xid);
        }
    }

    fn finish(mut self) -> (BatchEntity, Option<Vec<u8>>) {
        self.entity.attribute.retain(Attribute::is_valid);
        self.entity.tag.retain(Tag::is_valid);
        (self.entity, self.file)
    }
}

/// Shared builder surface for groups and indicators
pub trait EntityBuilder: Sized {
    /// Mutable access to the draft
    fn draft_mut(&mut self) -> &mut EntityDraft;

    /// Consume into the draft
    fn into_draft(self) -> EntityDraft;

    /// External id of the entity
    fn xid(&mut self) -> &str {
        &self.draft_mut().entity.xid
    }

    /// Set a metadata key
    ///
    /// # Errors
    /// Returns [`BatchError::InvalidDate`] for an unparseable date key.
    fn key_value(mut self, key: &str, value: impl Into<Value>) -> BatchResult<Self> {
        self.draft_mut().key_value(key, value.into())?;
        Ok(self)
    }

    /// Set a date metadata key
    #[must_use]
    fn date(mut self, key: &str, date: DateTime<Utc>) -> Self {
        self.draft_mut()
            .entity
            .extra
            .insert(metadata_key(key).to_string(), Value::String(format_date(&date)));
        self
    }

    /// Add an attribute with default uniqueness
    #[must_use]
    fn attribute(self, attribute: Attribute) -> Self {
        self.attribute_with(attribute, AttributeUniqueness::default())
    }

    /// Add an attribute with explicit uniqueness
    #[must_use]
    fn attribute_with(mut self, attribute: Attribute, unique: AttributeUniqueness) -> Self {
        self.draft_mut().attribute(attribute, unique);
        self
    }

    /// Add a tag
    #[must_use]
    fn tag(mut self, name: impl Into<String>) -> Self {
        self.draft_mut().tag(Tag::new(name));
        self
    }

    /// Add a security label
    #[must_use]
    fn security_label(mut self, label: SecurityLabel) -> Self {
        self.draft_mut().security_label(label);
        self
    }

    /// Associate with a group by xid
    #[must_use]
    fn association(mut self, xid: impl Into<String>) -> Self {
        self.draft_mut().association(xid.into());
        self
    }

    /// Finish the entity, dropping invalid attributes and tags
    #[must_use]
    fn build(self) -> BatchEntity {
        self.into_draft().finish().0
    }

    /// Finish the entity along with any attached file content
    #[must_use]
    fn build_with_file(self) -> (BatchEntity, Option<Vec<u8>>) {
        self.into_draft().finish()
    }
}

/// Builder for group entities
#[derive(Debug, Clone)]
pub struct GroupBuilder {
    draft: EntityDraft,
}

impl GroupBuilder {
    /// Create new group builder with a random xid
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        let mut draft = EntityDraft::new(kind.into(), None);
        draft.entity.name = Some(name.into());
        Self { draft }
    }

    /// Replace the generated xid
    #[inline]
    #[must_use]
    pub fn with_xid(mut self, xid: impl Into<String>) -> Self {
        self.draft.entity.xid = xid.into();
        self
    }

    /// Attach a file to a Document or Report
    #[must_use]
    pub fn file(mut self, file_name: impl Into<String>, content: Vec<u8>) -> Self {
        self.draft
            .entity
            .extra
            .insert("fileName".to_string(), Value::String(file_name.into()));
        self.draft.file = Some(content);
        self
    }
}

impl EntityBuilder for GroupBuilder {
    fn draft_mut(&mut self) -> &mut EntityDraft {
        &mut self.draft
    }

    fn into_draft(self) -> EntityDraft {
        self.draft
    }
}

/// Builder for indicator entities
#[derive(Debug, Clone)]
pub struct IndicatorBuilder {
    draft: EntityDraft,
}

impl IndicatorBuilder {
    /// Create new indicator builder with a random xid
    #[must_use]
    pub fn new(kind: impl Into<String>, summary: impl Into<String>) -> Self {
        let mut draft = EntityDraft::new(kind.into(), None);
        draft.entity.summary = Some(summary.into());
        Self { draft }
    }

    /// Replace the generated xid
    #[inline]
    #[must_use]
    pub fn with_xid(mut self, xid: impl Into<String>) -> Self {
        self.draft.entity.xid = xid.into();
        self
    }

    /// Set rating
    #[inline]
    #[must_use]
    pub fn rating(mut self, rating: f64) -> Self {
        self.draft.entity.rating = Some(rating);
        self
    }

    /// Set confidence
    #[inline]
    #[must_use]
    pub fn confidence(mut self, confidence: i64) -> Self {
        self.draft.entity.confidence = Some(confidence);
        self
    }
}

impl EntityBuilder for IndicatorBuilder {
    fn draft_mut(&mut self) -> &mut EntityDraft {
        &mut self.draft
    }

    fn into_draft(self) -> EntityDraft {
        self.draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn metadata_keys_are_mapped() {
        let group = GroupBuilder::new("Email", "phish")
            .key_value("from_addr", "a@b.c")
            .unwrap()
            .key_value("subject", "hello")
            .unwrap()
            .key_value("file_content", "ignored")
            .unwrap()
            .build();
        assert_eq!(group.extra_str("from"), Some("a@b.c"));
        assert_eq!(group.extra_str("subject"), Some("hello"));
        assert!(!group.extra.contains_key("file_content"));
    }

    #[test]
    fn dates_are_normalized() {
        let group = GroupBuilder::new("Event", "e")
            .key_value("event_date", "2024-03-05")
            .unwrap()
            .key_value("first_seen", 0)
            .unwrap()
            .key_value("publish_date", "2024-03-05T10:11:12+02:00")
            .unwrap()
            .build();
        assert_eq!(group.extra_str("eventDate"), Some("2024-03-05T00:00:00Z"));
        assert_eq!(group.extra_str("firstSeen"), Some("1970-01-01T00:00:00Z"));
        assert_eq!(group.extra_str("publishDate"), Some("2024-03-05T08:11:12Z"));
    }

    #[test]
    fn bad_date_is_rejected() {
        let err = GroupBuilder::new("Event", "e")
            .key_value("event_date", "yesterday")
            .unwrap_err();
        assert!(matches!(err, BatchError::InvalidDate { key, .. } if key == "eventDate"));
    }

    #[test]
    fn xids_default_to_uuid() {
        let a = GroupBuilder::new("Threat", "t").build();
        let b = GroupBuilder::new("Threat", "t").build();
        assert_ne!(a.xid, b.xid);
        assert!(uuid::Uuid::parse_str(&a.xid).is_ok());
        assert_eq!(GroupBuilder::new("Threat", "t").with_xid("fixed").build().xid, "fixed");
    }

    #[test]
    fn attribute_uniqueness() {
        let group = GroupBuilder::new("Threat", "t")
            .attribute(Attribute::new("Description", "a"))
            .attribute(Attribute::new("Description", "a"))
            .attribute(Attribute::new("Description", "b"))
            .attribute_with(Attribute::new("Source", "x"), AttributeUniqueness::None)
            .attribute_with(Attribute::new("Source", "x"), AttributeUniqueness::None)
            .build();
        assert_eq!(group.attribute.len(), 4);

        let replaced = GroupBuilder::new("Threat", "t")
            .attribute(Attribute::new("Description", "a"))
            .attribute(Attribute::new("Description", "b"))
            .attribute_with(Attribute::new("Description", "c"), AttributeUniqueness::Type)
            .build();
        assert_eq!(replaced.attribute, vec![Attribute::new("Description", "c")]);
    }

    #[test]
    fn invalid_attributes_and_tags_are_dropped() {
        let group = GroupBuilder::new("Threat", "t")
            .attribute(Attribute::new("Description", ""))
            .tag("")
            .tag("malware")
            .tag("malware")
            .build();
        assert!(group.attribute.is_empty());
        assert_eq!(group.tag, vec![Tag::new("malware")]);
    }

    #[test]
    fn associations_and_labels() {
        let group = GroupBuilder::new("Incident", "i")
            .association("x-1")
            .association("x-1")
            .security_label(SecurityLabel::new("TLP:AMBER"))
            .security_label(SecurityLabel::new("TLP:AMBER").with_color("ffc000"))
            .build();
        assert_eq!(group.associated_group_xid, vec!["x-1".to_string()]);
        assert_eq!(group.security_label.len(), 1);
    }

    #[test]
    fn document_file() {
        let (doc, file) = GroupBuilder::new("Document", "d")
            .file("report.pdf", b"%PDF".to_vec())
            .build_with_file();
        assert_eq!(doc.extra_str("fileName"), Some("report.pdf"));
        assert_eq!(file.as_deref(), Some(&b"%PDF"[..]));
    }

    #[test]
    fn indicator_fields() {
        let indicator = IndicatorBuilder::new("Address", "1.1.1.1")
            .with_xid("i-1")
            .rating(3.0)
            .confidence(80)
            .tag("dns")
            .build();
        assert_eq!(
            serde_json::to_value(&indicator).unwrap(),
            json!({
                "type": "Address",
                "summary": "1.1.1.1",
                "xid": "i-1",
                "rating": 3.0,
                "confidence": 80,
                "tag": [{"name": "dns"}]
            })
        );
    }
}
