//! Batch entity model
//!
//! Provides [`BatchEntity`] and its nested [`Attribute`], [`Tag`] and
//! [`SecurityLabel`] records, serialized in the platform's batch layout.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Built-in group types
pub const GROUP_TYPES: [&str; 11] = [
    "Adversary",
    "Campaign",
    "Document",
    "Email",
    "Event",
    "Incident",
    "Intrusion Set",
    "Report",
    "Signature",
    "Task",
    "Threat",
];

/// Built-in indicator types
pub const INDICATOR_TYPES: [&str; 10] = [
    "Address",
    "ASN",
    "CIDR",
    "EmailAddress",
    "File",
    "Host",
    "Mutex",
    "Registry Key",
    "URL",
    "User Agent",
];

/// Check if a type is a built-in group type
#[inline]
#[must_use]
pub fn is_group_type(kind: &str) -> bool {
    GROUP_TYPES.contains(&kind)
}

/// Check if a type is a built-in indicator type
#[inline]
#[must_use]
pub fn is_indicator_type(kind: &str) -> bool {
    INDICATOR_TYPES.contains(&kind)
}

/// Entity attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute type
    #[serde(rename = "type")]
    pub kind: String,
    /// Attribute value
    #[serde(default)]
    pub value: Option<String>,
    /// Display flag
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub displayed: bool,
    /// Attribution source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Attribute {
    /// Create new attribute
    #[must_use]
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: Some(value.into()),
            displayed: false,
            source: None,
        }
    }

    /// Set display flag
    #[inline]
    #[must_use]
    pub fn with_displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    /// Set attribution source
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// An attribute without a value is never submitted
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// Entity tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name
    pub name: String,
}

impl Tag {
    /// Create new tag
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Empty tags are never submitted
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Entity security label
///
/// Reads either a bare name or a full object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LabelRepr")]
pub struct SecurityLabel {
    /// Label name
    pub name: String,
    /// Label description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Label color (hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SecurityLabel {
    /// Create new label
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            color: None,
        }
    }

    /// Set description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set color
    #[inline]
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        color: Option<String>,
    },
}

impl From<LabelRepr> for SecurityLabel {
    fn from(repr: LabelRepr) -> Self {
        match repr {
            LabelRepr::Name(name) => Self::new(name),
            LabelRepr::Full {
                name,
                description,
                color,
            } => Self {
                name,
                description,
                color,
            },
        }
    }
}

/// Group or indicator in a batch submission
///
/// Groups carry a `name`, indicators a `summary`. Metadata the model does
/// not name (`fileName`, `eventDate`, ...) lives in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntity {
    /// Entity type
    #[serde(rename = "type")]
    pub kind: String,
    /// Group name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Indicator summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// External id
    #[serde(default)]
    pub xid: String,
    /// Indicator rating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Indicator confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<i64>,
    /// Attributes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute: Vec<Attribute>,
    /// Tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<Tag>,
    /// Security labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_label: Vec<SecurityLabel>,
    /// Associated group xids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associated_group_xid: Vec<String>,
    /// Remaining metadata
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BatchEntity {
    /// Name for groups, summary for indicators
    #[must_use]
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.summary.as_deref())
            .unwrap_or_default()
    }

    /// Extra metadata as a string
    #[must_use]
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Check if this entity is a group
    #[inline]
    #[must_use]
    pub fn is_group(&self) -> bool {
        is_group_type(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attribute_validity() {
        assert!(Attribute::new("Description", "x").is_valid());
        assert!(!Attribute::new("Description", "").is_valid());
        let mut missing = Attribute::new("Description", "x");
        missing.value = None;
        assert!(!missing.is_valid());
    }

    #[test]
    fn attribute_serialization_omits_defaults() {
        let plain = serde_json::to_value(Attribute::new("Source", "a")).unwrap();
        assert_eq!(plain, json!({"type": "Source", "value": "a"}));
        let full = serde_json::to_value(
            Attribute::new("Source", "a").with_displayed(true).with_source("feed"),
        )
        .unwrap();
        assert_eq!(
            full,
            json!({"type": "Source", "value": "a", "displayed": true, "source": "feed"})
        );
    }

    #[test]
    fn entity_keeps_unknown_metadata() {
        let raw = json!({
            "type": "Document",
            "name": "doc",
            "xid": "x-1",
            "fileName": "a.pdf",
            "securityLabel": [{"name": "TLP:RED"}],
            "associatedGroupXid": ["x-0"]
        });
        let entity: BatchEntity = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entity.label(), "doc");
        assert_eq!(entity.extra_str("fileName"), Some("a.pdf"));
        assert_eq!(entity.security_label[0].name, "TLP:RED");
        assert!(entity.is_group());
        assert_eq!(serde_json::to_value(&entity).unwrap(), raw);
    }

    #[test]
    fn labels_accept_bare_names() {
        let labels: Vec<SecurityLabel> =
            serde_json::from_value(json!(["TLP:WHITE", {"name": "PII", "color": "ff0000"}]))
                .unwrap();
        assert_eq!(labels[0], SecurityLabel::new("TLP:WHITE"));
        assert_eq!(labels[1].color.as_deref(), Some("ff0000"));
    }

    #[test]
    fn type_tables() {
        assert!(is_group_type("Intrusion Set"));
        assert!(is_indicator_type("EmailAddress"));
        assert!(!is_indicator_type("Adversary"));
    }
}
