//! Playbook variable addresses
//!
//! Provides [`Variable`], the parsed form of `#<namespace>:<app id>:<name>!<Type>`.

use crate::variable_type::VariableType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Namespace used by app-produced variables
pub const APP_NAMESPACE: &str = "App";

/// Choice input meaning "no value selected"
pub const SELECT_SENTINEL: &str = "-- Select --";

/// Choice input meaning "use the companion literal value"
pub const VARIABLE_INPUT_SENTINEL: &str = "-- Variable Input --";

/// Scanner for variables embedded in free text
static EMBEDDED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#[A-Za-z]+:[\w.\-]+:[\w.\-\[\]]+![A-Za-z]+")
        .unwrap_or_else(|e| unreachable!("embedded variable pattern is valid: {e}"))
});

/// Typed address of a datum in the key-value store
///
/// Immutable once constructed; only its encoded form is used as a store key.
///
/// # Examples
/// - `#App:0001:s1!String`
/// - `#App:1234:dup.name!StringArray`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable {
    namespace: String,
    app_id: String,
    name: String,
    kind: VariableType,
}

impl Variable {
    /// Create an app variable (`#App:<app_id>:<name>!<kind>`)
    ///
    /// # Errors
    /// Returns error if a segment is empty or would not survive encoding
    pub fn new(
        app_id: impl Into<String>,
        name: impl Into<String>,
        kind: VariableType,
    ) -> Result<Self, AddressError> {
        Self::with_namespace(APP_NAMESPACE, app_id, name, kind)
    }

    /// Create a variable in an explicit namespace
    ///
    /// # Errors
    /// Returns error if a segment is empty or would not survive encoding
    pub fn with_namespace(
        namespace: impl Into<String>,
        app_id: impl Into<String>,
        name: impl Into<String>,
        kind: VariableType,
    ) -> Result<Self, AddressError> {
        let namespace = namespace.into();
        let app_id = app_id.into();
        let name = name.into();

        check_segment("namespace", &namespace, &[':', '!', '#'])?;
        check_segment("app id", &app_id, &[':', '!'])?;
        check_segment("name", &name, &['!'])?;

        Ok(Self {
            namespace,
            app_id,
            name,
            kind,
        })
    }

    /// Parse a raw variable string
    ///
    /// # Errors
    /// Returns [`AddressError::Malformed`] if `#`, the colon segments or the
    /// `!type` suffix are missing, and [`AddressError::UnknownType`] for an
    /// unregistered type suffix.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let malformed = |reason: &str| AddressError::Malformed {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };

        let body = raw.strip_prefix('#').ok_or_else(|| malformed("missing '#'"))?;
        let (head, tag) = body
            .rsplit_once('!')
            .ok_or_else(|| malformed("missing '!type' suffix"))?;
        if tag.is_empty() {
            return Err(malformed("empty type suffix"));
        }

        let mut segments = head.splitn(3, ':');
        let (Some(namespace), Some(app_id), Some(name)) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(malformed("fewer than 3 ':' segments"));
        };
        if namespace.is_empty() || app_id.is_empty() || name.is_empty() {
            return Err(malformed("empty segment"));
        }

        let kind = tag.parse::<VariableType>()?;
        Self::with_namespace(namespace, app_id, name, kind)
    }

    /// Check whether a string is exactly one well-formed variable
    #[inline]
    #[must_use]
    pub fn is_variable(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    /// Find every well-formed variable embedded in free text
    ///
    /// Matches with unregistered types are skipped.
    #[must_use]
    pub fn find_embedded(text: &str) -> Vec<(std::ops::Range<usize>, Self)> {
        EMBEDDED
            .find_iter(text)
            .filter_map(|m| Self::parse(m.as_str()).ok().map(|v| (m.range(), v)))
            .collect()
    }

    /// Namespace segment (usually `App`)
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// App id segment
    #[inline]
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Variable name (may contain dots)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    #[inline]
    #[must_use]
    pub fn kind(&self) -> VariableType {
        self.kind
    }

    /// Same address with a different type suffix
    #[inline]
    #[must_use]
    pub fn retyped(&self, kind: VariableType) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }
}

fn check_segment(label: &'static str, value: &str, forbidden: &[char]) -> Result<(), AddressError> {
    if value.is_empty() {
        return Err(AddressError::EmptySegment(label));
    }
    if let Some(c) = value.chars().find(|c| forbidden.contains(c)) {
        return Err(AddressError::InvalidSegment {
            segment: label,
            value: value.to_string(),
            character: c,
        });
    }
    Ok(())
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}:{}:{}!{}",
            self.namespace, self.app_id, self.name, self.kind
        )
    }
}

impl FromStr for Variable {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors related to variable addresses
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// String is not a variable
    #[error("malformed variable '{raw}': {reason}")]
    Malformed {
        /// Input as given
        raw: String,
        /// What is missing or wrong
        reason: String,
    },

    /// Type suffix is not registered
    #[error("unknown variable type: {0}")]
    UnknownType(String),

    /// Empty segment in explicit construction
    #[error("variable {0} must not be empty")]
    EmptySegment(&'static str),

    /// Segment contains a separator character
    #[error("variable {segment} '{value}' must not contain '{character}'")]
    InvalidSegment {
        /// Segment name (`namespace`, `app id` or `name`)
        segment: &'static str,
        /// Offending segment value
        value: String,
        /// Separator found in the value
        character: char,
    },
}
