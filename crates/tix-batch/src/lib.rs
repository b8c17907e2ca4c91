//! tix Batch - batch submission model
//!
//! Builds group and indicator entities in the platform's batch layout and
//! reads and writes `batch-*.json` logs.
//!
//! # Example
//!
//! ```
//! use tix_batch::{Attribute, BatchSubmission, EntityBuilder, GroupBuilder, IndicatorBuilder};
//!
//! let mut submission = BatchSubmission::new();
//! let xid = submission.add_group(
//!     GroupBuilder::new("Adversary", "APT-X").attribute(Attribute::new("Description", "bad")),
//! );
//! submission.add_indicator(IndicatorBuilder::new("Address", "10.0.0.1").association(xid));
//! assert_eq!(submission.data().total(), 2);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod builder;
mod error;
mod model;
mod submission;

pub use builder::{
    format_date, metadata_key, parse_date, AttributeUniqueness, EntityBuilder, EntityDraft,
    GroupBuilder, IndicatorBuilder, DATE_FORMAT,
};
pub use error::{BatchError, BatchResult};
pub use model::{
    is_group_type, is_indicator_type, Attribute, BatchEntity, SecurityLabel, Tag, GROUP_TYPES,
    INDICATOR_TYPES,
};
pub use submission::{log_files, BatchData, BatchSubmission, GROUP_SECTION, INDICATOR_SECTION};

/// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
