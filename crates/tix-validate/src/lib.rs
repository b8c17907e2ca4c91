//! tix Validate - assertions against the store and the platform
//!
//! Provides two validators:
//! - [`StoreValidator`]: playbook variables in the store against expected
//!   data, through any comparison operator
//! - [`PlatformValidator`]: expected entities against the live platform,
//!   including seeded sampling of a run's batch submissions
//!
//! Mismatches never abort a run; they are logged with a typed reason and
//! reported as failed outcomes.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use tix_compare::CompareOptions;
//! use tix_playbook::{KvStoreClient, MemoryStore};
//! use tix_validate::StoreValidator;
//! use tix_variable::{TypedValue, Variable};
//!
//! let client = KvStoreClient::new(MemoryStore::new(), "ctx");
//! let var = Variable::parse("#App:1:out!String").unwrap();
//! client.write(&var, &TypedValue::from("hello")).unwrap();
//!
//! let outcome = StoreValidator::new(&client)
//!     .data("#App:1:out!String", &json!("hello"), None, &CompareOptions::new())
//!     .unwrap();
//! assert!(outcome.passed);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod api;
mod config;
mod error;
mod platform;
mod sampling;
mod store;

pub use api::{success, ApiClient, ApiResponse, EntityLookup, GroupSummary};
pub use config::ValidatorConfig;
pub use error::{EntityError, ValidateError, ValidateResult};
pub use platform::{
    compare_dicts, compare_lists, normalize_summary, percent_decode, EntityReport,
    PlatformValidator, BATCH_FAILURE,
};
pub use sampling::{partition, partition_total, sample_size, Partitions, SampleCriteria, Sampler};
pub use store::{truncate_for_log, StoreValidator, ValidationOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
