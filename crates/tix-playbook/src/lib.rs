//! tix Playbook - Key-value data exchange for automation apps
//!
//! Reads, writes and stages typed playbook variables:
//! - [`KvStore`]: the store collaborator, with [`MemoryStore`] in-process
//! - [`KvStoreClient`]: typed reads and writes in one execution context
//! - [`OutputAccumulator`]: staged outputs flushed once per execution
//! - [`InputBinder`]: raw app arguments bound to typed inputs
//!
//! # Example
//!
//! ```rust
//! use tix_playbook::{KvStoreClient, MemoryStore, OutputAccumulator};
//! use tix_variable::{TypedValue, Variable, VariableType};
//!
//! let client = KvStoreClient::new(MemoryStore::new(), "context-1");
//! let ips = Variable::parse("#App:1:ips!StringArray").unwrap();
//!
//! let mut outputs = OutputAccumulator::new(&client, [ips.clone()]);
//! outputs.add_output("ips", "1.1.1.1", VariableType::StringArray, true).unwrap();
//! outputs.flush().unwrap();
//!
//! assert_eq!(
//!     client.read(&ips).unwrap(),
//!     Some(TypedValue::StringArray(vec!["1.1.1.1".into()]))
//! );
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod accumulator;
mod binder;
mod client;
mod config;
mod error;
mod store;

pub use accumulator::OutputAccumulator;
pub use binder::{BoundInputs, InputBinder, InputSchema};
pub use client::{decode, encode, KvStoreClient};
pub use config::PlaybookConfig;
pub use error::{BindError, PlaybookError, PlaybookResult, StoreError, StoreResult};
pub use store::{KvStore, MemoryStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
