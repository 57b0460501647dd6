//! Versioned Object Store
//!
//! In-memory store for `Deployment`, `ReplicaSet` and `Pod` objects with
//! compare-and-swap writes on `resourceVersion`, an owner index for
//! cascading deletion, and a per-kind watch bus.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use objects::{Deployment, ObjectMeta, PodTemplate};
//! use store::{Api, InMemoryStore, ObjectStore};
//!
//! # async fn example() -> Result<(), store::StoreError> {
//! let store: Arc<dyn ObjectStore> = Arc::new(InMemoryStore::default());
//! let deployments: Api<Deployment> = Api::namespaced(store, "default");
//!
//! let web = Deployment::new(
//!     ObjectMeta::new("default", "web"),
//!     3,
//!     PodTemplate::new("nginx:1.25").with_label("app", "web"),
//! );
//! let stored = deployments.create(web).await?;
//! assert_eq!(stored.metadata.resource_version, 1);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
#[cfg(feature = "test-util")]
pub mod faulty;
pub mod memory;
#[path = "trait.rs"]
pub mod store_trait;
pub mod watch;

pub use api::Api;
pub use error::StoreError;
#[cfg(feature = "test-util")]
pub use faulty::FaultInjectingStore;
pub use memory::InMemoryStore;
pub use store_trait::ObjectStore;
pub use watch::{DEFAULT_WATCH_BUFFER, Watch, WatchBus, WatchEvent};
