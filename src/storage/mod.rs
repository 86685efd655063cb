//! Persistence for simulated deployments.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use brax::storage::Snapshot;
//!
//! let snapshot = Snapshot::capture(&deployment);
//! snapshot.save(Path::new(".brax/snapshot.json"))?;
//! let restored = Snapshot::load(Path::new(".brax/snapshot.json"))?.deployment;
//! ```

pub mod snapshot;

pub use snapshot::Snapshot;
