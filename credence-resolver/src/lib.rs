//! CREDENCE Resolver - License Verification Orchestration
//!
//! Given a license number and jurisdiction, returns a verified identity by
//! consulting the record cache and then a fixed-priority chain of
//! unreliable sources:
//!
//! ```text
//! cache (fresh?) -> official registry -> index A -> index B -> static table
//! ```
//!
//! # Example
//!
//! ```no_run
//! use credence_core::{ResolverConfig, VerificationQuery};
//! use credence_resolver::Resolver;
//!
//! # async fn demo() -> credence_core::CredenceResult<()> {
//! let resolver = Resolver::from_config(&ResolverConfig::offline(), None)?;
//! let record = resolver.resolve(&VerificationQuery::new("240110", "SP")).await?;
//! assert!(record.is_some());
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod resolver;
pub mod telemetry;
pub mod trace;

pub use chain::{ProviderChain, ProviderSlot};
pub use resolver::{record_from_hit, Resolver};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
pub use trace::{AttemptOutcome, AttemptRecord, CacheOutcome, Resolution};

pub use tokio_util::sync::CancellationToken;
