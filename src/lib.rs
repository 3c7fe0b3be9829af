// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # logpump
//!
//! Feeds an ordered, partitioned event log into a continuously running query
//! and survives restarts without losing or double-counting events.
//!
//! ## Features
//!
//! - **Partitioned Pull**: One reader per partition, a bounded merge queue and
//!   an idle/time window that decides when a cycle ends
//! - **Checkpointed Resume**: Read positions plus an opaque query checkpoint
//!   are the only durable state, replaced after every step
//! - **HTTP Log Source**: Retry, backoff and rate limiting against a remote
//!   log service
//! - **Integrity Checks**: Delivered events must match position advances
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use logpump::engine::{LoopConfig, ProcessingStep, ResumableLoop};
//! use logpump::pull::{Cancellation, PullConfig, PullCycle};
//! use logpump::query::CountQuery;
//! use logpump::source::MemoryLogSource;
//! use logpump::state::StateManager;
//! use logpump::{decode::JsonEventDecoder, trigger::start_instance, StartPosition};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> logpump::Result<()> {
//!     let source = Arc::new(MemoryLogSource::new(4));
//!     let states = StateManager::new("./state");
//!     start_instance(source.as_ref(), &states, "orders", StartPosition::FromZero).await;
//!
//!     let cycle = PullCycle::new(
//!         source,
//!         Arc::new(JsonEventDecoder::new()),
//!         PullConfig::default(),
//!         Cancellation::new(),
//!     );
//!     let resumable = ResumableLoop::new(ProcessingStep::new(cycle), LoopConfig::default());
//!     resumable.run(&mut CountQuery::new(), &states, "orders").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ResumableLoop ──▶ ProcessingStep ──▶ PullCycle
//!      ▲                                  │
//!      │            ┌─────────────────────┼─────────────────────┐
//!      │            ▼                     ▼                     ▼
//!      │     PartitionReader 0    PartitionReader 1 ...  PartitionReader N
//!      │            └──────────────▶ MergeQueue ◀───────────────┘
//!      │                                  │
//!      └──── QueryState ◀── checkpoint ◀── QueryAdapter
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Event decoding
pub mod decode;

/// HTTP client with retry and rate limiting
pub mod http;

/// Log sources
pub mod source;

/// Partitioned pull engine
pub mod pull;

/// Query engine boundary
pub mod query;

/// State management and checkpointing
pub mod state;

/// Processing step and resumable loop
pub mod engine;

/// Configuration
pub mod config;

/// Instance creation
pub mod trigger;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::PumpConfig;
pub use engine::{LoopConfig, ProcessingStep, ResumableLoop};
pub use state::{QueryState, StateManager};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
