//! Depletion and restock prediction engine.
//!
//! This crate turns tracked pantry items into projections and reminders:
//!
//! - [`depletion`]: time-based quantity decay, recorded in the usage ledger
//! - [`restock`]: creates, refreshes and retires restock reminders
//! - [`estimator`]: re-estimates consumption rates from restock history
//! - [`scheduler`]: daily tick, startup catch-up and periodic re-estimation
//! - [`engine`]: the [`PantryEngine`] facade tying them together
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use pantry_core::{ChangeType, ItemId, TrackingSettings};
//! use pantry_engine::{EngineConfig, PantryEngine, SystemClock};
//! use pantry_store::MemoryStore;
//! use rust_decimal::Decimal;
//!
//! # tokio_test_block_on(async {
//! let engine = PantryEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(SystemClock),
//!     EngineConfig::default(),
//! )
//! .unwrap();
//!
//! let id = ItemId::generate();
//! engine.register_item(id, "rice", Decimal::TWO, "kg").await.unwrap();
//! engine
//!     .enable_tracking(id, TrackingSettings::new(Decimal::new(5, 1), Decimal::TWO).unwrap())
//!     .await
//!     .unwrap();
//! engine
//!     .report_quantity_change(id, Decimal::ONE, ChangeType::ManualUpdate)
//!     .await
//!     .unwrap();
//!
//! let projection = engine.projection(&id).unwrap();
//! assert_eq!(projection.days_remaining, Some(Decimal::TWO));
//! assert!(projection.active_reminder.is_some());
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod config;
pub mod depletion;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod ledger;
pub mod locks;
pub mod restock;
pub mod retry;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use depletion::{DepletionOutcome, DepletionProcessor};
pub use engine::{ItemProjection, ItemUpdate, PantryEngine, QuantityReport, UnitStatus};
pub use error::{EngineError, Result};
pub use estimator::{RateEstimate, RateEstimator};
pub use ledger::Ledger;
pub use locks::{ItemGuard, ItemLocks};
pub use restock::{RestockAction, RestockManager};
pub use retry::{with_retry, RetryConfig, Retryable};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerStatus, TickReport, Trigger};
