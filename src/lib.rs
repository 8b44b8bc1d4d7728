//! # ax-progression - adaptive lesson progression core
//!
//! Drives a learner through authored math lessons and keeps their
//! progress:
//!
//! - **Answer evaluation** - single-choice and multi-step keys
//! - **Lesson sessions** - core items, threshold-gated challenge sets,
//!   remediation offers and hint escalation
//! - **Gating** - which lessons are open given grade mastery,
//!   diagnostics and prior completions
//! - **Progress** - completion flags, badges, accuracy roll-ups
//!
//! ## Modules
//!
//! - [`content`] - lesson model, catalog loading and validation
//! - [`evaluator`] - answer keys
//! - [`session`] - lesson state machine and its async driver
//! - [`gating`] - unlock rules
//! - [`progress`] - persistence seam and aggregation
//! - [`events`] - learning analytics events
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ax_progression::content::{GradeLevel, InMemoryContent};
//! use ax_progression::events::EventBus;
//! use ax_progression::progress::{InMemoryProgressStore, ProgressAggregator};
//! use ax_progression::Services;
//!
//! let services = Services::new(
//!     Arc::new(InMemoryContent::default()),
//!     Arc::new(InMemoryProgressStore::new()),
//!     Arc::new(EventBus::new()),
//! );
//! let progress = ProgressAggregator::new(services).grade_progress(GradeLevel::Kindergarten);
//! assert_eq!(progress.completed_lesson_count, 0);
//! ```

pub mod config;
pub mod content;
pub mod evaluator;
pub mod events;
pub mod gating;
pub mod logging;
pub mod progress;
pub mod services;
pub mod session;

pub use config::Config;
pub use services::Services;
pub use session::{LessonSession, SessionDriver, SessionError, SessionSnapshot, SessionState};
