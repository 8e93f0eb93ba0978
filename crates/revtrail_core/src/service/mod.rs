//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate revision, change-set and activity persistence into one
//!   unit of work.
//! - Keep callers decoupled from repository and synthesis details.

pub mod revision_session;
