//! # FAQ Engine Core
//!
//! Shared, runtime-agnostic logic for the FAQ query matching engine:
//! data model, similarity scorer, match pipeline, collaborator traits,
//! and the store abstraction.
//!
//! This crate contains no tokio, sqlx, network, or filesystem I/O.
//! External collaborators (morphological normalizer, embedding model
//! server, persistent stores) are reached through async traits; concrete
//! implementations live in the `faq-engine` app crate.

pub mod error;
pub mod matcher;
pub mod models;
pub mod provider;
pub mod score;
pub mod store;
pub mod tags;
pub mod vector;
