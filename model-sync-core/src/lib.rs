#![doc = "model-sync-core: core pipeline for keeping client models in sync with server models."]

//! This crate contains the domain types, collaborator interfaces and orchestration for
//! model-sync. Concrete HTTP adapters for the review host and the transformation service
//! live in the `model-sync` binary crate; the git-backed repository controller lives here.
//!
//! # Usage
//! Build a [`config::PipelineContext`], pick a [`changeset::ChangeSource`], and run a
//! [`synchronise::SyncOrchestrator`] over implementations of the [`contract`] traits.

pub mod changeset;
pub mod config;
pub mod contract;
pub mod error;
pub mod mapper;
pub mod outcome;
pub mod repository;
pub mod synchronise;
pub mod transform;
mod writer;

pub use error::{SyncError, SyncFailure};
pub use outcome::{FailedFile, PipelineOutcome, Termination};
