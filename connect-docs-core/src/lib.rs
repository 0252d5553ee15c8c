#![doc = "connect-docs-core: core logic library for connect-docs."]

//! This crate holds every algorithm behind the Redpanda Connect documentation
//! data: `$ref` resolution and override merging, schema diffing between
//! versions, reconciliation of the OSS/Cloud/cgo binary inventories, and the
//! doc fragment emitter.
//!
//! # Usage
//! The `connect-docs` CLI is a thin layer over this crate. Pure operations
//! (merge, diff, reconcile) take and return `serde_json::Value` documents;
//! binary analysis goes through the traits in [`contract`].

pub mod binary_analysis;
pub mod component_map;
pub mod contract;
pub mod diff;
pub mod emit;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod inventory;
pub mod merge;
pub mod model;
pub mod reconcile;
pub mod reference;
pub mod report;
pub mod schema;

pub use error::{DocsError, DocsResult, InventoryError};
