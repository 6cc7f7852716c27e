//! Core types shared by the gatehouse crates.
//!
//! This crate provides the strongly-typed identifiers for gated resources.
//! Pages are resources too: a `PageId` converts into a `ResourceId` so page
//! and component decisions can share one access map.

pub mod id;

pub use id::{PageId, ParseIdError, ResourceId};
