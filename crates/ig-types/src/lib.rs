//! Foundation types for Infragraph.
//!
//! This crate provides the temporal and enumeration types shared by the
//! graph store and the diff engine. Every other Infragraph crate depends on
//! `ig-types`.
//!
//! # Key Types
//!
//! - [`Timestamp`] — Microsecond-precision UTC instant used for diff windows
//! - [`TimeRange`] — Half-open `[from, to)` validity window of a diff
//! - [`DiffAction`] — What happened to a node, attribute, or relationship
//! - [`PropertyType`] — Closed set of edge/property kinds a diff property describes

pub mod action;
pub mod error;
pub mod property;
pub mod timestamp;

pub use action::DiffAction;
pub use error::TypeError;
pub use property::PropertyType;
pub use timestamp::{TimeRange, Timestamp};
