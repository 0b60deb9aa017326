//! Filter-and-aggregate pipeline behind an employee attrition dashboard.
//!
//! A dataset is loaded once ([`data::loader::load_file`]), narrowed by a
//! [`FilterSpec`], and summarised into a [`dashboard::Snapshot`] keyed by
//! chart name. Rendering the snapshot is left to the caller; [`report`]
//! offers a plain text and JSON form.

pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod logging;
pub mod report;
pub mod state;

pub use data::{FilterSpec, Predicate, Table, Value};
pub use error::{LoadError, SchemaError};
