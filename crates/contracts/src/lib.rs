//! # Contracts
//!
//! Shared interface contracts: the data model, the persistence interface,
//! the observer seam and the configuration schema.
//! All business crates depend on this crate; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Readings are stamped with UTC wall-clock time at generation
//! - Order is only meaningful within one streaming session

mod config;
mod error;
mod observer;
mod reading;
mod repository;

pub use config::*;
pub use error::*;
pub use observer::*;
pub use reading::*;
pub use repository::*;
