//! Data model shared with peer services.
//!
//! Pure transport records. This service defines the wire shapes; producing
//! and consuming them is peer-service business.

pub mod account;

pub use account::{Account, Quote};
