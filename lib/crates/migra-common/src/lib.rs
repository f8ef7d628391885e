//! Request and response bodies for the OpenStack services used by migra.
//!
//! Only the fields the migration engine reads or writes are modelled; unknown
//! fields in responses are ignored.

pub mod compute;
pub mod error;
pub mod identity;
pub mod image;
pub mod network;

pub use error::extract_message;
