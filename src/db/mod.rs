//! Database access

pub mod queries;
