//! Core domain types
//!
//! This module contains the business entities shared by the local pipeline
//! store, the books API client and the CLI.

pub mod books;
pub mod log;
pub mod pipeline;
