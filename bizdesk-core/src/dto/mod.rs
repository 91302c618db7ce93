//! Data Transfer Objects
//!
//! Wire-level shapes exchanged with the books API and lightweight views
//! of domain entities used for listing. Adapters here turn loosely shaped
//! API payloads into the canonical domain types.

pub mod auth;
pub mod books;
pub mod page;
pub mod pipeline;
