//! Bizdesk Core
//!
//! Core types and logic for the Bizdesk back-office client.
//!
//! This crate contains:
//! - Domain types: pipelines, stage items, activity logs and books records
//! - DTOs: wire types exchanged with the accounting API
//! - Tree, lifecycle and session state machines
//! - Local storage: the key-value store, repositories and services

pub mod domain;
pub mod dto;
pub mod lifecycle;
pub mod repository;
pub mod service;
pub mod session;
pub mod store;
pub mod tree;
pub mod validation;
