//! Form validation
//!
//! Checks run before anything is written locally or sent to the API. A
//! failure lists every offending field so the whole form can be flagged at
//! once.

use std::fmt;
use thiserror::Error;

use crate::domain::books::ItemDraft;
use crate::domain::pipeline::PipelineItem;

/// A single field-level problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation failure carrying all field errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Validation failed: {}", join(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Default)]
struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: self.errors,
            })
        }
    }
}

/// Validates an item form
///
/// Items priced in USD are imported goods and must carry the SF number and
/// shipping weight.
pub fn validate_item_draft(draft: &ItemDraft) -> Result<(), ValidationError> {
    let mut errors = Collector::default();

    if draft.name.trim().is_empty() {
        errors.push("name", "Item name is required");
    }

    if let Some(price) = draft.price {
        if price < 0.0 {
            errors.push("price", "Price cannot be negative");
        }

        let is_usd = draft
            .currency
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case("usd"));
        if is_usd {
            if draft.sf_number.as_deref().is_none_or(|s| s.trim().is_empty()) {
                errors.push("sf_number", "SF number is required for USD prices");
            }
            if draft.weight.is_none_or(|w| w <= 0.0) {
                errors.push("weight", "Weight is required for USD prices");
            }
        }
    }

    errors.finish()
}

/// Validates a pipeline stage item
pub fn validate_pipeline_item(item: &PipelineItem) -> Result<(), ValidationError> {
    let mut errors = Collector::default();

    if item.company_name.trim().is_empty() {
        errors.push("company_name", "Company name is required");
    }

    if let (Some(date), Some(deadline)) = (item.date, item.deadline) {
        if deadline < date {
            errors.push("deadline", "Deadline cannot be before the item date");
        }
    }

    errors.finish()
}
