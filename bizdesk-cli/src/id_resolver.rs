//! ID resolver module
//!
//! Lets users type a short, unambiguous prefix instead of a full UUID.

use anyhow::{Result, anyhow};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use bizdesk_core::domain::pipeline::PipelineNode;
use bizdesk_core::tree::flatten_tree;

/// Identifier that can be either a full UUID or an unambiguous prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdOrPrefix {
    Full(Uuid),
    Prefix(String),
}

impl FromStr for IdOrPrefix {
    type Err = Infallible;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match Uuid::parse_str(input) {
            Ok(uuid) => IdOrPrefix::Full(uuid),
            Err(_) => IdOrPrefix::Prefix(input.trim().to_lowercase()),
        })
    }
}

impl fmt::Display for IdOrPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdOrPrefix::Full(uuid) => write!(f, "{}", uuid),
            IdOrPrefix::Prefix(prefix) => write!(f, "{}", prefix),
        }
    }
}

/// Resolve a pipeline ID or prefix against every pipeline in `forest`
///
/// # Errors
/// Returns an error if no pipeline matches or the prefix is ambiguous.
pub fn resolve_pipeline_id(forest: &[PipelineNode], id: &IdOrPrefix) -> Result<Uuid> {
    let ids = flatten_tree(forest).into_iter().map(|r| r.id);
    resolve("pipeline", ids, id)
}

/// Resolve a stage item ID or prefix within one pipeline
pub fn resolve_item_id(node: &PipelineNode, id: &IdOrPrefix) -> Result<Uuid> {
    let ids = node.stages.iter().flat_map(|s| s.items.iter().map(|i| i.id));
    resolve("item", ids, id)
}

fn resolve(kind: &str, candidates: impl Iterator<Item = Uuid>, id: &IdOrPrefix) -> Result<Uuid> {
    let prefix = match id {
        IdOrPrefix::Full(uuid) => return Ok(*uuid),
        IdOrPrefix::Prefix(prefix) if prefix.is_empty() => {
            return Err(anyhow!("Empty {} ID", kind));
        }
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let matches: Vec<Uuid> = candidates
        .filter(|c| c.to_string().starts_with(prefix.as_str()))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No {} found with ID starting with '{}'", kind, prefix)),
        [only] => Ok(*only),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple {}s: {}",
                prefix,
                kind,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_parse() {
        let full = "0b6f6a2e-95a4-4c61-9d1b-3f4f7d0c1a11";
        assert_eq!(
            full.parse::<IdOrPrefix>().unwrap(),
            IdOrPrefix::Full(id(full))
        );
        assert_eq!(
            "0B6F".parse::<IdOrPrefix>().unwrap(),
            IdOrPrefix::Prefix("0b6f".to_string())
        );
    }

    #[test]
    fn test_resolve_prefix() {
        let a = id("0b6f6a2e-95a4-4c61-9d1b-3f4f7d0c1a11");
        let b = id("0b7a0000-95a4-4c61-9d1b-3f4f7d0c1a11");
        let candidates = || [a, b].into_iter();

        assert_eq!(resolve("pipeline", candidates(), &"0b6".parse().unwrap()).unwrap(), a);

        let err = resolve("pipeline", candidates(), &"0b".parse().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("Ambiguous prefix '0b'"));

        let err = resolve("pipeline", candidates(), &"ff".parse().unwrap()).unwrap_err();
        assert!(err.to_string().contains("No pipeline found"));
    }

    #[test]
    fn test_full_id_skips_lookup() {
        let a = id("0b6f6a2e-95a4-4c61-9d1b-3f4f7d0c1a11");
        assert_eq!(resolve("item", std::iter::empty(), &IdOrPrefix::Full(a)).unwrap(), a);
    }
}
