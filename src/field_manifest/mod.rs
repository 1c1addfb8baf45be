//! Field Manifest: the frozen catalogue of valid data-field
//! identifiers. Loaded once at startup; immutable for the life of the
//! process — this catalogue is never rewritten by the core.

mod error;

pub use error::{FieldManifestError, FieldManifestResult};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Metadata attached to a canonical field name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// On-disk catalogue shape: canonical fields plus an alias table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogueFile {
    fields: Vec<FieldMetadata>,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

/// Nearest-match suggestion for an unknown field name.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub canonical_name: String,
    pub confidence: f64,
}

/// The immutable, frozen field catalogue.
///
/// `is_valid` is a `HashMap` lookup (O(1) amortised); `all_canonical_names`
/// walks a pre-sorted `Vec` built once at load time.
#[derive(Debug)]
pub struct FieldManifest {
    canonical: HashMap<String, FieldMetadata>,
    aliases: HashMap<String, String>,
    sorted_names: Vec<String>,
}

impl FieldManifest {
    /// Load the catalogue from an on-disk JSON or YAML file. Failing to
    /// load is fatal.
    pub fn load(path: impl AsRef<Path>) -> FieldManifestResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| FieldManifestError::Io { path: path.to_path_buf(), source })?;

        let catalogue: CatalogueFile = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .map_err(|source| FieldManifestError::Parse { path: path.to_path_buf(), message: source.to_string() })?
        } else {
            serde_yaml::from_str(&content)
                .map_err(|source| FieldManifestError::Parse { path: path.to_path_buf(), message: source.to_string() })?
        };

        Self::from_catalogue(catalogue)
    }

    fn from_catalogue(catalogue: CatalogueFile) -> FieldManifestResult<Self> {
        if catalogue.fields.is_empty() {
            return Err(FieldManifestError::Empty);
        }

        let mut canonical = HashMap::with_capacity(catalogue.fields.len());
        for field in catalogue.fields {
            let key = format!("{}:{}", field.category, field.name);
            canonical.insert(key, field);
        }

        let mut sorted_names: Vec<String> = canonical.keys().cloned().collect();
        sorted_names.sort();

        Ok(Self { canonical, aliases: catalogue.aliases, sorted_names })
    }

    /// Construct directly from in-memory fields, for tests and the
    /// `MockProposer` fixtures.
    pub fn from_fields(fields: Vec<FieldMetadata>, aliases: HashMap<String, String>) -> FieldManifestResult<Self> {
        Self::from_catalogue(CatalogueFile { fields, aliases })
    }

    /// O(1) membership check. Resolves through the alias table first.
    pub fn is_valid(&self, name: &str) -> bool {
        self.canonical.contains_key(name) || self.aliases.contains_key(name)
    }

    /// Resolve an alias to its canonical name, or pass through unchanged.
    pub fn resolve(&self, name: &str) -> Option<String> {
        if self.canonical.contains_key(name) {
            return Some(name.to_string());
        }
        self.aliases.get(name).cloned()
    }

    /// Nearest canonical name within edit distance 2, alphabetical tiebreak.
    pub fn suggest(&self, name: &str) -> Option<Suggestion> {
        let mut best: Option<(String, usize)> = None;
        for candidate in &self.sorted_names {
            let distance = strsim::levenshtein(name, candidate);
            if distance > 2 {
                continue;
            }
            match &best {
                None => best = Some((candidate.clone(), distance)),
                Some((best_name, best_distance)) => {
                    if distance < *best_distance || (distance == *best_distance && candidate < best_name) {
                        best = Some((candidate.clone(), distance));
                    }
                }
            }
        }
        best.map(|(canonical_name, distance)| Suggestion {
            canonical_name,
            confidence: 1.0 - (distance as f64 / 3.0),
        })
    }

    /// All canonical names, alphabetically ordered.
    pub fn all_canonical_names(&self) -> impl Iterator<Item = &str> {
        self.sorted_names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> FieldManifest {
        FieldManifest::from_fields(
            vec![
                FieldMetadata { category: "etl".into(), name: "adj_close".into(), description: String::new() },
                FieldMetadata { category: "etl".into(), name: "volume".into(), description: String::new() },
                FieldMetadata { category: "macro".into(), name: "cpi".into(), description: String::new() },
            ],
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn valid_field_is_recognized() {
        let m = manifest();
        assert!(m.is_valid("etl:adj_close"));
        assert!(!m.is_valid("price:close_price"));
    }

    #[test]
    fn suggest_finds_near_match() {
        let m = manifest();
        let s = m.suggest("etl:adj_clse").unwrap();
        assert_eq!(s.canonical_name, "etl:adj_close");
    }

    #[test]
    fn suggest_respects_distance_cap() {
        let m = manifest();
        assert!(m.suggest("totally:unrelated_field_name").is_none());
    }

    #[test]
    fn all_canonical_names_sorted() {
        let m = manifest();
        let names: Vec<_> = m.all_canonical_names().collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn empty_catalogue_is_rejected() {
        assert!(FieldManifest::from_fields(vec![], HashMap::new()).is_err());
    }

    #[test]
    fn alias_resolves_to_canonical() {
        let mut aliases = HashMap::new();
        aliases.insert("etl:close".to_string(), "etl:adj_close".to_string());
        let m = FieldManifest::from_fields(
            vec![FieldMetadata { category: "etl".into(), name: "adj_close".into(), description: String::new() }],
            aliases,
        )
        .unwrap();
        assert!(m.is_valid("etl:close"));
        assert_eq!(m.resolve("etl:close").as_deref(), Some("etl:adj_close"));
    }
}
