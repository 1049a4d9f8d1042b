//! Request-type registry and subject classification.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A document type that can be requested by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestType {
    /// Label matched against subjects, also used as the document title.
    pub name: String,
    /// Fields that must be extracted before the document is issued, in order.
    pub required_fields: Vec<String>,
}

impl RequestType {
    pub fn new<S: Into<String>>(name: &str, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.to_string(),
            required_fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered, immutable set of request types.
///
/// Iteration order is the declaration order and decides classification ties.
#[derive(Debug, Clone)]
pub struct RequestRegistry {
    types: Vec<RequestType>,
}

impl RequestRegistry {
    /// Build a registry, rejecting blank or duplicate names.
    pub fn new(types: Vec<RequestType>) -> Result<Self, ConfigError> {
        if types.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "registry".into(),
                message: "at least one request type is required".into(),
            });
        }
        let mut seen = Vec::with_capacity(types.len());
        for t in &types {
            let key = t.name.trim().to_lowercase();
            if key.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "registry".into(),
                    message: "request type name must not be blank".into(),
                });
            }
            if seen.contains(&key) {
                return Err(ConfigError::InvalidValue {
                    key: "registry".into(),
                    message: format!("duplicate request type '{}'", t.name),
                });
            }
            seen.push(key);
        }
        Ok(Self { types })
    }

    /// The two attestation types issued by the school office.
    pub fn builtin() -> Self {
        Self {
            types: vec![
                RequestType::new(
                    "attestation de scolarite",
                    [
                        "Nom",
                        "Prenom",
                        "Annee d'inscription",
                        "Numero de telephone",
                        "Filliere",
                    ],
                ),
                RequestType::new(
                    "attestation de stage",
                    [
                        "Nom",
                        "Prenom",
                        "Annee de stage",
                        "Numero de telephone",
                        "Filliere",
                    ],
                ),
            ],
        }
    }

    /// Parse a JSON array of `{ "name", "required_fields" }` objects.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let types: Vec<RequestType> =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::new(types)
    }

    /// Load a registry from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// First request type whose name is a case-insensitive substring of `subject`.
    pub fn classify(&self, subject: &str) -> Option<&RequestType> {
        let subject = subject.to_lowercase();
        self.types
            .iter()
            .find(|t| subject.contains(&t.name.trim().to_lowercase()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestType> {
        self.types.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_case_insensitive_substring() {
        let registry = RequestRegistry::builtin();
        let t = registry.classify("Attestation de Scolarite Request").unwrap();
        assert_eq!(t.name, "attestation de scolarite");
        let t = registry.classify("attestation de stage - urgent").unwrap();
        assert_eq!(t.name, "attestation de stage");
        assert!(registry.classify("RE: ATTESTATION DE STAGE").is_some());
    }

    #[test]
    fn classify_unmatched_returns_none() {
        let registry = RequestRegistry::builtin();
        assert!(registry.classify("General Inquiry").is_none());
        assert!(registry.classify("").is_none());
        assert!(registry.classify("attestation").is_none());
    }

    #[test]
    fn classify_first_declared_wins() {
        let registry = RequestRegistry::new(vec![
            RequestType::new("attestation de stage", ["Nom"]),
            RequestType::new("attestation de scolarite", ["Prenom"]),
        ])
        .unwrap();
        let t = registry
            .classify("attestation de scolarite et attestation de stage")
            .unwrap();
        assert_eq!(t.name, "attestation de stage");
    }

    #[test]
    fn builtin_has_five_fields_each() {
        let registry = RequestRegistry::builtin();
        assert_eq!(registry.len(), 2);
        assert!(registry.iter().all(|t| t.required_fields.len() == 5));
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["attestation de scolarite", "attestation de stage"]
        );
    }

    #[test]
    fn from_json_preserves_order() {
        let registry = RequestRegistry::from_json(
            r#"[
                {"name": "releve de notes", "required_fields": ["Nom", "CNE"]},
                {"name": "attestation de stage", "required_fields": ["Nom"]}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["releve de notes", "attestation de stage"]
        );
        assert_eq!(
            registry.classify("Releve de notes SVP").unwrap().required_fields,
            vec!["Nom", "CNE"]
        );
    }

    #[test]
    fn rejects_duplicates_and_blanks() {
        assert!(
            RequestRegistry::new(vec![
                RequestType::new("a", ["x"]),
                RequestType::new("A ", ["y"]),
            ])
            .is_err()
        );
        assert!(RequestRegistry::new(vec![RequestType::new("  ", ["x"])]).is_err());
        assert!(RequestRegistry::new(vec![]).is_err());
        assert!(RequestRegistry::from_json("not json").is_err());
    }
}
