//! Completeness check for extracted fields.

use crate::pipeline::extractor::ExtractedFields;

/// Required fields with no usable value, in `required` order.
///
/// An empty result means the request is complete.
pub fn missing_fields(extracted: &ExtractedFields, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|field| !extracted.get(field).is_some_and(|v| v.is_present()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extractor::{Absence, FieldValue};

    fn required() -> Vec<String> {
        ["Nom", "Prenom", "Annee de stage", "Numero de telephone", "Filliere"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn complete_request_has_no_missing_fields() {
        let fields: ExtractedFields = [
            ("Nom", "Alaoui"),
            ("Prenom", "Youssef"),
            ("Annee de stage", "2024"),
            ("Numero de telephone", "0600000000"),
            ("Filliere", "Genie Informatique"),
        ]
        .into_iter()
        .collect();
        assert!(missing_fields(&fields, &required()).is_empty());
    }

    #[test]
    fn missing_fields_keep_required_order() {
        let mut fields = ExtractedFields::new();
        fields.insert("Filliere", FieldValue::Absent(Absence::Empty));
        fields.insert("Nom", FieldValue::Extracted("Alaoui".into()));
        fields.insert(
            "Prenom",
            FieldValue::Absent(Absence::ServiceError("timeout".into())),
        );
        fields.insert("Annee de stage", FieldValue::Extracted("2024".into()));
        assert_eq!(
            missing_fields(&fields, &required()),
            vec!["Prenom", "Numero de telephone", "Filliere"]
        );
    }

    #[test]
    fn whitespace_only_value_counts_as_missing() {
        let mut fields = ExtractedFields::new();
        fields.insert("Nom", FieldValue::Extracted("  ".into()));
        assert_eq!(missing_fields(&fields, &["Nom".to_string()]), vec!["Nom"]);
    }
}
