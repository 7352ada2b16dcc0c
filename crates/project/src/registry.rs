//! Closed registry mapping payload type tags to essential-field sets.
//!
//! Route handlers declare which type tag their payload represents; the
//! summarization layer looks the tag up here rather than inspecting the
//! payload shape at runtime. The registry is populated at startup and
//! read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The fields of a payload type that survive projection.
///
/// Versioned alongside the type's schema. Must include an identifier
/// field so a caller holding a preview can fetch full details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssentialFieldSet {
    /// Type tag this set applies to (e.g. `booking`).
    pub type_tag: String,
    /// Ordered field paths kept by projection; dotted paths allowed.
    pub fields: Vec<String>,
    /// Name of the identifier field within `fields`.
    pub id_field: String,
}

impl EssentialFieldSet {
    /// Build a field set, normalizing the field list to owned strings.
    pub fn new(type_tag: &str, fields: &[&str], id_field: &str) -> Self {
        Self {
            type_tag: type_tag.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            id_field: id_field.to_string(),
        }
    }
}

/// Registry of essential-field sets, keyed by payload type tag.
#[derive(Debug, Clone, Default)]
pub struct FieldSetRegistry {
    sets: HashMap<String, EssentialFieldSet>,
}

impl FieldSetRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated for the property-management payload types.
    ///
    /// `financial_report` carries its own aggregate-level field set; it is
    /// deliberately not an alias of `financial_transaction`, whose
    /// per-transaction fields would be meaningless on a report.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(EssentialFieldSet::new(
            "listing",
            &[
                "id",
                "name",
                "address.city",
                "address.countryCode",
                "bedroomsNumber",
                "basePrice",
                "status",
            ],
            "id",
        ));
        registry.register(EssentialFieldSet::new(
            "booking",
            &[
                "id",
                "guestName",
                "checkIn",
                "checkOut",
                "listingId",
                "status",
                "totalPrice",
            ],
            "id",
        ));
        registry.register(EssentialFieldSet::new(
            "financial_transaction",
            &["id", "bookingId", "type", "amount", "currency", "date", "status"],
            "id",
        ));
        registry.register(EssentialFieldSet::new(
            "financial_report",
            &[
                "reportId",
                "periodStart",
                "periodEnd",
                "currency",
                "totalRevenue",
                "totalExpenses",
                "netIncome",
            ],
            "reportId",
        ));
        registry
    }

    /// Register (or replace) the field set for a type tag.
    pub fn register(&mut self, set: EssentialFieldSet) {
        self.sets.insert(set.type_tag.clone(), set);
    }

    /// Look up the field set for a type tag.
    ///
    /// A miss is not an error here; callers fall back to identifier-only
    /// projection or passthrough (see the summarization service).
    pub fn get(&self, type_tag: &str) -> Option<&EssentialFieldSet> {
        self.sets.get(type_tag)
    }

    /// Registered type tags, sorted for stable output.
    pub fn type_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.sets.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_property_payload_types() {
        let registry = FieldSetRegistry::with_defaults();
        assert_eq!(
            registry.type_tags(),
            vec!["booking", "financial_report", "financial_transaction", "listing"]
        );
    }

    #[test]
    fn every_default_set_includes_its_identifier() {
        let registry = FieldSetRegistry::with_defaults();
        for tag in registry.type_tags() {
            let set = registry.get(tag).unwrap();
            assert!(
                set.fields.contains(&set.id_field),
                "{tag} must project its identifier field"
            );
        }
    }

    #[test]
    fn report_set_differs_from_transaction_set() {
        let registry = FieldSetRegistry::with_defaults();
        let report = registry.get("financial_report").unwrap();
        let transaction = registry.get("financial_transaction").unwrap();
        assert_ne!(report.fields, transaction.fields);
        assert_eq!(report.id_field, "reportId");
    }

    #[test]
    fn register_replaces_existing_set() {
        let mut registry = FieldSetRegistry::with_defaults();
        registry.register(EssentialFieldSet::new("booking", &["id"], "id"));
        assert_eq!(registry.get("booking").unwrap().fields, vec!["id"]);
    }

    #[test]
    fn unknown_tag_misses() {
        let registry = FieldSetRegistry::with_defaults();
        assert!(registry.get("webhook").is_none());
    }
}
