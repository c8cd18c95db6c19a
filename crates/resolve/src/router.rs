use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EntityConfig;

pub const CONFIDENCE_PRIMARY_KEY: f32 = 0.95;
pub const CONFIDENCE_EMAIL: f32 = 0.99;
pub const CONFIDENCE_FALLBACK: f32 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    PrimaryKey,
    Email,
    BusinessId,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::PrimaryKey => write!(f, "primary_key"),
            IdentifierKind::Email => write!(f, "email"),
            IdentifierKind::BusinessId => write!(f, "business_id"),
        }
    }
}

/// The outcome of classifying one identifier: which lookup method to call
/// and how much to trust the classification. Produced per call, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub input: String,
    pub kind: IdentifierKind,
    pub target_method: String,
    pub confidence: f32,
}

/// Classify an identifier against one entity's config. Ordered checks,
/// first match wins; the catch-all means every input gets a decision.
///
/// The router does not verify that `target_method` is implemented for the
/// entity — dispatch reports that as an error (see `Resolvable`).
pub fn classify(identifier: &str, config: &EntityConfig) -> RoutingDecision {
    let input = identifier.trim();

    // All-digit input reads as a database primary key, unless this entity
    // hands out numeric business ids (e.g. transfer numbers).
    if !input.is_empty()
        && input.chars().all(|c| c.is_ascii_digit())
        && !config.numeric_business_ids_allowed
    {
        return RoutingDecision {
            input: input.to_string(),
            kind: IdentifierKind::PrimaryKey,
            target_method: config.primary_key_method.clone(),
            confidence: CONFIDENCE_PRIMARY_KEY,
        };
    }

    if input.contains('@') && config.has_email_identifier {
        return RoutingDecision {
            input: input.to_string(),
            kind: IdentifierKind::Email,
            target_method: config.email_method.clone(),
            confidence: CONFIDENCE_EMAIL,
        };
    }

    for p in &config.patterns {
        if p.regex.is_match(input) {
            return RoutingDecision {
                input: input.to_string(),
                kind: IdentifierKind::BusinessId,
                target_method: p.spec.target_method.clone(),
                confidence: p.spec.confidence,
            };
        }
    }

    RoutingDecision {
        input: input.to_string(),
        kind: IdentifierKind::BusinessId,
        target_method: config.fallback_method.clone(),
        confidence: CONFIDENCE_FALLBACK,
    }
}

/// Capability for repositories that can be queried by an arbitrary
/// identifier. Implementors supply the entity config and the dispatch from
/// a routing decision to their concrete lookup queries; `find` composes
/// the two. Replaces method-grafting with plain trait composition.
#[allow(async_fn_in_trait)]
pub trait Resolvable {
    type Entity;
    type Error;

    fn config(&self) -> &EntityConfig;

    /// Run the lookup named by `decision.target_method`. Must error (not
    /// panic, not silently miss) when the method is not implemented.
    async fn dispatch(
        &self,
        decision: &RoutingDecision,
    ) -> Result<Option<Self::Entity>, Self::Error>;

    async fn find(&self, identifier: &str) -> Result<Option<Self::Entity>, Self::Error> {
        let decision = classify(identifier, self.config());
        self.dispatch(&decision).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntityConfigSet;

    fn set() -> EntityConfigSet {
        EntityConfigSet::with_defaults().unwrap()
    }

    #[test]
    fn numeric_input_routes_to_primary_key() {
        let registry = set();
        let decision = classify("42", registry.config_for("gauge"));
        assert_eq!(decision.kind, IdentifierKind::PrimaryKey);
        assert_eq!(decision.target_method, "find_by_primary_key");
        assert_eq!(decision.confidence, 0.95);
    }

    #[test]
    fn numeric_input_trims_whitespace() {
        let registry = set();
        let decision = classify("  42  ", registry.config_for("gauge"));
        assert_eq!(decision.kind, IdentifierKind::PrimaryKey);
        assert_eq!(decision.input, "42");
    }

    #[test]
    fn gauge_tag_routes_to_business_id() {
        let registry = set();
        let decision = classify("AC0002", registry.config_for("gauge"));
        assert_eq!(decision.kind, IdentifierKind::BusinessId);
        assert_eq!(decision.target_method, "find_by_gauge_id");
        assert_eq!(decision.confidence, 0.95);
    }

    #[test]
    fn serial_number_routes_to_second_pattern() {
        let registry = set();
        let decision = classify("SN-123456", registry.config_for("gauge"));
        assert_eq!(decision.target_method, "find_by_serial");
        assert_eq!(decision.confidence, 0.90);
    }

    #[test]
    fn email_beats_business_id_patterns() {
        let registry = set();
        let decision = classify("jane.doe@example.com", registry.config_for("user"));
        assert_eq!(decision.kind, IdentifierKind::Email);
        assert_eq!(decision.target_method, "find_by_email");
        assert_eq!(decision.confidence, 0.99);
    }

    #[test]
    fn email_on_entity_without_email_falls_through() {
        let registry = set();
        // Gauges have no email identifier; '@' input lands on the catch-all.
        let decision = classify("foo@bar", registry.config_for("gauge"));
        assert_eq!(decision.kind, IdentifierKind::BusinessId);
        assert_eq!(decision.confidence, CONFIDENCE_FALLBACK);
    }

    #[test]
    fn numeric_business_ids_bypass_primary_key_check() {
        let registry = set();
        let decision = classify("123456", registry.config_for("transfer"));
        assert_eq!(decision.kind, IdentifierKind::BusinessId);
        assert_eq!(decision.target_method, "find_by_transfer_number");
    }

    #[test]
    fn unmatched_input_gets_catch_all_decision() {
        let registry = set();
        let decision = classify("something weird", registry.config_for("gauge"));
        assert_eq!(decision.kind, IdentifierKind::BusinessId);
        assert_eq!(decision.target_method, "find_by_business_id");
        assert_eq!(decision.confidence, 0.70);
    }

    #[test]
    fn first_declared_pattern_wins_on_overlap() {
        use crate::config::{EntityConfig, EntityConfigSpec, IdPattern};
        // Two patterns that both match "AB1234"; declaration order decides.
        let spec = EntityConfigSpec {
            primary_key_name: "id".to_string(),
            primary_key_method: "find_by_primary_key".to_string(),
            business_id_columns: vec![],
            patterns: vec![
                IdPattern {
                    name: "first".to_string(),
                    pattern: r"^[A-Z]{2}\d{4}$".to_string(),
                    target_method: "find_by_first".to_string(),
                    confidence: 0.80,
                },
                IdPattern {
                    name: "second".to_string(),
                    pattern: r"^[A-Z]+\d+$".to_string(),
                    target_method: "find_by_second".to_string(),
                    confidence: 0.99,
                },
            ],
            has_email_identifier: false,
            email_method: "find_by_email".to_string(),
            fallback_method: "find_by_business_id".to_string(),
            numeric_business_ids_allowed: false,
        };
        let config = EntityConfig::compile("overlap", spec).unwrap();
        let decision = classify("AB1234", &config);
        assert_eq!(decision.target_method, "find_by_first");
        assert_eq!(decision.confidence, 0.80);
    }

    #[test]
    fn unknown_entity_numeric_routes_to_primary_key() {
        let registry = set();
        let decision = classify("7", registry.config_for("not_registered"));
        assert_eq!(decision.kind, IdentifierKind::PrimaryKey);
    }

    #[test]
    fn empty_input_is_catch_all_not_primary_key() {
        let registry = set();
        let decision = classify("   ", registry.config_for("gauge"));
        assert_eq!(decision.kind, IdentifierKind::BusinessId);
        assert_eq!(decision.confidence, CONFIDENCE_FALLBACK);
    }
}
