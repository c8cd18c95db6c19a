use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("entity '{entity}': invalid pattern '{name}': {source}")]
    InvalidPattern {
        entity: String,
        name: String,
        source: regex::Error,
    },
    #[error("Failed to parse registry TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// One business-identifier pattern: a regex plus the lookup method it routes
/// to and the confidence assigned when it matches. Patterns are evaluated in
/// declaration order; the first match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdPattern {
    pub name: String,
    pub pattern: String,
    pub target_method: String,
    #[serde(default = "default_pattern_confidence")]
    pub confidence: f32,
}

fn default_pattern_confidence() -> f32 {
    0.90
}

/// Serialized form of an entity config, as written in a registry TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfigSpec {
    pub primary_key_name: String,
    #[serde(default = "default_primary_key_method")]
    pub primary_key_method: String,
    #[serde(default)]
    pub business_id_columns: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<IdPattern>,
    #[serde(default)]
    pub has_email_identifier: bool,
    #[serde(default = "default_email_method")]
    pub email_method: String,
    #[serde(default = "default_fallback_method")]
    pub fallback_method: String,
    #[serde(default)]
    pub numeric_business_ids_allowed: bool,
}

fn default_primary_key_method() -> String {
    "find_by_primary_key".to_string()
}

fn default_email_method() -> String {
    "find_by_email".to_string()
}

fn default_fallback_method() -> String {
    "find_by_business_id".to_string()
}

pub(crate) struct CompiledPattern {
    pub spec: IdPattern,
    pub regex: Regex,
}

/// Per-entity routing metadata with patterns compiled once at construction.
pub struct EntityConfig {
    pub primary_key_name: String,
    pub primary_key_method: String,
    pub business_id_columns: Vec<String>,
    pub(crate) patterns: Vec<CompiledPattern>,
    pub has_email_identifier: bool,
    pub email_method: String,
    pub fallback_method: String,
    pub numeric_business_ids_allowed: bool,
}

impl EntityConfig {
    pub fn compile(entity: &str, spec: EntityConfigSpec) -> Result<Self, ResolveError> {
        let mut patterns = Vec::with_capacity(spec.patterns.len());
        for p in spec.patterns {
            let regex = Regex::new(&p.pattern).map_err(|source| ResolveError::InvalidPattern {
                entity: entity.to_string(),
                name: p.name.clone(),
                source,
            })?;
            patterns.push(CompiledPattern { spec: p, regex });
        }
        Ok(EntityConfig {
            primary_key_name: spec.primary_key_name,
            primary_key_method: spec.primary_key_method,
            business_id_columns: spec.business_id_columns,
            patterns,
            has_email_identifier: spec.has_email_identifier,
            email_method: spec.email_method,
            fallback_method: spec.fallback_method,
            numeric_business_ids_allowed: spec.numeric_business_ids_allowed,
        })
    }

    /// PK-only routing: no patterns, no email, numeric ids treated as
    /// primary keys. What unknown entity types fall back to.
    fn safe_default() -> Self {
        EntityConfig {
            primary_key_name: "id".to_string(),
            primary_key_method: default_primary_key_method(),
            business_id_columns: Vec::new(),
            patterns: Vec::new(),
            has_email_identifier: false,
            email_method: default_email_method(),
            fallback_method: default_fallback_method(),
            numeric_business_ids_allowed: false,
        }
    }

    pub fn pattern_names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.spec.name.as_str())
    }
}

/// Registry of entity configs. An explicit value handed to consumers, not a
/// global: construction order and test setup stay visible at the call site.
pub struct EntityConfigSet {
    configs: BTreeMap<String, EntityConfig>,
    fallback: EntityConfig,
}

impl EntityConfigSet {
    pub fn new() -> Self {
        EntityConfigSet {
            configs: BTreeMap::new(),
            fallback: EntityConfig::safe_default(),
        }
    }

    /// The four entity types the suite routes on. The patterns are
    /// literals, so the only error a caller can see here is a typo in a
    /// built-in regex.
    pub fn with_defaults() -> Result<Self, ResolveError> {
        let mut set = Self::new();
        for (entity, spec) in default_specs() {
            let config = EntityConfig::compile(&entity, spec)?;
            set.insert(&entity, config);
        }
        Ok(set)
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, ResolveError> {
        let specs: BTreeMap<String, EntityConfigSpec> = toml::from_str(toml_content)?;
        let mut set = Self::new();
        for (entity, spec) in specs {
            let config = EntityConfig::compile(&entity, spec)?;
            set.insert(&entity, config);
        }
        Ok(set)
    }

    pub fn insert(&mut self, entity: &str, config: EntityConfig) {
        self.configs.insert(entity.to_string(), config);
    }

    /// Config for `entity_type`, or the PK-only safe default for unknown
    /// types. Unknown types are a registry gap worth surfacing, so the
    /// degraded path logs before returning.
    pub fn config_for(&self, entity_type: &str) -> &EntityConfig {
        match self.configs.get(entity_type) {
            Some(config) => config,
            None => {
                tracing::warn!(
                    entity_type,
                    "no entity config registered; degrading to primary-key-only routing"
                );
                &self.fallback
            }
        }
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(|k| k.as_str())
    }
}

fn default_specs() -> Vec<(String, EntityConfigSpec)> {
    let pattern = |name: &str, pattern: &str, target_method: &str, confidence: f32| IdPattern {
        name: name.to_string(),
        pattern: pattern.to_string(),
        target_method: target_method.to_string(),
        confidence,
    };

    vec![
        (
            "gauge".to_string(),
            EntityConfigSpec {
                primary_key_name: "id".to_string(),
                primary_key_method: default_primary_key_method(),
                business_id_columns: vec!["gauge_id".to_string(), "serial_number".to_string()],
                patterns: vec![
                    pattern("gauge_tag", r"^[A-Z]{2,3}\d{4}[AB]?$", "find_by_gauge_id", 0.95),
                    pattern("serial_number", r"^SN-?\d{5,}$", "find_by_serial", 0.90),
                ],
                has_email_identifier: false,
                email_method: default_email_method(),
                fallback_method: default_fallback_method(),
                numeric_business_ids_allowed: false,
            },
        ),
        (
            "user".to_string(),
            EntityConfigSpec {
                primary_key_name: "id".to_string(),
                primary_key_method: default_primary_key_method(),
                business_id_columns: vec!["username".to_string()],
                patterns: vec![pattern(
                    "username",
                    r"^[a-z][a-z0-9_.-]{2,31}$",
                    "find_by_username",
                    0.85,
                )],
                has_email_identifier: true,
                email_method: default_email_method(),
                fallback_method: default_fallback_method(),
                numeric_business_ids_allowed: false,
            },
        ),
        (
            "rejection_reason".to_string(),
            EntityConfigSpec {
                primary_key_name: "id".to_string(),
                primary_key_method: default_primary_key_method(),
                business_id_columns: vec!["code".to_string()],
                patterns: vec![pattern("reason_code", r"^RR-\d{3}$", "find_by_code", 0.90)],
                has_email_identifier: false,
                email_method: default_email_method(),
                fallback_method: default_fallback_method(),
                numeric_business_ids_allowed: false,
            },
        ),
        (
            // Transfer numbers are numeric business ids, so all-digit input
            // must not short-circuit to primary-key routing here.
            "transfer".to_string(),
            EntityConfigSpec {
                primary_key_name: "id".to_string(),
                primary_key_method: default_primary_key_method(),
                business_id_columns: vec!["transfer_number".to_string()],
                patterns: vec![pattern(
                    "transfer_number",
                    r"^\d{6,}$",
                    "find_by_transfer_number",
                    0.90,
                )],
                has_email_identifier: false,
                email_method: default_email_method(),
                fallback_method: default_fallback_method(),
                numeric_business_ids_allowed: true,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_defaults_registers_all_entity_types() {
        let set = EntityConfigSet::with_defaults().unwrap();
        let types: Vec<&str> = set.entity_types().collect();
        assert_eq!(types, vec!["gauge", "rejection_reason", "transfer", "user"]);
    }

    #[test]
    fn unknown_entity_type_gets_safe_default() {
        let set = EntityConfigSet::with_defaults().unwrap();
        let config = set.config_for("warehouse");
        assert!(config.patterns.is_empty());
        assert!(!config.has_email_identifier);
        assert!(!config.numeric_business_ids_allowed);
        assert_eq!(config.primary_key_method, "find_by_primary_key");
    }

    #[test]
    fn gauge_config_keeps_pattern_declaration_order() {
        let set = EntityConfigSet::with_defaults().unwrap();
        let names: Vec<&str> = set.config_for("gauge").pattern_names().collect();
        assert_eq!(names, vec!["gauge_tag", "serial_number"]);
    }

    #[test]
    fn compile_rejects_invalid_regex() {
        let spec = EntityConfigSpec {
            primary_key_name: "id".to_string(),
            primary_key_method: default_primary_key_method(),
            business_id_columns: vec![],
            patterns: vec![IdPattern {
                name: "broken".to_string(),
                pattern: "([".to_string(),
                target_method: "find_by_code".to_string(),
                confidence: 0.9,
            }],
            has_email_identifier: false,
            email_method: default_email_method(),
            fallback_method: default_fallback_method(),
            numeric_business_ids_allowed: false,
        };
        assert!(matches!(
            EntityConfig::compile("bad", spec),
            Err(ResolveError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn from_toml_round_trip() {
        let toml_content = r#"
            [asset]
            primary_key_name = "id"
            business_id_columns = ["tag"]

            [[asset.patterns]]
            name = "asset_tag"
            pattern = '^AST-\d{4}$'
            target_method = "find_by_tag"
        "#;
        let set = EntityConfigSet::from_toml(toml_content).unwrap();
        let config = set.config_for("asset");
        assert_eq!(config.primary_key_name, "id");
        // Omitted confidence falls back to 0.90.
        assert_eq!(config.patterns[0].spec.confidence, 0.90);
        assert_eq!(config.patterns[0].spec.target_method, "find_by_tag");
    }

    #[test]
    fn from_toml_surfaces_bad_pattern() {
        let toml_content = r#"
            [asset]
            primary_key_name = "id"

            [[asset.patterns]]
            name = "broken"
            pattern = "(["
            target_method = "find_by_tag"
        "#;
        assert!(EntityConfigSet::from_toml(toml_content).is_err());
    }
}
