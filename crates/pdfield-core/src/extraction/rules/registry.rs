//! Label registry: which pattern bank and validators apply to each label.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::patterns::builtin_definitions;
use super::{FieldRuleDef, PatternBank, Validator, ValidatorSet};
use crate::error::PatternError;
use crate::models::Label;

/// Declarative label: ordered field rules plus optional validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDefinition {
    pub label: Label,
    pub fields: Vec<FieldRuleDef>,
}

/// Compiled bank and validators for one label.
#[derive(Debug, Clone, Default)]
pub struct LabelProfile {
    pub bank: PatternBank,
    pub validators: ValidatorSet,
}

impl LabelProfile {
    pub fn new(bank: PatternBank, validators: ValidatorSet) -> Self {
        Self { bank, validators }
    }

    /// Compile a declarative definition.
    pub fn from_definition(definition: &LabelDefinition) -> Result<Self, PatternError> {
        let mut bank = PatternBank::new();
        let mut validators = ValidatorSet::new();

        for rule in &definition.fields {
            bank.insert(&rule.field, &rule.patterns)?;
            if let Some(spec) = &rule.validator {
                validators.insert(rule.field.clone(), spec.build(&rule.field)?);
            }
        }

        Ok(Self { bank, validators })
    }

    /// Attach or replace a field validator, e.g. a custom predicate.
    pub fn with_validator(mut self, field: impl Into<String>, validator: Validator) -> Self {
        self.validators.insert(field, validator);
        self
    }
}

/// Registry of label profiles. New labels are added by registration; the
/// extraction logic never changes for them.
#[derive(Debug, Clone, Default)]
pub struct LabelRegistry {
    profiles: BTreeMap<Label, Arc<LabelProfile>>,
    empty: Arc<LabelProfile>,
}

impl LabelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the bundled labels.
    pub fn with_builtins() -> Result<Self, PatternError> {
        let mut registry = Self::new();
        for definition in builtin_definitions() {
            registry.register_definition(definition)?;
        }
        Ok(registry)
    }

    /// Register (or replace) a compiled profile.
    pub fn register(&mut self, label: impl Into<Label>, profile: LabelProfile) {
        let label = label.into();
        debug!("Registering label {} with {} fields", label, profile.bank.len());
        self.profiles.insert(label, Arc::new(profile));
    }

    /// Compile and register a declarative definition.
    pub fn register_definition(&mut self, definition: &LabelDefinition) -> Result<(), PatternError> {
        let profile = LabelProfile::from_definition(definition)?;
        self.register(definition.label.clone(), profile);
        Ok(())
    }

    pub fn get(&self, label: &Label) -> Option<Arc<LabelProfile>> {
        self.profiles.get(label).cloned()
    }

    /// Profile for a label, or an empty one for unknown labels so that every
    /// field comes out absent instead of failing.
    pub fn profile_or_empty(&self, label: &Label) -> Arc<LabelProfile> {
        self.get(label).unwrap_or_else(|| {
            debug!("No pattern bank registered for label {}", label);
            Arc::clone(&self.empty)
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.profiles.keys()
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.profiles.contains_key(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::rules::patterns::{CARTEIRA_OAB_LABEL, TELA_SISTEMA_LABEL};
    use crate::extraction::rules::{FieldValidator, ValidatorSpec};

    #[test]
    fn test_builtins_registered() {
        let registry = LabelRegistry::with_builtins().unwrap();
        let labels: Vec<&str> = registry.labels().map(|l| l.as_str()).collect();
        assert_eq!(labels, vec![CARTEIRA_OAB_LABEL, TELA_SISTEMA_LABEL]);
    }

    #[test]
    fn test_unknown_label_gets_empty_profile() {
        let registry = LabelRegistry::with_builtins().unwrap();
        let profile = registry.profile_or_empty(&Label::from("contrato_social"));
        assert!(profile.bank.is_empty());
        assert!(profile.validators.is_empty());
    }

    #[test]
    fn test_register_new_label_from_definition() {
        let definition: LabelDefinition = serde_json::from_str(
            r#"{
                "label": "boleto",
                "fields": [
                    {"field": "vencimento", "patterns": ["Vencimento[:\\s]*([0-9/]+)"],
                     "validator": {"kind": "date", "format": "%d/%m/%Y"}},
                    {"field": "valor", "patterns": ["Valor[:\\s]*([0-9.,]+)"]}
                ]
            }"#,
        )
        .unwrap();

        let mut registry = LabelRegistry::with_builtins().unwrap();
        registry.register_definition(&definition).unwrap();

        let profile = registry.get(&Label::from("boleto")).unwrap();
        assert_eq!(profile.bank.len(), 2);
        assert!(profile.validators.accepts("vencimento", "10/05/2025"));
        assert!(!profile.validators.accepts("vencimento", "10/13/2025"));
    }

    #[test]
    fn test_definition_with_bad_validator_fails_to_register() {
        let definition = LabelDefinition {
            label: Label::from("quebrado"),
            fields: vec![FieldRuleDef {
                field: "campo".to_string(),
                patterns: vec![r"Campo[:\s]*(\w+)".to_string()],
                validator: Some(ValidatorSpec::Regex { pattern: "[".to_string() }),
            }],
        };

        let mut registry = LabelRegistry::new();
        assert!(registry.register_definition(&definition).is_err());
        assert!(!registry.contains(&Label::from("quebrado")));
    }

    #[test]
    fn test_custom_validator_on_profile() {
        let profile = LabelProfile::from_definition(&crate::extraction::rules::CARTEIRA_OAB)
            .unwrap()
            .with_validator("situacao", Validator::custom(|s: &str| s.eq_ignore_ascii_case("regular")));

        assert!(profile.validators.get("situacao").unwrap().accepts("REGULAR"));
        assert!(!profile.validators.accepts("situacao", "suspenso"));
    }
}
