//! Built-in pattern banks for the bundled document labels.
//!
//! Within a field, the labeled form comes first and the weaker structural
//! heuristic after it. Order is policy: the extractor stops at the first
//! accepted match.

use lazy_static::lazy_static;

use super::registry::LabelDefinition;
use super::{FieldRuleDef, ValidatorSpec};
use crate::models::Label;

/// Bar association (OAB) ID card.
pub const CARTEIRA_OAB_LABEL: &str = "carteira_oab";

/// Back-office system screen capture.
pub const TELA_SISTEMA_LABEL: &str = "tela_sistema";

const DATE_DD_MM_YYYY: &str = r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$";

fn rule(field: &str, patterns: &[&str], validator: Option<&str>) -> FieldRuleDef {
    FieldRuleDef {
        field: field.to_string(),
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        validator: validator.map(|pattern| ValidatorSpec::Regex {
            pattern: pattern.to_string(),
        }),
    }
}

lazy_static! {
    pub static ref CARTEIRA_OAB: LabelDefinition = LabelDefinition {
        label: Label::from(CARTEIRA_OAB_LABEL),
        fields: vec![
            rule(
                "nome",
                &[
                    r"(?:Nome|Nome Completo)[:\s]*([^\n]+)",
                    // whole line in capitals
                    r"^([A-ZÀ-Ú\s']+)\n",
                ],
                None,
            ),
            rule(
                "inscricao",
                &[
                    r"Inscrição[:\s]*([0-9A-Z\s\-]+)",
                    r"([0-9]{6})\s",
                ],
                Some(r"^[0-9]{6}$"),
            ),
            rule(
                "seccional",
                &[
                    r"Seccional[:\s]*([A-Z]{2})",
                    r"([A-Z]{2})\s*Conselho",
                ],
                Some(r"^[A-Z]{2}$"),
            ),
            rule("subsecao", &[r"Subseção[:\s]*([^\n]+)"], None),
            rule("categoria", &[r"Categoria[:\s]*([^\n]+)"], None),
            rule(
                "endereco_profissional",
                // may continue over several lines
                &[r"Endereço Profissional[:\s]*([^\n]+(?:\n[^\n]+)*)"],
                None,
            ),
            rule(
                "telefone_profissional",
                &[r"Telefone Profissional[:\s]*([0-9\-\s\(\)]+)"],
                Some(r"^[0-9\-\s\(\)]{8,}$"),
            ),
            rule("situacao", &[r"Situação[:\s]*([^\n]+)"], None),
        ],
    };

    pub static ref TELA_SISTEMA: LabelDefinition = LabelDefinition {
        label: Label::from(TELA_SISTEMA_LABEL),
        fields: vec![
            rule(
                "data_base",
                &[
                    r"Data Base[:\s]*([0-9]{2}/[0-9]{2}/[0-9]{4})",
                    r"Data Referência[:\s]*([0-9]{2}/[0-9]{2}/[0-9]{4})",
                ],
                Some(DATE_DD_MM_YYYY),
            ),
            rule(
                "data_vencimento",
                &[
                    r"Data Vencimento[:\s]*([0-9]{2}/[0-9]{2}/[0-9]{4})",
                    r"Vcto mais antigo[:\s]*([0-9]{2}/[0-9]{2}/[0-9]{4})",
                ],
                Some(DATE_DD_MM_YYYY),
            ),
            rule(
                "quantidade_parcelas",
                &[
                    r"Qtd\. Parcelas[:\s]*([0-9]+)",
                    r"Intervalo de parcelas?\s*:\s*([0-9]+)",
                ],
                Some(r"^[0-9]+$"),
            ),
            rule("produto", &[r"Produto[:\s]*([^\n]+)"], None),
            rule("sistema", &[r"Sistema[:\s]*([^\n]+)"], None),
            rule(
                "tipo_de_operacao",
                &[
                    r"Tipo Operação[:\s]*([^\n]+)",
                    r"Tipo de Operação[:\s]*([^\n]+)",
                ],
                None,
            ),
            rule(
                "tipo_de_sistema",
                &[
                    r"Tipo Sistema[:\s]*([^\n]+)",
                    r"Tipo de Sistema[:\s]*([^\n]+)",
                ],
                None,
            ),
        ],
    };
}

/// Definitions registered by default.
pub fn builtin_definitions() -> Vec<&'static LabelDefinition> {
    vec![&*CARTEIRA_OAB, &*TELA_SISTEMA]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::rules::LabelProfile;

    #[test]
    fn test_builtin_definitions_compile() {
        for definition in builtin_definitions() {
            let profile = LabelProfile::from_definition(definition).unwrap();
            assert_eq!(profile.bank.len(), definition.fields.len());
        }
    }

    #[test]
    fn test_oab_field_order() {
        let fields: Vec<&str> = CARTEIRA_OAB.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "nome",
                "inscricao",
                "seccional",
                "subsecao",
                "categoria",
                "endereco_profissional",
                "telefone_profissional",
                "situacao",
            ]
        );
    }

    #[test]
    fn test_labeled_pattern_precedes_heuristic() {
        let inscricao = CARTEIRA_OAB.fields.iter().find(|f| f.field == "inscricao").unwrap();
        assert!(inscricao.patterns[0].starts_with("Inscrição"));
        assert_eq!(inscricao.patterns[1], r"([0-9]{6})\s");
    }
}
