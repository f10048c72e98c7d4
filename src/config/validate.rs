//! Consistency checks run once, before any compilation.

use std::collections::BTreeSet;

use super::{
    ConfigError, Configuration, DefaultSelection, ModelSelection, SolvingMode, UsersMode,
    DATA_ATOM_PLACEHOLDERS, PRODUCED_ATOM_PLACEHOLDERS,
};
use crate::hashname;
use crate::template::Template;

impl Configuration {
    /// Check the configuration for inconsistencies.
    ///
    /// Suspicious but usable settings are logged as warnings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.choice_groups.is_empty() {
            return Err(ConfigError::NoChoiceGroups);
        }

        unique_ids("users", self.users.allowed.iter().map(|u| u.id.as_str()))?;
        if self.users.mode == UsersMode::Restricted && self.users.allowed.is_empty() {
            tracing::warn!("restricted users mode without allowed users: nobody can record choices");
        }

        for (index, group) in self.choice_groups.iter().enumerate() {
            if group.items.is_empty() {
                return Err(ConfigError::EmptyGroup { group: index });
            }
            unique_ids(
                &format!("choice group {}", index),
                group.items.iter().map(|i| i.id.as_str()),
            )?;

            let card = group.cardinality;
            if let Some(max) = card.max {
                if card.min > max {
                    return Err(ConfigError::InvalidCardinality {
                        group: index,
                        reason: format!("min {} is greater than max {}", card.min, max),
                    });
                }
            }
            if card.min > group.items.len() {
                return Err(ConfigError::InvalidCardinality {
                    group: index,
                    reason: format!("min {} exceeds the {} available items", card.min, group.items.len()),
                });
            }

            if let DefaultSelection::Items(ids) = &group.default {
                if let Some(unknown) = ids.iter().find(|id| !group.has_item(id)) {
                    return Err(ConfigError::UnknownDefaultItem {
                        group: index,
                        item: unknown.clone(),
                    });
                }
            }

            check_templates(
                &format!("choice group {} produced atoms", index),
                &group.produced_atoms,
                PRODUCED_ATOM_PLACEHOLDERS,
            )?;
            check_templates(
                &format!("choice group {} data atoms", index),
                &group.data_atoms,
                DATA_ATOM_PLACEHOLDERS,
            )?;
            if group.produced_atoms.is_empty() {
                tracing::warn!(group = index, "choice group produces no atoms: choices will not reach the solver");
            }
        }

        if !(hashname::MIN_WORDS..=hashname::MAX_WORDS).contains(&self.output.id_words) {
            return Err(ConfigError::InvalidIdWords(self.output.id_words));
        }
        if self.output.model_selection == ModelSelection::Sampling
            && self.solver.solving_mode == SolvingMode::Optimals
        {
            return Err(ConfigError::SamplingWithOptimals);
        }

        let chains = [
            &self.output.header_repr,
            &self.output.footer_repr,
            &self.output.model_header_repr,
            &self.output.model_repr,
            &self.output.inline_repr,
            &self.output.model_footer_repr,
        ];
        for plugin in chains.into_iter().flatten() {
            plugin.validate().map_err(|reason| ConfigError::InvalidPlugin {
                kind: plugin.kind().to_string(),
                reason,
            })?;
        }

        if self.global.base_encoding.trim().is_empty() {
            tracing::warn!("base encoding is empty; the solver only sees generated atoms");
        }
        Ok(())
    }
}

fn unique_ids<'a>(scope: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateId {
                scope: scope.to_string(),
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn check_templates(context: &str, templates: &[Template], allowed: &[&str]) -> Result<(), ConfigError> {
    for template in templates {
        template
            .check_placeholders(allowed)
            .map_err(|placeholder| ConfigError::UnknownPlaceholder {
                context: context.to_string(),
                template: template.as_str().to_string(),
                placeholder,
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Configuration, ConfigError> {
        Configuration::from_json_str(json)
    }

    #[test]
    fn test_valid_configuration() {
        let config = parse(
            r#"{
                "global": {"base_encoding": "1 { assign(U,C): choice(C) } 1 :- user(U)."},
                "users": {"mode": "restricted", "allowed": ["a", "b"]},
                "choice_groups": [{
                    "items": ["1", "2", "3"],
                    "produced_atoms": ["pick({user},{choice})"],
                    "data_atoms": ["user({user})", "choice({choice})"]
                }]
            }"#,
        );
        assert!(config.is_ok(), "{:?}", config.err());
    }

    #[test]
    fn test_no_choice_groups() {
        assert!(matches!(parse("{}"), Err(ConfigError::NoChoiceGroups)));
    }

    #[test]
    fn test_unknown_plugin_kind_rejected_at_load() {
        let err = parse(r#"{"choice_groups": [{"items": ["1"]}], "output": {"model_repr": "hologram"}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("hologram"));
    }

    #[test]
    fn test_unknown_placeholder_in_produced_atoms() {
        let err = parse(r#"{"choice_groups": [{"items": ["1"], "produced_atoms": ["pick({user},{rank})"]}]}"#)
            .unwrap_err();
        match err {
            ConfigError::UnknownPlaceholder { placeholder, .. } => assert_eq!(placeholder, "rank"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_template_rejected() {
        let err = parse(r#"{"choice_groups": [{"items": ["1"], "data_atoms": ["user({user)"]}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_duplicate_item_ids() {
        let err = parse(r#"{"choice_groups": [{"items": ["1", {"label": "One", "id": 1}]}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateId { .. }));
    }

    #[test]
    fn test_inverted_cardinality() {
        let err = parse(r#"{"choice_groups": [{"items": ["1", "2"], "cardinality": {"min": 2, "max": 1}}]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCardinality { group: 0, .. }));
    }

    #[test]
    fn test_unknown_default_item() {
        let err = parse(r#"{"choice_groups": [{"items": ["1"], "default": ["9"]}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDefaultItem { group: 0, .. }));
    }

    #[test]
    fn test_sampling_with_optimals_rejected() {
        let err = parse(
            r#"{
                "choice_groups": [{"items": ["1"]}],
                "output": {"model_selection": "sampling", "max_models": 3},
                "solver": {"solving_mode": "optimals"}
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::SamplingWithOptimals));
    }

    #[test]
    fn test_id_words_range() {
        let err = parse(r#"{"choice_groups": [{"items": ["1"]}], "output": {"id_words": 9}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdWords(9)));
    }

    #[test]
    fn test_text_plugin_placeholders_checked() {
        let err = parse(
            r#"{"choice_groups": [{"items": ["1"]}],
                "output": {"header_repr": [{"kind": "text", "text": "{nb_models} {secret}"}]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPlugin { .. }));
    }
}
