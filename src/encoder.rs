//! Atom encoder: configuration + user choices → solver program text.
//!
//! The program is laid out as:
//!
//! ```text
//! base encoding
//! produced atoms     one fact per (template, user, selected item), in user order
//! show directives    `#show.` then one `#show p.` per configured predicate
//! data atoms         deduplicated and sorted
//! ```
//!
//! Identical input always yields byte-identical text.

use std::collections::BTreeSet;

use crate::config::{ChoiceGroup, Configuration, UsersMode};
use crate::template::Template;
use crate::types::UserChoiceSet;

/// Build the full program for the current choices.
pub fn encode(config: &Configuration, choices: &UserChoiceSet) -> String {
    let mut program = String::new();
    program.push_str(&config.global.base_encoding);
    if !program.is_empty() && !program.ends_with('\n') {
        program.push('\n');
    }

    let mut produced = 0usize;
    for (index, group) in config.choice_groups.iter().enumerate() {
        for fact in produced_atoms(group, index, choices) {
            program.push_str(&fact);
            program.push('\n');
            produced += 1;
        }
    }

    for directive in show_directives(&config.global.shows) {
        program.push_str(&directive);
        program.push('\n');
    }

    let users = user_universe(config, choices);
    let data: BTreeSet<String> = config
        .choice_groups
        .iter()
        .flat_map(|group| data_atoms(group, &users))
        .collect();
    for fact in &data {
        program.push_str(fact);
        program.push('\n');
    }

    tracing::debug!(
        produced_atoms = produced,
        data_atoms = data.len(),
        bytes = program.len(),
        "encoded program"
    );
    program
}

/// Facts expressing each user's selection in one group.
///
/// Not deduplicated: every fact is a distinct user decision.
pub fn produced_atoms(group: &ChoiceGroup, index: usize, choices: &UserChoiceSet) -> Vec<String> {
    let mut facts = Vec::new();
    for template in &group.produced_atoms {
        for (user, selections) in choices.iter() {
            let Some(selection) = selections.get(index) else {
                continue;
            };
            for choice in selection {
                facts.push(fact(template.render(|name| match name {
                    "user" => Some(user.to_string()),
                    "choice" => Some(choice.clone()),
                    _ => None,
                })));
            }
        }
    }
    facts
}

/// Facts declaring the universe of one group.
///
/// Only the placeholders a template references are iterated, so a template
/// mentioning `{choice}` alone produces one fact per item regardless of the
/// number of users or ranks.
pub fn data_atoms(group: &ChoiceGroup, users: &[String]) -> Vec<String> {
    let items: Vec<String> = group.items.iter().map(|i| i.id.clone()).collect();
    let ranks = group.rank_levels();
    let absolute_ranks = group.absolute_ranks();
    let any_ranks: Vec<String> = ranks.iter().chain(absolute_ranks.iter()).cloned().collect();

    let domains: [(&str, &[String]); 5] = [
        ("user", users),
        ("choice", &items),
        ("rank", &ranks),
        ("absolute_rank", &absolute_ranks),
        ("any_rank", &any_ranks),
    ];

    let mut facts = Vec::new();
    for template in &group.data_atoms {
        let used: Vec<(&str, &[String])> = domains
            .iter()
            .filter(|(name, _)| template.references(name))
            .copied()
            .collect();
        expand(template, &used, &mut facts);
    }
    facts
}

/// `#show.` followed by one directive per predicate, in declared order.
pub fn show_directives(shows: &[String]) -> Vec<String> {
    if shows.is_empty() {
        return Vec::new();
    }
    std::iter::once("#show.".to_string())
        .chain(shows.iter().map(|s| format!("#show {}.", s.trim().trim_end_matches('.'))))
        .collect()
}

/// Users the data atoms range over: allowed users in restricted mode and
/// every user with recorded choices, sorted and unique.
pub fn user_universe(config: &Configuration, choices: &UserChoiceSet) -> Vec<String> {
    let mut users: BTreeSet<String> = choices.users().map(str::to_string).collect();
    if config.users.mode == UsersMode::Restricted {
        users.extend(config.users.allowed.iter().map(|u| u.id.clone()));
    }
    users.into_iter().collect()
}

/// Render `template` for every combination of values of the `used` domains.
fn expand(template: &Template, used: &[(&str, &[String])], out: &mut Vec<String>) {
    if used.iter().any(|(_, values)| values.is_empty()) {
        return;
    }
    let mut cursor = vec![0usize; used.len()];
    loop {
        out.push(fact(template.render(|name| {
            used.iter()
                .position(|(n, _)| *n == name)
                .map(|d| used[d].1[cursor[d]].clone())
        })));

        // Advance the odometer, last domain fastest.
        let mut d = used.len();
        loop {
            if d == 0 {
                return;
            }
            d -= 1;
            cursor[d] += 1;
            if cursor[d] < used[d].1.len() {
                break;
            }
            cursor[d] = 0;
        }
    }
}

fn fact(text: String) -> String {
    format!("{}.", text.trim_end().trim_end_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Selection;

    fn config(json: &str) -> Configuration {
        Configuration::from_json_str(json).unwrap()
    }

    fn sel(items: &[&str]) -> Selection {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn pairing_config() -> Configuration {
        config(
            r#"{
                "global": {"base_encoding": "1 { assign(U,C): choice(C) } 1 :- user(U).", "shows": ["assign/2"]},
                "users": {"mode": "restricted", "allowed": ["a", "b"]},
                "choice_groups": [{
                    "items": ["1", "2", "3"],
                    "default": "none",
                    "produced_atoms": ["pick({user},{choice})."],
                    "data_atoms": ["user({user})", "choice({choice})", "pair({user},{choice})"]
                }]
            }"#,
        )
    }

    #[test]
    fn test_program_layout() {
        let cfg = pairing_config();
        let mut choices = cfg.initial_choices();
        choices.set_all("a", vec![sel(&["1"])]);
        choices.set_all("b", vec![sel(&["2"])]);

        let program = encode(&cfg, &choices);
        let lines: Vec<&str> = program.lines().collect();
        assert_eq!(lines[0], "1 { assign(U,C): choice(C) } 1 :- user(U).");
        assert_eq!(lines[1], "pick(a,1).");
        assert_eq!(lines[2], "pick(b,2).");
        assert_eq!(lines[3], "#show.");
        assert_eq!(lines[4], "#show assign/2.");
        // Sorted, deduplicated data atoms: 3 choices + 6 pairs + 2 users.
        assert_eq!(lines.len(), 5 + 3 + 6 + 2);
        assert_eq!(lines[5], "choice(1).");
        assert!(lines.contains(&"pair(b,3)."));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let cfg = pairing_config();
        let mut choices = cfg.initial_choices();
        choices.set_all("b", vec![sel(&["3", "1"])]);
        assert_eq!(encode(&cfg, &choices), encode(&cfg, &choices));
    }

    #[test]
    fn test_produced_atoms_not_deduplicated_across_templates() {
        let cfg = config(
            r#"{"choice_groups": [{"items": ["1"], "produced_atoms": ["p({user})", "p({user})"]}]}"#,
        );
        let mut choices = UserChoiceSet::new();
        choices.set_all("u", vec![sel(&["1"])]);
        assert_eq!(produced_atoms(&cfg.choice_groups[0], 0, &choices), vec!["p(u).", "p(u)."]);
    }

    #[test]
    fn test_unreferenced_placeholders_not_iterated() {
        let cfg = config(
            r#"{"choice_groups": [{
                "items": ["x", "y"],
                "ranks": {"first": 1, "second": 2, "veto": false},
                "data_atoms": ["choice({choice})", "rank({rank})", "absolute({absolute_rank})", "anyrank({any_rank})", "constant"]
            }]}"#,
        );
        let users: Vec<String> = (0..50).map(|i| format!("u{}", i)).collect();
        let facts = data_atoms(&cfg.choice_groups[0], &users);
        assert_eq!(
            facts,
            vec![
                "choice(x).", "choice(y).",
                "rank(1).", "rank(2).",
                "absolute(no).",
                "anyrank(1).", "anyrank(2).", "anyrank(no).",
                "constant.",
            ]
        );
    }

    #[test]
    fn test_cartesian_product_over_referenced_placeholders() {
        let cfg = config(
            r#"{"choice_groups": [{"items": ["x", "y"], "ranks": {"a": 1, "b": 2}, "data_atoms": ["r({user},{choice},{rank})"]}]}"#,
        );
        let facts = data_atoms(&cfg.choice_groups[0], &["u".to_string(), "v".to_string()]);
        assert_eq!(facts.len(), 2 * 2 * 2);
        assert_eq!(facts[0], "r(u,x,1).");
        assert_eq!(facts[7], "r(v,y,2).");
    }

    #[test]
    fn test_empty_domain_yields_nothing() {
        let cfg = config(r#"{"choice_groups": [{"items": ["x"], "data_atoms": ["user({user})"]}]}"#);
        assert!(data_atoms(&cfg.choice_groups[0], &[]).is_empty());
    }

    #[test]
    fn test_data_atoms_deduplicated_across_groups() {
        let cfg = config(
            r#"{"choice_groups": [
                {"items": ["x"], "data_atoms": ["user({user})"]},
                {"items": ["y"], "data_atoms": ["user({user})"]}
            ]}"#,
        );
        let mut choices = UserChoiceSet::new();
        choices.set_all("u", vec![sel(&[]), sel(&[])]);
        let program = encode(&cfg, &choices);
        assert_eq!(program.matches("user(u).").count(), 1);
    }

    #[test]
    fn test_no_shows_no_directives() {
        assert!(show_directives(&[]).is_empty());
        assert_eq!(show_directives(&["p/1.".to_string()]), vec!["#show.", "#show p/1."]);
    }

    #[test]
    fn test_user_universe_includes_restricted_users_without_choices() {
        let cfg = pairing_config();
        let mut choices = UserChoiceSet::new();
        choices.set_all("z", vec![sel(&["1"])]);
        assert_eq!(user_universe(&cfg, &choices), vec!["a", "b", "z"]);
    }
}
