//! Role matcher: maps material and mesh names onto semantic role keys.

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

pub const LOGOS: &str = "logos";
pub const CAPA: &str = "capa";

const DEFAULT_MATCHERS: &[(&str, &[&str])] = &[
    ("frente", &[r"frente|front"]),
    ("tras", &[r"trás|tras|rear|back"]),
    ("lateral1", &[r"lateral\s*1|lateral\.?001|left|esquerda"]),
    ("lateral2", &[r"lateral\s*2|lateral\.?002|right|direita"]),
    (LOGOS, &[r"\blogo\b|\blogos\b"]),
    (CAPA, &[r"\bcapa\b"]),
];

/// `(role, pattern, text that must not follow the match)`. The regex engine
/// has no lookahead, so `lateral\b(?!.*2)` is expressed this way.
const DEFAULT_GUARDED_MATCHERS: &[(&str, &str, &str)] = &[("lateral1", r"lateral\b", "2")];

pub const DEFAULT_DECAL_KEYWORDS: &[&str] = &["decal", "logo", "sticker", "label"];

/// One case-insensitive pattern. A pattern that fails to compile is kept
/// (so it still shows up in listings) but never matches.
#[derive(Debug, Clone)]
pub struct RoleMatcher {
    pattern: String,
    regex: Option<Regex>,
    not_followed_by: Option<String>,
}

impl RoleMatcher {
    pub fn new(pattern: &str) -> Self {
        let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Some(regex),
            Err(err) => {
                log::warn!("Ignoring malformed role pattern '{}': {}", pattern, err);
                None
            }
        };
        Self {
            pattern: pattern.to_string(),
            regex,
            not_followed_by: None,
        }
    }

    /// Matches `pattern` only where `excluded` does not occur anywhere after
    /// the match.
    pub fn not_followed_by(pattern: &str, excluded: &str) -> Self {
        Self {
            not_followed_by: Some(excluded.to_string()),
            ..Self::new(pattern)
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    pub fn is_match(&self, name: &str) -> bool {
        let Some(regex) = &self.regex else {
            return false;
        };
        match &self.not_followed_by {
            None => regex.is_match(name),
            Some(excluded) => regex
                .find_iter(name)
                .any(|found| !name[found.end()..].contains(excluded.as_str())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoleTable {
    roles: HashMap<String, Vec<RoleMatcher>>,
    decal: Option<RoleMatcher>,
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RoleTable {
    pub fn empty() -> Self {
        Self {
            roles: HashMap::new(),
            decal: None,
        }
    }

    pub fn with_defaults() -> Self {
        let mut table = Self::empty();
        for (role, patterns) in DEFAULT_MATCHERS {
            table.register_matchers(role, patterns.iter().copied());
        }
        for (role, pattern, excluded) in DEFAULT_GUARDED_MATCHERS {
            table.push_matcher(role, RoleMatcher::not_followed_by(pattern, excluded));
        }
        table.set_decal_keywords(DEFAULT_DECAL_KEYWORDS.iter().copied());
        table
    }

    /// Replaces the pattern list of `role`; nothing is merged.
    pub fn register_matchers<I, S>(&mut self, role: &str, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers: Vec<RoleMatcher> = patterns
            .into_iter()
            .map(|pattern| RoleMatcher::new(pattern.as_ref()))
            .collect();
        log::debug!("Role '{}' now has {} matcher(s)", role, matchers.len());
        self.roles.insert(role.to_string(), matchers);
    }

    pub fn push_matcher(&mut self, role: &str, matcher: RoleMatcher) {
        self.roles.entry(role.to_string()).or_default().push(matcher);
    }

    pub fn matchers(&self, role: &str) -> &[RoleMatcher] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roles(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.roles.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn matches_role(&self, name: &str, role: &str) -> bool {
        self.matchers(role).iter().any(|matcher| matcher.is_match(name))
    }

    /// Keywords matched anywhere in a material name regardless of role.
    pub fn set_decal_keywords<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let escaped: Vec<String> = keywords
            .into_iter()
            .map(|keyword| regex::escape(keyword.as_ref()))
            .filter(|keyword| !keyword.is_empty())
            .collect();
        self.decal = if escaped.is_empty() {
            None
        } else {
            Some(RoleMatcher::new(&format!("({})", escaped.join("|"))))
        };
    }

    pub fn is_generic_decal(&self, material_name: &str) -> bool {
        self.decal
            .as_ref()
            .map(|matcher| matcher.is_match(material_name))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::{RoleMatcher, RoleTable, CAPA, LOGOS};

    #[test]
    fn default_logos_matches_whole_word_case_insensitive() {
        let table = RoleTable::with_defaults();
        assert!(table.matches_role("LOGO", LOGOS));
        assert!(table.matches_role("porta logos", LOGOS));
        assert!(!table.matches_role("Logotipo", LOGOS));
        assert!(table.matches_role("Capa", CAPA));
    }

    #[test]
    fn plain_lateral_is_the_first_side() {
        let table = RoleTable::with_defaults();
        assert!(table.matches_role("Lateral", "lateral1"));
        assert!(table.matches_role("lateral - porta", "lateral1"));
        assert!(table.matches_role("Lateral 1", "lateral1"));
        assert!(!table.matches_role("Lateral 2", "lateral1"));
        assert!(!table.matches_role("Lateral.002", "lateral1"));
        assert!(table.matches_role("Lateral 2", "lateral2"));
        assert_eq!(table.matchers("lateral1")[1].pattern(), r"lateral\b");
    }

    #[test]
    fn unknown_role_never_matches() {
        let table = RoleTable::with_defaults();
        assert!(!table.matches_role("Logo", "roof"));
    }

    #[test]
    fn register_replaces_instead_of_merging() {
        let mut table = RoleTable::with_defaults();
        table.register_matchers(LOGOS, ["^emblema$"]);
        assert!(table.matches_role("Emblema", LOGOS));
        assert!(!table.matches_role("Logo", LOGOS));
        assert_eq!(table.matchers(LOGOS).len(), 1);
        assert_eq!(table.matchers(LOGOS)[0].pattern(), "^emblema$");
    }

    #[test]
    fn malformed_pattern_fails_open_to_no_match() {
        let matcher = RoleMatcher::new("logo(");
        assert!(!matcher.is_valid());
        assert!(!matcher.is_match("logo("));

        let mut table = RoleTable::empty();
        table.register_matchers("broken", ["(unclosed", "ok"]);
        assert!(table.matches_role("OK", "broken"));
        assert!(!table.matches_role("(unclosed", "broken"));
    }

    #[test]
    fn decal_keywords_match_substrings() {
        let table = RoleTable::with_defaults();
        assert!(table.is_generic_decal("Sticker_A"));
        assert!(table.is_generic_decal("rear_LABEL.001"));
        assert!(!table.is_generic_decal("Rubber"));
    }

    #[test]
    fn roles_are_listed_sorted() {
        let table = RoleTable::with_defaults();
        let roles = table.roles();
        let mut sorted = roles.clone();
        sorted.sort_unstable();
        assert_eq!(roles, sorted);
        assert!(roles.contains(&LOGOS));
    }
}
