//! Search targets and label matching.
//!
//! Model labels come in many spellings ("cell_phone", "Cell Phone", "phone").
//! Matching folds case and underscores, then accepts equality or containment in
//! either direction. Containment both ways is deliberately loose: a very short alias
//! such as "a" matches nearly every label. Catalog authors should keep aliases specific.

use serde::{Deserialize, Serialize};

/// Object class the user is looking for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTarget {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    aliases: Vec<String>,
}

impl SearchTarget {
    /// Build a target. Aliases are normalized, blanks dropped, duplicates removed.
    pub fn new<I, S>(name: impl Into<String>, icon: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for alias in aliases {
            let alias = normalize_label(alias.as_ref().trim());
            if !alias.is_empty() && !normalized.contains(&alias) {
                normalized.push(alias);
            }
        }
        Self {
            name: name.into(),
            icon: icon.into(),
            aliases: normalized,
        }
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Re-normalize aliases, e.g. after deserializing hand-written config.
    pub fn normalized(self) -> Self {
        Self::new(self.name, self.icon, self.aliases)
    }

    pub fn matches(&self, raw_label: &str) -> bool {
        matches(raw_label, self)
    }
}

/// Lower-case and turn snake_case separators into spaces.
pub fn normalize_label(label: &str) -> String {
    label.to_lowercase().replace('_', " ")
}

/// True when `raw_label` refers to `target`.
pub fn matches(raw_label: &str, target: &SearchTarget) -> bool {
    let candidate = normalize_label(raw_label);
    target.aliases.iter().any(|alias| {
        candidate == *alias || candidate.contains(alias.as_str()) || alias.contains(&candidate)
    })
}
