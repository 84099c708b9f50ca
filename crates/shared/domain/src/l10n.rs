use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A translatable string keyed by locale (`"en-US"`, `"es"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    #[must_use]
    pub fn new(locale: impl Into<String>, text: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(locale.into(), text.into());
        Self(map)
    }

    pub fn insert(&mut self, locale: impl Into<String>, text: impl Into<String>) {
        self.0.insert(locale.into(), text.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| v.trim().is_empty())
    }

    /// Shortest non-empty translation length, used for min-length validation.
    #[must_use]
    pub fn min_len(&self) -> usize {
        self.0.values().map(|v| v.trim().chars().count()).min().unwrap_or(0)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolves a translation: exact locale, then same language, then the default locale,
    /// then any translation.
    #[must_use]
    pub fn localized(&self, locale: &str, default_locale: &str) -> Option<&str> {
        let lang = language(locale);
        self.0
            .get(locale)
            .or_else(|| self.0.iter().find(|(k, _)| language(k) == lang).map(|(_, v)| v))
            .or_else(|| self.0.get(default_locale))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
    }

    /// Merges `other` over `self`; empty values delete the translation.
    pub fn merge(&mut self, other: Self) {
        for (locale, text) in other.0 {
            if text.is_empty() {
                self.0.remove(&locale);
            } else {
                self.0.insert(locale, text);
            }
        }
    }
}

fn language(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_language_then_default() {
        let mut text = LocalizedText::new("en-US", "Hello");
        text.insert("es", "Hola");

        assert_eq!(text.localized("es-MX", "en-US"), Some("Hola"));
        assert_eq!(text.localized("fr", "en-US"), Some("Hello"));
        assert_eq!(text.localized("en-US", "es"), Some("Hello"));
    }

    #[test]
    fn merge_removes_empty_translations() {
        let mut text = LocalizedText::new("en-US", "Hello");
        text.insert("es", "Hola");
        text.merge(LocalizedText::new("es", ""));
        assert_eq!(text.localized("es", "en-US"), Some("Hello"));
    }
}
