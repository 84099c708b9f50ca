//! Collection payload validation.

use mkt_derive::api_model;
use mkt_domain::catalog::{Carrier, Region, is_category};
use mkt_domain::collection::{Collection, CollectionType};
use mkt_domain::l10n::LocalizedText;
use mkt_kernel::server::{ApiError, FieldErrors, NON_FIELD_ERRORS};
use std::collections::BTreeMap;

const OPERATOR_CATEGORY: &str = "Operator shelves may not be associated with a category.";

/// Writable collection fields. Omitted fields keep their value; an empty string clears
/// `category`, `region` and `carrier`.
#[api_model]
#[derive(Clone, Default)]
pub struct CollectionPayload {
    /// `0` basic, `1` featured, `2` operator shelf.
    pub collection_type: Option<u8>,
    pub name: Option<BTreeMap<String, String>>,
    pub description: Option<BTreeMap<String, String>>,
    pub slug: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Region slug.
    pub region: Option<String>,
    /// Carrier slug.
    pub carrier: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub can_be_hero: Option<bool>,
    pub is_public: Option<bool>,
    pub default_language: Option<String>,
}

/// Validated changes. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionChanges {
    pub collection_type: Option<CollectionType>,
    pub name: Option<LocalizedText>,
    pub description: Option<LocalizedText>,
    pub slug: Option<String>,
    pub category: Option<Option<String>>,
    pub region: Option<Option<u32>>,
    pub carrier: Option<Option<u32>>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub can_be_hero: Option<bool>,
    pub is_public: Option<bool>,
    pub default_language: Option<String>,
}

impl CollectionChanges {
    pub fn apply(self, collection: &mut Collection) {
        if let Some(kind) = self.collection_type {
            collection.collection_type = kind;
        }
        if let Some(name) = self.name {
            collection.name.merge(name);
        }
        if let Some(description) = self.description {
            collection.description.merge(description);
        }
        if let Some(slug) = self.slug {
            collection.slug = slug;
        }
        if let Some(category) = self.category {
            collection.category = category;
        }
        if let Some(region) = self.region {
            collection.region = region;
        }
        if let Some(carrier) = self.carrier {
            collection.carrier = carrier;
        }
        if let Some(color) = self.background_color {
            collection.background_color = Some(color);
        }
        if let Some(color) = self.text_color {
            collection.text_color = Some(color);
        }
        if let Some(hero) = self.can_be_hero {
            collection.can_be_hero = hero;
        }
        if let Some(public) = self.is_public {
            collection.is_public = public;
        }
        if let Some(language) = self.default_language {
            collection.default_language = language;
        }
    }
}

/// Validates a new collection: `collection_type` and a non-empty `name` are required.
///
/// # Errors
/// Returns [`ApiError::Validation`] with every problem found.
pub fn validate_create(payload: &CollectionPayload) -> Result<CollectionChanges, ApiError> {
    let mut errors = FieldErrors::new();
    if payload.collection_type.is_none() {
        errors.add("collection_type", "This field is required.");
    }
    if payload.name.is_none() {
        errors.add("name", "This field is required.");
    }
    let changes = parse(payload, &mut errors);

    let kind = changes.collection_type.unwrap_or_default();
    let category = changes.category.clone().flatten();
    if kind == CollectionType::Operator && category.is_some() {
        errors.add(NON_FIELD_ERRORS, OPERATOR_CATEGORY);
    }

    errors.into_result()?;
    Ok(changes)
}

/// Validates a partial update of `existing`. The operator rule is checked against the
/// resulting type and category.
///
/// # Errors
/// Returns [`ApiError::Validation`] with every problem found.
pub fn validate_update(
    payload: &CollectionPayload,
    existing: &Collection,
) -> Result<CollectionChanges, ApiError> {
    let mut errors = FieldErrors::new();
    let changes = parse(payload, &mut errors);

    let kind = changes.collection_type.unwrap_or(existing.collection_type);
    let category = changes.category.clone().unwrap_or_else(|| existing.category.clone());
    if kind == CollectionType::Operator && category.is_some() {
        errors.add(NON_FIELD_ERRORS, OPERATOR_CATEGORY);
    }

    errors.into_result()?;
    Ok(changes)
}

fn parse(payload: &CollectionPayload, errors: &mut FieldErrors) -> CollectionChanges {
    let collection_type = payload.collection_type.and_then(|raw| {
        CollectionType::try_from(raw).inspect_err(|msg| errors.add("collection_type", msg.as_str())).ok()
    });

    let name = payload.name.as_ref().map(localized);
    if name.as_ref().is_some_and(|n| n.is_empty() || n.min_len() < 1) {
        errors.add("name", "The field must have a length of at least 1 characters.");
    }

    let category = optional(payload.category.as_deref(), "category", errors, |slug| {
        is_category(slug).then(|| slug.to_owned())
    });
    let region = optional(payload.region.as_deref(), "region", errors, |slug| {
        Region::by_slug(slug).map(|r| r.id)
    });
    let carrier = optional(payload.carrier.as_deref(), "carrier", errors, |slug| {
        Carrier::by_slug(slug).map(|c| c.id)
    });

    for (field, color) in [
        ("background_color", &payload.background_color),
        ("text_color", &payload.text_color),
    ] {
        if color.as_deref().is_some_and(|c| !is_hex_color(c)) {
            errors.add(field, "Enter a valid hex colour, e.g. #00A2FF.");
        }
    }

    CollectionChanges {
        collection_type,
        name,
        description: payload.description.as_ref().map(localized),
        slug: payload.slug.clone().filter(|s| !s.trim().is_empty()),
        category,
        region,
        carrier,
        background_color: payload.background_color.clone(),
        text_color: payload.text_color.clone(),
        can_be_hero: payload.can_be_hero,
        is_public: payload.is_public,
        default_language: payload.default_language.clone(),
    }
}

/// `None` when absent, `Some(None)` when cleared with an empty string.
fn optional<T>(
    raw: Option<&str>,
    field: &str,
    errors: &mut FieldErrors,
    lookup: impl Fn(&str) -> Option<T>,
) -> Option<Option<T>> {
    match raw.map(str::trim) {
        None => None,
        Some("") => Some(None),
        Some(slug) => match lookup(slug) {
            Some(value) => Some(Some(value)),
            None => {
                errors.add(field, format!("{slug} is not one of the available choices."));
                None
            },
        },
    }
}

fn localized(map: &BTreeMap<String, String>) -> LocalizedText {
    map.iter().fold(LocalizedText::default(), |mut text, (locale, value)| {
        text.insert(locale.as_str(), value.as_str());
        text
    })
}

fn is_hex_color(value: &str) -> bool {
    value.strip_prefix('#').is_some_and(|hex| {
        hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(kind: u8) -> CollectionPayload {
        CollectionPayload {
            collection_type: Some(kind),
            name: Some([("en-US".to_owned(), "Staff picks".to_owned())].into()),
            ..CollectionPayload::default()
        }
    }

    fn errors_of(result: Result<CollectionChanges, ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation { errors, .. }) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn operator_shelves_reject_categories() {
        let payload = CollectionPayload { category: Some("games".to_owned()), ..named(2) };
        let errors = errors_of(validate_create(&payload));
        assert_eq!(errors.get(NON_FIELD_ERRORS), Some(&[OPERATOR_CATEGORY.to_owned()][..]));

        let featured = CollectionPayload { category: Some("games".to_owned()), ..named(1) };
        assert!(validate_create(&featured).is_ok());
    }

    #[test]
    fn update_checks_the_resulting_type_and_category() {
        let existing = Collection {
            collection_type: CollectionType::Featured,
            category: Some("games".to_owned()),
            ..Collection::default()
        };
        let to_operator = CollectionPayload { collection_type: Some(2), ..CollectionPayload::default() };
        assert!(validate_update(&to_operator, &existing).is_err());

        let cleared = CollectionPayload { category: Some(String::new()), ..to_operator };
        let changes = validate_update(&cleared, &existing).unwrap();
        assert_eq!(changes.category, Some(None));
        assert_eq!(changes.collection_type, Some(CollectionType::Operator));
    }

    #[test]
    fn name_is_required_and_not_empty() {
        let errors = errors_of(validate_create(&CollectionPayload { name: None, ..named(0) }));
        assert_eq!(errors.get("name"), Some(&["This field is required.".to_owned()][..]));

        let empty = CollectionPayload {
            name: Some([("en-US".to_owned(), String::new())].into()),
            ..named(0)
        };
        assert!(errors_of(validate_create(&empty)).get("name").is_some());
    }

    #[test]
    fn unknown_slugs_and_types_are_reported() {
        let payload = CollectionPayload {
            region: Some("atlantis".to_owned()),
            carrier: Some("telefonica".to_owned()),
            background_color: Some("blue".to_owned()),
            ..named(9)
        };
        let errors = errors_of(validate_create(&payload));
        assert_eq!(errors.get("collection_type"), Some(&["\"9\" is not a valid choice.".to_owned()][..]));
        assert!(errors.get("region").is_some());
        assert!(errors.get("carrier").is_none());
        assert!(errors.get("background_color").is_some());
    }
}
