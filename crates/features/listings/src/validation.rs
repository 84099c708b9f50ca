//! Listing payload validation.
//!
//! Field problems are collected into [`FieldErrors`] so one response reports all of them.
//! Legacy `device_types` are accepted in place of `platforms` + `form_factors` and translated
//! before they reach the listing.

use mkt_derive::api_model;
use mkt_domain::catalog::{DeviceType, FormFactor, Platform, PremiumType, PriceTier, is_category};
use mkt_domain::constants::MAX_CATEGORIES;
use mkt_domain::l10n::LocalizedText;
use mkt_domain::listing::{Listing, from_device_types};
use mkt_kernel::server::{ApiError, FieldErrors, NON_FIELD_ERRORS};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

const REQUIRED: &str = "This field is required.";

/// Writable listing fields. Translated fields are maps of locale to text.
#[api_model]
#[derive(Clone, Default)]
pub struct ListingPayload {
    /// Manifest URL of a hosted listing; only read on creation.
    pub manifest: Option<String>,
    pub slug: Option<String>,
    pub name: Option<BTreeMap<String, String>>,
    pub description: Option<BTreeMap<String, String>>,
    pub homepage: Option<BTreeMap<String, String>>,
    pub support_email: Option<BTreeMap<String, String>>,
    pub support_url: Option<BTreeMap<String, String>>,
    pub default_locale: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub platforms: Option<Vec<String>>,
    pub form_factors: Option<Vec<String>>,
    /// Legacy API v1 device types.
    pub device_types: Option<Vec<String>>,
    pub premium_type: Option<String>,
    /// Display price of a tier, e.g. `"0.99"`.
    pub price: Option<String>,
    pub is_offline: Option<bool>,
    pub public_stats: Option<bool>,
}

/// Validated changes, ready to be applied to a stored listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingChanges {
    pub slug: Option<String>,
    pub name: Option<LocalizedText>,
    pub description: Option<LocalizedText>,
    pub homepage: Option<LocalizedText>,
    pub support_email: Option<LocalizedText>,
    pub support_url: Option<LocalizedText>,
    pub default_locale: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub platforms: Option<BTreeSet<Platform>>,
    pub form_factors: Option<BTreeSet<FormFactor>>,
    pub premium_type: Option<PremiumType>,
    pub price_tier: Option<u32>,
    pub is_offline: Option<bool>,
    pub public_stats: Option<bool>,
}

impl ListingChanges {
    /// Applies the changes. Returns `true` when the listing was flagged for re-review because
    /// an approved listing gained platforms or form factors.
    pub fn apply(self, listing: &mut Listing) -> bool {
        let approved = listing.status.is_approved();
        let mut added = false;

        if let Some(platforms) = self.platforms {
            added |= platforms.difference(&listing.platforms).next().is_some();
            listing.platforms = platforms;
        }
        if let Some(form_factors) = self.form_factors {
            added |= form_factors.difference(&listing.form_factors).next().is_some();
            listing.form_factors = form_factors;
        }

        set(&mut listing.slug, self.slug);
        merge(&mut listing.name, self.name);
        merge(&mut listing.description, self.description);
        merge(&mut listing.homepage, self.homepage);
        merge(&mut listing.support_email, self.support_email);
        merge(&mut listing.support_url, self.support_url);
        set(&mut listing.default_locale, self.default_locale);
        set(&mut listing.categories, self.categories);
        set(&mut listing.tags, self.tags);
        set(&mut listing.is_offline, self.is_offline);
        set(&mut listing.public_stats, self.public_stats);
        if let Some(premium_type) = self.premium_type {
            listing.premium_type = Some(premium_type);
        }
        if let Some(tier) = self.price_tier {
            listing.price_tier = Some(tier);
        }

        let rereview = approved && added;
        if rereview {
            listing.needs_rereview = true;
            info!(listing = listing.id, "New platforms or form factors, listing flagged for re-review");
        }
        rereview
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn merge(target: &mut LocalizedText, value: Option<LocalizedText>) {
    if let Some(value) = value {
        target.merge(value);
    }
}

fn localized(map: Option<&BTreeMap<String, String>>) -> Option<LocalizedText> {
    map.map(|entries| {
        entries.iter().fold(LocalizedText::default(), |mut text, (locale, value)| {
            text.insert(locale.as_str(), value.as_str());
            text
        })
    })
}

fn not_a_choice(value: &str) -> String {
    format!("{value} is not one of the available choices.")
}

/// Parses every slug with `lookup`, reporting unknown ones under `field`.
fn parse_slugs<T: Ord>(
    values: Option<&Vec<String>>,
    field: &str,
    lookup: impl Fn(&str) -> Option<T>,
    errors: &mut FieldErrors,
) -> Option<BTreeSet<T>> {
    let values = values?;
    let mut parsed = BTreeSet::new();
    for value in values {
        match lookup(value.as_str()) {
            Some(item) => {
                parsed.insert(item);
            },
            None => errors.add(field, not_a_choice(value)),
        }
    }
    Some(parsed)
}

fn valid_prices() -> String {
    PriceTier::active()
        .filter(|t| !t.is_free())
        .map(|t| format!("\"{}\"", t.price()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates a full update of `existing`.
///
/// `platforms` and `form_factors` are both required unless `device_types` is sent, categories
/// are required and capped, and listings that are not free need an active non-zero price.
///
/// # Errors
/// Returns [`ApiError::Validation`] carrying every field problem found.
pub fn validate_update(payload: &ListingPayload, existing: &Listing) -> Result<ListingChanges, ApiError> {
    let mut errors = FieldErrors::new();
    let mut changes = translated_fields(payload);

    match &payload.categories {
        None => errors.add("categories", REQUIRED),
        Some(categories) if categories.is_empty() => errors.add("categories", REQUIRED),
        Some(categories) => {
            if categories.len() > MAX_CATEGORIES {
                errors.add("categories", format!("You can have only {MAX_CATEGORIES} categories."));
            }
            for category in categories.iter().filter(|c| !is_category(c)) {
                errors.add("categories", not_a_choice(category));
            }
            changes.categories = Some(categories.clone());
        },
    }

    let platforms = parse_slugs(payload.platforms.as_ref(), "platforms", Platform::from_slug, &mut errors);
    let form_factors =
        parse_slugs(payload.form_factors.as_ref(), "form_factors", FormFactor::from_slug, &mut errors);
    let devices =
        parse_slugs(payload.device_types.as_ref(), "device_types", DeviceType::from_api_name, &mut errors);

    if let Some(devices) = devices.filter(|d| !d.is_empty()) {
        let devices: Vec<DeviceType> = devices.into_iter().collect();
        let (platforms, form_factors) = from_device_types(&devices);
        changes.platforms = Some(platforms);
        changes.form_factors = Some(form_factors);
    } else {
        let platforms = platforms.filter(|p| !p.is_empty());
        let form_factors = form_factors.filter(|f| !f.is_empty());
        if platforms.is_none() || form_factors.is_none() {
            errors.add(NON_FIELD_ERRORS, "Both \"platforms\" and \"form_factors\" are required.");
        }
        changes.platforms = platforms;
        changes.form_factors = form_factors;
    }

    let premium_type = match payload.premium_type.as_deref() {
        Some(name) => PremiumType::from_api_name(name).or_else(|| {
            errors.add("premium_type", format!("\"{name}\" is not a valid choice."));
            None
        }),
        None => None,
    };
    changes.premium_type = premium_type;

    let effective = premium_type.unwrap_or_else(|| existing.premium_type());
    if !matches!(effective, PremiumType::Free | PremiumType::FreeInApp) {
        let price = payload.price.clone().or_else(|| existing.price().map(PriceTier::price));
        match price.as_deref().and_then(PriceTier::by_price).filter(|t| t.active && !t.is_free()) {
            Some(tier) => changes.price_tier = Some(tier.id),
            None => errors.add(
                "price",
                format!(
                    "Premium app specified without a valid price. Price can be one of {}.",
                    valid_prices()
                ),
            ),
        }
    }

    errors.into_result()?;
    Ok(changes)
}

/// Validates the payload of a new hosted listing.
///
/// # Errors
/// Returns [`ApiError::Validation`] when the manifest URL is missing or not absolute.
pub fn validate_create(payload: &ListingPayload) -> Result<(String, ListingChanges), ApiError> {
    let Some(manifest) = payload.manifest.as_deref().map(str::trim).filter(|m| !m.is_empty())
    else {
        return Err(ApiError::field(NON_FIELD_ERRORS, "No upload or manifest specified."));
    };
    let parsed = url::Url::parse(manifest)
        .map_err(|_| ApiError::field("manifest", "Enter a valid URL."))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::field("manifest", "Enter a valid URL."));
    }

    let mut changes = translated_fields(payload);
    let mut errors = FieldErrors::new();
    if let Some(categories) = &payload.categories {
        if categories.len() > MAX_CATEGORIES {
            errors.add("categories", format!("You can have only {MAX_CATEGORIES} categories."));
        }
        for category in categories.iter().filter(|c| !is_category(c)) {
            errors.add("categories", not_a_choice(category));
        }
        changes.categories = Some(categories.clone());
    }
    errors.into_result()?;

    Ok((parsed.into(), changes))
}

fn translated_fields(payload: &ListingPayload) -> ListingChanges {
    ListingChanges {
        slug: payload.slug.clone().filter(|s| !s.trim().is_empty()),
        name: localized(payload.name.as_ref()),
        description: localized(payload.description.as_ref()),
        homepage: localized(payload.homepage.as_ref()),
        support_email: localized(payload.support_email.as_ref()),
        support_url: localized(payload.support_url.as_ref()),
        default_locale: payload.default_locale.clone(),
        tags: payload.tags.clone(),
        is_offline: payload.is_offline,
        public_stats: payload.public_stats,
        ..ListingChanges::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_domain::listing::ListingStatus;

    fn payload() -> ListingPayload {
        ListingPayload {
            categories: Some(vec!["games".to_owned()]),
            platforms: Some(vec!["firefoxos".to_owned()]),
            form_factors: Some(vec!["mobile".to_owned()]),
            ..ListingPayload::default()
        }
    }

    fn errors_of(result: Result<ListingChanges, ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation { errors, .. }) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn platforms_and_form_factors_go_together() {
        let only_platforms = ListingPayload { form_factors: None, ..payload() };
        let errors = errors_of(validate_update(&only_platforms, &Listing::default()));
        assert_eq!(
            errors.get(NON_FIELD_ERRORS),
            Some(&["Both \"platforms\" and \"form_factors\" are required.".to_owned()][..])
        );
    }

    #[test]
    fn device_types_replace_platforms() {
        let legacy = ListingPayload {
            platforms: None,
            form_factors: None,
            device_types: Some(vec!["android-tablet".to_owned(), "desktop".to_owned()]),
            ..payload()
        };
        let changes = validate_update(&legacy, &Listing::default()).unwrap();
        assert_eq!(changes.platforms, Some([Platform::Desktop, Platform::Android].into()));
        assert_eq!(changes.form_factors, Some([FormFactor::Desktop, FormFactor::Tablet].into()));
    }

    #[test]
    fn unknown_slugs_and_too_many_categories_are_reported() {
        let bad = ListingPayload {
            categories: Some(vec!["games".to_owned(), "books".to_owned(), "music".to_owned()]),
            platforms: Some(vec!["beos".to_owned()]),
            ..payload()
        };
        let errors = errors_of(validate_update(&bad, &Listing::default()));
        assert_eq!(errors.get("categories"), Some(&["You can have only 2 categories.".to_owned()][..]));
        assert_eq!(
            errors.get("platforms"),
            Some(&["beos is not one of the available choices.".to_owned()][..])
        );
    }

    #[test]
    fn premium_listings_need_a_paid_tier() {
        let premium = ListingPayload {
            premium_type: Some("premium".to_owned()),
            price: Some("0.00".to_owned()),
            ..payload()
        };
        let errors = errors_of(validate_update(&premium, &Listing::default()));
        assert!(errors.get("price").is_some_and(|m| m[0].starts_with("Premium app specified")));

        let priced = ListingPayload { price: Some("1.99".to_owned()), ..premium };
        let changes = validate_update(&priced, &Listing::default()).unwrap();
        assert_eq!(changes.price_tier, Some(2));

        let free_inapp = ListingPayload { premium_type: Some("free-inapp".to_owned()), ..payload() };
        assert!(validate_update(&free_inapp, &Listing::default()).is_ok());
    }

    #[test]
    fn approved_listing_gaining_platforms_is_rereviewed() {
        let mut listing = Listing {
            status: ListingStatus::Public,
            platforms: [Platform::FirefoxOs].into(),
            form_factors: [FormFactor::Mobile].into(),
            ..Listing::default()
        };
        let same = validate_update(&payload(), &listing).unwrap();
        assert!(!same.apply(&mut listing));

        let wider = ListingPayload {
            platforms: Some(vec!["firefoxos".to_owned(), "android".to_owned()]),
            ..payload()
        };
        assert!(validate_update(&wider, &listing).unwrap().apply(&mut listing));
        assert!(listing.needs_rereview);
    }

    #[test]
    fn creation_requires_a_manifest() {
        let err = validate_create(&ListingPayload::default()).unwrap_err();
        assert_eq!(err.http_status(), 400);

        let bad = ListingPayload { manifest: Some("ftp://example.com/m".to_owned()), ..ListingPayload::default() };
        assert!(validate_create(&bad).is_err());

        let good = ListingPayload {
            manifest: Some("https://star-map.example.com/manifest.webapp".to_owned()),
            ..ListingPayload::default()
        };
        let (manifest, _) = validate_create(&good).unwrap();
        assert_eq!(manifest, "https://star-map.example.com/manifest.webapp");
    }
}
