//! The search-side projection of a listing.

use mkt_domain::catalog::{AppType, analyzer_for_locale};
use crate::query::Filter;
use mkt_domain::collection::CollectionId;
use mkt_domain::features::FeatureProfile;
use mkt_domain::listing::{Listing, ListingStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Rank of a listing inside one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: CollectionId,
    pub order: usize,
}

/// Indexed fields of a listing. Enumerations are stored by numeric id.
///
/// Localized analyzer fields (`name_l10n_<analyzer>`) and mature-region popularity
/// (`popularity_<region id>`) are flattened into the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDocument {
    pub id: u64,
    pub app_slug: String,
    pub name: Vec<String>,
    pub name_sort: String,
    pub description: Vec<String>,
    pub author: String,
    pub tags: Vec<String>,
    pub category: Vec<String>,
    pub premium_type: u8,
    /// Price in cents; zero for free listings.
    pub price: u32,
    pub platform: Vec<u8>,
    pub form_factor: Vec<u8>,
    pub device: Vec<u8>,
    pub app_type: Option<u8>,
    pub manifest_url: Option<String>,
    pub is_offline: bool,
    pub supported_locales: Vec<String>,
    pub status: ListingStatus,
    pub is_disabled: bool,
    pub region_exclusions: Vec<u32>,
    /// Feature keys the listing requires.
    pub features: Vec<String>,
    pub popularity: u64,
    pub weekly_downloads: u64,
    pub bayesian_rating: f64,
    pub created: i64,
    pub reviewed: Option<i64>,
    pub collection: Vec<Membership>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ListingDocument {
    #[must_use]
    pub fn from_listing(listing: &Listing, memberships: &[(CollectionId, usize)]) -> Self {
        let default_name = listing
            .name
            .localized(&listing.default_locale, &listing.default_locale)
            .unwrap_or(&listing.slug)
            .to_lowercase();

        let mut extra = BTreeMap::new();
        for (field, text) in [("name", &listing.name), ("description", &listing.description)] {
            for (locale, value) in text.iter() {
                if let Some(analyzer) = analyzer_for_locale(locale) {
                    extra
                        .entry(format!("{field}_l10n_{analyzer}"))
                        .or_insert_with(|| Value::String(value.to_owned()));
                }
            }
        }
        for (region, popularity) in &listing.region_popularity {
            extra.insert(format!("popularity_{region}"), Value::from(*popularity));
        }

        Self {
            id: listing.id,
            app_slug: listing.slug.clone(),
            name: listing.name.values().map(str::to_owned).collect(),
            name_sort: default_name,
            description: listing.description.values().map(str::to_owned).collect(),
            author: listing.author.clone(),
            tags: listing.tags.clone(),
            category: listing.categories.clone(),
            premium_type: listing.premium_type().id(),
            price: listing.price().map_or(0, |tier| tier.cents),
            platform: listing.platforms.iter().map(|p| p.id()).collect(),
            form_factor: listing.form_factors.iter().map(|f| f.id()).collect(),
            device: listing.device_types().iter().map(|d| d.id()).collect(),
            app_type: listing.app_type.map(AppType::id),
            manifest_url: listing.manifest_url.clone(),
            is_offline: listing.is_offline,
            supported_locales: listing.supported_locales.clone(),
            status: listing.status,
            is_disabled: listing.disabled_by_user,
            region_exclusions: listing.excluded_regions.iter().copied().collect(),
            features: listing.features.keys().collect(),
            popularity: listing.popularity,
            weekly_downloads: listing.weekly_downloads,
            bayesian_rating: listing.bayesian_rating,
            created: listing.created,
            reviewed: listing.reviewed,
            collection: memberships
                .iter()
                .map(|(id, order)| Membership { id: *id, order: *order })
                .collect(),
            extra,
        }
    }

    /// Filters every public query applies: public status, enabled, not excluded in `region`.
    #[must_use]
    pub fn visibility_filters(region: u32) -> Vec<Filter> {
        vec![
            Filter::term("status", "public"),
            Filter::term("is_disabled", false),
            Filter::term("region_exclusions", region).negate(),
        ]
    }

    /// Excludes listings that require a feature the device lacks.
    #[must_use]
    pub fn profile_filter(profile: &FeatureProfile) -> Option<Filter> {
        let missing: Vec<String> = profile.unsupported().keys().collect();
        (!missing.is_empty()).then(|| Filter::terms("features", missing).negate())
    }
}
