//! Marketplace listings.

use crate::catalog::{AppType, DeviceType, FormFactor, Platform, PremiumType, PriceTier, Region};
use crate::features::FeatureSet;
use crate::l10n::LocalizedText;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type ListingId = u64;
pub type UserId = u64;

/// Review lifecycle of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Submission not finished (e.g. missing a payment account).
    #[default]
    Incomplete,
    Pending,
    Public,
    /// Approved but not published.
    Approved,
    Rejected,
    Disabled,
}

impl ListingStatus {
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Public | Self::Approved)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::Pending => "pending",
            Self::Public => "public",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Disabled => "disabled",
        }
    }
}

/// An application offered in the marketplace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub slug: String,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub homepage: LocalizedText,
    pub support_email: LocalizedText,
    pub support_url: LocalizedText,
    pub default_locale: String,
    pub supported_locales: Vec<String>,
    pub author: String,
    pub app_type: Option<AppType>,
    pub manifest_url: Option<String>,
    pub premium_type: Option<PremiumType>,
    pub price_tier: Option<u32>,
    pub platforms: BTreeSet<Platform>,
    pub form_factors: BTreeSet<FormFactor>,
    pub features: FeatureSet,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub status: ListingStatus,
    pub disabled_by_user: bool,
    pub is_offline: bool,
    pub popularity: u64,
    /// Region-local popularity for mature regions, keyed by region id.
    pub region_popularity: BTreeMap<u32, u64>,
    pub weekly_downloads: u64,
    pub public_stats: bool,
    pub bayesian_rating: f64,
    pub average_rating: f64,
    pub ratings_count: u32,
    /// Unix timestamp, seconds.
    pub created: i64,
    pub reviewed: Option<i64>,
    /// Regions where a paid listing is sold.
    pub price_regions: BTreeSet<u32>,
    pub excluded_regions: BTreeSet<u32>,
    pub owners: BTreeSet<UserId>,
    /// Premium listing this free listing upsells to.
    pub upsell_to: Option<ListingId>,
    pub needs_rereview: bool,
    pub icon_hash: Option<String>,
}

impl Listing {
    #[must_use]
    pub fn premium_type(&self) -> PremiumType {
        self.premium_type.unwrap_or(PremiumType::Free)
    }

    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.premium_type().is_paid()
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.status == ListingStatus::Public && !self.disabled_by_user
    }

    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owners.contains(&user)
    }

    #[must_use]
    pub fn is_packaged(&self) -> bool {
        self.app_type.is_some_and(AppType::is_packaged)
    }

    #[must_use]
    pub fn price(&self) -> Option<&'static PriceTier> {
        self.price_tier.and_then(PriceTier::by_id)
    }

    /// Whether the listing is visible to buyers in the region.
    #[must_use]
    pub fn is_available_in(&self, region: &Region) -> bool {
        if self.excluded_regions.contains(&region.id) {
            return false;
        }
        !self.is_paid() || self.price_regions.is_empty() || self.price_regions.contains(&region.id)
    }

    /// Legacy device types derived from platforms and form factors.
    #[must_use]
    pub fn device_types(&self) -> Vec<DeviceType> {
        device_types(&self.platforms, &self.form_factors)
    }

    #[must_use]
    pub fn supports(&self, platform: Platform, form_factor: FormFactor) -> bool {
        self.platforms.contains(&platform) && self.form_factors.contains(&form_factor)
    }

    #[must_use]
    pub fn popularity_in(&self, region: &Region) -> u64 {
        if region.is_mature() {
            self.region_popularity.get(&region.id).copied().unwrap_or(0)
        } else {
            self.popularity
        }
    }
}

/// Maps platforms and form factors back to the legacy device types.
///
/// Desktop and Firefox OS platforms imply their device type on their own; Android needs the
/// matching form factor.
#[must_use]
pub fn device_types(
    platforms: &BTreeSet<Platform>,
    form_factors: &BTreeSet<FormFactor>,
) -> Vec<DeviceType> {
    let mut devices = Vec::new();
    if platforms.contains(&Platform::Desktop) {
        devices.push(DeviceType::Desktop);
    }
    if platforms.contains(&Platform::FirefoxOs) {
        devices.push(DeviceType::FirefoxOs);
    }
    if platforms.contains(&Platform::Android) {
        if form_factors.contains(&FormFactor::Mobile) {
            devices.push(DeviceType::AndroidMobile);
        }
        if form_factors.contains(&FormFactor::Tablet) {
            devices.push(DeviceType::AndroidTablet);
        }
    }
    devices
}

/// Translates legacy device types into platforms and form factors.
#[must_use]
pub fn from_device_types(
    devices: &[DeviceType],
) -> (BTreeSet<Platform>, BTreeSet<FormFactor>) {
    devices.iter().fold((BTreeSet::new(), BTreeSet::new()), |(mut platforms, mut forms), d| {
        platforms.insert(d.platform());
        forms.insert(d.form_factor());
        (platforms, forms)
    })
}
