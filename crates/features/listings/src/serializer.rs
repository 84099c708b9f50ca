//! Listing representation sent to clients.
//!
//! Prices, upsells and availability depend on the request region, and text fields are
//! resolved for the request language.

use mkt_derive::api_model;
use mkt_domain::catalog::{AppType, DeviceType, PriceTier, Region};
use mkt_domain::l10n::LocalizedText;
use mkt_domain::listing::{Listing, ListingId};
use mkt_kernel::server::{ApiState, RequestContext};
use mkt_store::Store;

/// Base path of the listing resource.
pub const LISTING_PATH: &str = "/api/v1/apps/app";

#[must_use]
pub fn resource_uri(id: ListingId) -> String {
    format!("{LISTING_PATH}/{id}")
}

/// Icon URL for the 64px icon, or `None` when no icon was uploaded.
#[must_use]
pub fn icon_url(static_url: &str, listing: &Listing) -> Option<String> {
    listing.icon_hash.as_ref().map(|hash| {
        format!(
            "{}/img/uploads/addon_icons/{}/{}-64.png?modified={hash}",
            static_url.trim_end_matches('/'),
            listing.id / 1000,
            listing.id
        )
    })
}

#[must_use]
pub fn absolute_url(site_url: &str, listing: &Listing) -> String {
    format!("{}/app/{}/", site_url.trim_end_matches('/'), listing.slug)
}

#[api_model]
#[derive(Clone, PartialEq)]
pub struct RatingsView {
    pub average: f64,
    pub count: u32,
}

/// The premium listing a free listing upsells to.
#[api_model]
#[derive(Clone, PartialEq)]
pub struct UpsellView {
    pub id: ListingId,
    pub app_slug: String,
    pub name: Option<String>,
    pub icon_url: Option<String>,
    pub resource_uri: String,
}

#[api_model]
#[derive(Clone, PartialEq)]
pub struct ListingView {
    pub id: ListingId,
    pub resource_uri: String,
    pub absolute_url: String,
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub support_email: Option<String>,
    pub support_url: Option<String>,
    pub default_locale: String,
    pub supported_locales: Vec<String>,
    pub author: String,
    pub app_type: Option<String>,
    pub is_packaged: bool,
    pub is_offline: bool,
    pub manifest_url: Option<String>,
    pub icon: Option<String>,
    pub status: String,
    pub premium_type: String,
    pub platforms: Vec<String>,
    pub form_factors: Vec<String>,
    /// Legacy device types derived from platforms and form factors.
    pub device_types: Vec<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    /// Price in the request region; absent when the listing is not sold there.
    pub price: Option<String>,
    pub price_locale: Option<String>,
    pub payment_required: bool,
    pub payment_account: Option<String>,
    pub ratings: RatingsView,
    pub upsell: Option<UpsellView>,
    pub public_stats: bool,
    pub weekly_downloads: Option<u64>,
    pub created: i64,
}

impl ListingView {
    /// Serializes `listing` for the request.
    #[must_use]
    pub fn build(listing: &Listing, state: &ApiState, ctx: &RequestContext) -> Self {
        let market = &state.config.market;
        let text = |field: &LocalizedText| {
            field.localized(&ctx.lang, &listing.default_locale).map(str::to_owned)
        };
        let tier = regional_price(listing, ctx.region);

        Self {
            id: listing.id,
            resource_uri: resource_uri(listing.id),
            absolute_url: absolute_url(&market.site_url, listing),
            slug: listing.slug.clone(),
            name: text(&listing.name),
            description: text(&listing.description),
            homepage: text(&listing.homepage),
            support_email: text(&listing.support_email),
            support_url: text(&listing.support_url),
            default_locale: listing.default_locale.clone(),
            supported_locales: listing.supported_locales.clone(),
            author: listing.author.clone(),
            app_type: listing.app_type.map(|t| AppType::slug(t).to_owned()),
            is_packaged: listing.is_packaged(),
            is_offline: listing.is_offline,
            manifest_url: listing.manifest_url.clone(),
            icon: icon_url(&market.static_url, listing),
            status: listing.status.as_str().to_owned(),
            premium_type: listing.premium_type().api_name().to_owned(),
            platforms: listing.platforms.iter().map(|p| p.slug().to_owned()).collect(),
            form_factors: listing.form_factors.iter().map(|f| f.slug().to_owned()).collect(),
            device_types: listing
                .device_types()
                .into_iter()
                .map(|d| DeviceType::api_name(d).to_owned())
                .collect(),
            categories: listing.categories.clone(),
            tags: listing.tags.clone(),
            price: tier.map(PriceTier::price),
            price_locale: tier.map(|t| t.price_locale(ctx.region)),
            payment_required: listing.is_paid() && tier.is_some_and(|t| !t.is_free()),
            payment_account: state
                .store
                .listing_link(listing.id)
                .map(|link| format!("/api/v1/payments/account/{}", link.account)),
            ratings: RatingsView { average: listing.average_rating, count: listing.ratings_count },
            upsell: upsell(listing, &state.store, ctx, &market.static_url),
            public_stats: listing.public_stats,
            weekly_downloads: listing.public_stats.then_some(listing.weekly_downloads),
            created: listing.created,
        }
    }
}

/// The price tier shown in `region`: only paid listings sold in that region have one.
fn regional_price(listing: &Listing, region: &Region) -> Option<&'static PriceTier> {
    if !listing.is_paid() {
        return None;
    }
    let sold_here = listing.price_regions.is_empty() || listing.price_regions.contains(&region.id);
    listing.price().filter(|_| sold_here)
}

fn upsell(listing: &Listing, store: &Store, ctx: &RequestContext, static_url: &str) -> Option<UpsellView> {
    let target = store.listing(listing.upsell_to?)?;
    if !target.is_public() || !target.is_available_in(ctx.region) {
        return None;
    }
    Some(UpsellView {
        id: target.id,
        app_slug: target.slug.clone(),
        name: target.name.localized(&ctx.lang, &target.default_locale).map(str::to_owned),
        icon_url: icon_url(static_url, &target),
        resource_uri: resource_uri(target.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_domain::catalog::{FormFactor, Platform, PremiumType};
    use mkt_domain::config::ApiConfig;
    use mkt_domain::listing::ListingStatus;
    use mkt_kernel::server::QueryParams;

    fn context(region: &str) -> RequestContext {
        RequestContext {
            user: None,
            region: Region::by_slug(region).unwrap(),
            carrier: None,
            lang: "es".to_owned(),
            params: QueryParams::default(),
            profile: None,
            path: LISTING_PATH.to_owned(),
        }
    }

    fn paid_listing() -> Listing {
        let mut name = LocalizedText::new("en-US", "Star Map");
        name.insert("es", "Mapa Estelar");
        Listing {
            slug: "star-map".to_owned(),
            name,
            default_locale: "en-US".to_owned(),
            premium_type: Some(PremiumType::Premium),
            price_tier: Some(1),
            price_regions: [2].into(),
            platforms: [Platform::Android, Platform::FirefoxOs].into(),
            form_factors: [FormFactor::Mobile].into(),
            status: ListingStatus::Public,
            ..Listing::default()
        }
    }

    #[test]
    fn price_only_in_price_regions() {
        let state = ApiState::builder().config(ApiConfig::default()).build().unwrap();
        let listing = state.store.insert_listing(paid_listing());

        let view = ListingView::build(&listing, &state, &context("us"));
        assert_eq!(view.price.as_deref(), Some("0.99"));
        assert_eq!(view.price_locale.as_deref(), Some("$0.99"));
        assert!(view.payment_required);
        assert_eq!(view.name.as_deref(), Some("Mapa Estelar"));
        assert_eq!(view.device_types, vec!["firefoxos", "android-mobile"]);

        let view = ListingView::build(&listing, &state, &context("br"));
        assert_eq!(view.price, None);
        assert!(!view.payment_required);
    }

    #[test]
    fn upsell_hidden_when_target_is_excluded() {
        let state = ApiState::builder().config(ApiConfig::default()).build().unwrap();
        let premium = state.store.insert_listing(Listing {
            excluded_regions: [7].into(),
            ..paid_listing()
        });
        let free = state.store.insert_listing(Listing {
            slug: "star-map-lite".to_owned(),
            upsell_to: Some(premium.id),
            status: ListingStatus::Public,
            ..Listing::default()
        });

        let view = ListingView::build(&free, &state, &context("us"));
        assert_eq!(view.upsell.map(|u| u.app_slug), Some("star-map".to_owned()));
        assert!(ListingView::build(&free, &state, &context("br")).upsell.is_none());
    }

    #[test]
    fn weekly_downloads_follow_public_stats() {
        let state = ApiState::builder().config(ApiConfig::default()).build().unwrap();
        let listing = Listing { weekly_downloads: 40, public_stats: false, ..Listing::default() };
        assert_eq!(ListingView::build(&listing, &state, &context("us")).weekly_downloads, None);

        let listing = Listing { public_stats: true, ..listing };
        assert_eq!(ListingView::build(&listing, &state, &context("us")).weekly_downloads, Some(40));
    }
}
