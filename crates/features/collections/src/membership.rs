//! Membership resolver: the members of a collection a requesting device can run.
//!
//! Members come either straight from the store, in collection order, or from the search
//! index sorted by their rank in the collection. Both paths are read-only and return at most
//! [`MAX_COLLECTION_MEMBERS`] listings.

use mkt_domain::catalog::{DeviceType, FormFactor, Platform};
use mkt_domain::collection::Collection;
use mkt_domain::constants::MAX_COLLECTION_MEMBERS;
use mkt_domain::listing::Listing;
use mkt_index::{Filter, ListingDocument, SearchQuery, Sort};
use mkt_kernel::server::{ApiError, ApiState, QueryParams, RequestContext};
use mkt_store::Store;
use tracing::debug;

/// Where members are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MembershipSource {
    #[default]
    Store,
    /// Index-backed resolution, used by the featured feed outside preview mode.
    Index,
}

/// Device compatibility requested through the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFilter {
    /// Legacy `dev` (+ `device` for Android) pair.
    Legacy(DeviceType),
    Platform { platform: Platform, form_factor: FormFactor },
}

impl DeviceFilter {
    /// Reads `dev`/`device` first, then `platform` + `form_factor`. Unknown values and an
    /// incomplete pair give no filter.
    #[must_use]
    pub fn from_params(params: &QueryParams) -> Option<Self> {
        if let Some(device) =
            params.get("dev").and_then(|dev| DeviceType::from_request_pair(dev, params.get("device")))
        {
            return Some(Self::Legacy(device));
        }
        let platform = params.get("platform").and_then(Platform::from_slug)?;
        let form_factor = params.get("form_factor").and_then(FormFactor::from_slug)?;
        Some(Self::Platform { platform, form_factor })
    }

    /// The `(platform, form factor)` pair a listing must support.
    #[must_use]
    pub const fn pair(self) -> (Platform, FormFactor) {
        match self {
            Self::Legacy(device) => (device.platform(), device.form_factor()),
            Self::Platform { platform, form_factor } => (platform, form_factor),
        }
    }

    #[must_use]
    pub fn admits(self, listing: &Listing) -> bool {
        let (platform, form_factor) = self.pair();
        listing.supports(platform, form_factor)
    }

    fn index_filters(self) -> Vec<Filter> {
        match self {
            Self::Legacy(device) => vec![Filter::term("device", device.id())],
            Self::Platform { platform, form_factor } => vec![
                Filter::term("platform", platform.id()),
                Filter::term("form_factor", form_factor.id()),
            ],
        }
    }
}

/// Resolves the members of `collection` for the request.
///
/// # Errors
/// Returns [`ApiError::BadGateway`] when the index-backed path cannot reach the search backend.
pub async fn resolve(
    state: &ApiState,
    ctx: &RequestContext,
    collection: &Collection,
    source: MembershipSource,
) -> Result<Vec<Listing>, ApiError> {
    match source {
        MembershipSource::Store => Ok(from_store(&state.store, ctx, collection)),
        MembershipSource::Index => from_index(state, ctx, collection).await,
    }
}

/// Public members in collection order, filtered by device and feature profile.
#[must_use]
pub fn from_store(store: &Store, ctx: &RequestContext, collection: &Collection) -> Vec<Listing> {
    let device = DeviceFilter::from_params(&ctx.params);

    store
        .listings_by_ids(&collection.apps)
        .into_iter()
        .filter(Listing::is_public)
        .filter(|listing| device.is_none_or(|d| d.admits(listing)))
        .filter(|listing| ctx.profile.is_none_or(|p| p.is_compatible(listing.features)))
        .take(MAX_COLLECTION_MEMBERS)
        .collect()
}

/// Members found through the search index, ordered by their rank in the collection.
///
/// # Errors
/// Returns [`ApiError::BadGateway`] when the search backend is unavailable.
pub async fn from_index(
    state: &ApiState,
    ctx: &RequestContext,
    collection: &Collection,
) -> Result<Vec<Listing>, ApiError> {
    let query = index_query(ctx, collection);
    let hits = state.index.search(&query).await?;
    debug!(collection = collection.id, total = hits.total, "Collection members from index");

    Ok(state.store.listings_by_ids(&hits.ids()))
}

/// Index query for the members of `collection`.
#[must_use]
pub fn index_query(ctx: &RequestContext, collection: &Collection) -> SearchQuery {
    let in_collection = Filter::term("collection.id", collection.id);

    let mut filters = ListingDocument::visibility_filters(ctx.region.id);
    filters.push(Filter::nested("collection", in_collection.clone()));
    if let Some(device) = DeviceFilter::from_params(&ctx.params) {
        filters.extend(device.index_filters());
    }
    if let Some(profile) = ctx.profile.as_ref().and_then(ListingDocument::profile_filter) {
        filters.push(profile);
    }

    filters
        .into_iter()
        .fold(SearchQuery::new(), SearchQuery::filter)
        .sort_by(Sort::asc("collection.order").nested("collection", in_collection))
        .page(0, MAX_COLLECTION_MEMBERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_domain::catalog::Region;
    use mkt_domain::config::ApiConfig;
    use mkt_domain::features::{FeatureProfile, FeatureSet};
    use mkt_domain::listing::ListingStatus;

    fn context(query: &[(&str, &str)]) -> RequestContext {
        RequestContext {
            user: None,
            region: Region::worldwide(),
            carrier: None,
            lang: "en-US".to_owned(),
            params: QueryParams::from_pairs(query.iter().copied()),
            profile: None,
            path: "/".to_owned(),
        }
    }

    fn listing(slug: &str, platform: Platform, form_factor: FormFactor) -> Listing {
        Listing {
            slug: slug.to_owned(),
            status: ListingStatus::Public,
            platforms: [platform].into(),
            form_factors: [form_factor].into(),
            ..Listing::default()
        }
    }

    async fn seeded() -> (ApiState, Collection) {
        let state = ApiState::builder().config(ApiConfig::default()).build().unwrap();
        let tablet = state.store.insert_listing(listing("tablet", Platform::Android, FormFactor::Tablet));
        let phone = state.store.insert_listing(listing("phone", Platform::Android, FormFactor::Mobile));
        let fxos = state.store.insert_listing(Listing {
            features: FeatureSet::NFC,
            ..listing("fxos", Platform::FirefoxOs, FormFactor::Mobile)
        });
        let hidden = state.store.insert_listing(Listing {
            status: ListingStatus::Pending,
            ..listing("hidden", Platform::Android, FormFactor::Mobile)
        });
        let collection = state
            .store
            .create_collection(Collection {
                slug: "picks".to_owned(),
                apps: vec![fxos.id, phone.id, hidden.id, tablet.id],
                ..Collection::default()
            })
            .unwrap();
        state.reindex_all().await.unwrap();
        (state, collection)
    }

    fn slugs(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.slug.as_str()).collect()
    }

    #[test]
    fn legacy_pair_takes_precedence() {
        let filter = DeviceFilter::from_params(&QueryParams::from_pairs([
            ("dev", "android"),
            ("device", "tablet"),
            ("platform", "desktop"),
            ("form_factor", "desktop"),
        ]));
        assert_eq!(filter, Some(DeviceFilter::Legacy(DeviceType::AndroidTablet)));

        let incomplete = DeviceFilter::from_params(&QueryParams::from_pairs([("platform", "android")]));
        assert_eq!(incomplete, None);
    }

    #[tokio::test]
    async fn store_path_keeps_collection_order() {
        let (state, collection) = seeded().await;

        let all = from_store(&state.store, &context(&[]), &collection);
        assert_eq!(slugs(&all), vec!["fxos", "phone", "tablet"]);

        let phones = from_store(&state.store, &context(&[("dev", "android"), ("device", "mobile")]), &collection);
        assert_eq!(slugs(&phones), vec!["phone"]);
    }

    #[tokio::test]
    async fn both_paths_agree_on_profile_filtering() {
        let (state, collection) = seeded().await;
        let mut ctx = context(&[("platform", "firefoxos"), ("form_factor", "mobile")]);
        assert_eq!(slugs(&from_store(&state.store, &ctx, &collection)), vec!["fxos"]);

        ctx.profile = Some(FeatureProfile::from_supported(FeatureSet::all().difference(FeatureSet::NFC)));
        assert!(from_store(&state.store, &ctx, &collection).is_empty());
        assert!(from_index(&state, &ctx, &collection).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn index_path_sorts_by_rank() {
        let (state, collection) = seeded().await;
        let members = resolve(&state, &context(&[]), &collection, MembershipSource::Index).await.unwrap();
        assert_eq!(slugs(&members), vec!["fxos", "phone", "tablet"]);

        let query = index_query(&context(&[("dev", "firefoxos")]), &collection);
        assert_eq!(query.size, MAX_COLLECTION_MEMBERS);
        assert!(query.filters.contains(&Filter::term("device", DeviceType::FirefoxOs.id())));
    }
}
