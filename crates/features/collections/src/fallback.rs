//! Collection lookup by region, carrier and category with fallback.
//!
//! Every slot field not requested must be empty on the collection. When nothing matches,
//! requested fields are dropped one at a time in the order region, carrier, category until
//! something matches; the dropped names are reported to the client.

use crate::membership::MembershipSource;
use crate::serializer::CollectionView;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use mkt_domain::catalog::{Carrier, Region};
use mkt_domain::collection::{Collection, CollectionType};
use mkt_kernel::server::{ApiError, ApiState, QueryParams, RequestContext};
use mkt_store::{CollectionFilter, Store};
use tracing::debug;

/// Requested slot. `None` means the collection must not carry the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotQuery {
    pub collection_type: Option<CollectionType>,
    pub region: Option<u32>,
    pub carrier: Option<u32>,
    pub category: Option<String>,
}

impl SlotQuery {
    /// Reads `region`, `carrier` and `cat`/`category` slugs. Unknown slugs are ignored.
    #[must_use]
    pub fn from_params(params: &QueryParams) -> Self {
        Self {
            collection_type: None,
            region: params.get("region").and_then(Region::by_slug).map(|r| r.id),
            carrier: params.get("carrier").and_then(Carrier::by_slug).map(|c| c.id),
            category: params.get("cat").or_else(|| params.get("category")).map(str::to_owned),
        }
    }

    /// Slot of the request: `region` defaults to the request region and `carrier` to the
    /// request carrier.
    #[must_use]
    pub fn for_request(ctx: &RequestContext) -> Self {
        Self {
            region: Some(ctx.region.id),
            carrier: ctx.carrier.map(|c| c.id),
            ..Self::from_params(&ctx.params)
        }
    }

    #[must_use]
    pub fn of_type(mut self, collection_type: CollectionType) -> Self {
        self.collection_type = Some(collection_type);
        self
    }

    fn filter(&self) -> CollectionFilter {
        CollectionFilter {
            collection_type: self.collection_type,
            category: Some(self.category.clone()),
            region: Some(self.region),
            carrier: Some(self.carrier),
            public_only: true,
        }
    }

    /// Drops the next requested field, returning its name.
    fn relax(&mut self) -> Option<&'static str> {
        if self.region.take().is_some() {
            Some("region")
        } else if self.carrier.take().is_some() {
            Some("carrier")
        } else if self.category.take().is_some() {
            Some("category")
        } else {
            None
        }
    }
}

/// Matching public collections plus the fields dropped to find them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackResult {
    pub collections: Vec<Collection>,
    pub dropped: Vec<&'static str>,
}

/// Finds public collections for `query`, relaxing it until something matches. Nothing is
/// reported as dropped when even the fully relaxed query finds nothing.
#[must_use]
pub fn find(store: &Store, mut query: SlotQuery) -> FallbackResult {
    let mut dropped = Vec::new();
    loop {
        let collections = store.collections(&query.filter());
        if !collections.is_empty() {
            return FallbackResult { collections, dropped };
        }
        match query.relax() {
            Some(field) => {
                debug!(field, "No collection matched, dropping filter");
                dropped.push(field);
            },
            None => return FallbackResult { collections, dropped: Vec::new() },
        }
    }
}

/// The first public collection of `collection_type` for the request slot, serialized with
/// its members, plus the fields dropped to find it.
///
/// # Errors
/// Propagates membership resolution failures.
pub async fn top_collection(
    state: &ApiState,
    ctx: &RequestContext,
    collection_type: CollectionType,
    source: MembershipSource,
) -> Result<(Vec<CollectionView>, Vec<&'static str>), ApiError> {
    let found = find(&state.store, SlotQuery::for_request(ctx).of_type(collection_type));
    let mut views = Vec::new();
    if let Some(collection) = found.collections.first() {
        views.push(CollectionView::resolve(state, ctx, collection, source).await?);
    }
    Ok((views, found.dropped))
}

/// Adds `API-Fallback-<name>` with the dropped fields when any were dropped.
pub fn add_fallback_header(headers: &mut HeaderMap, name: &str, dropped: &[&str]) {
    if dropped.is_empty() {
        return;
    }
    let header = HeaderName::try_from(format!("api-fallback-{name}"));
    let value = HeaderValue::try_from(dropped.join(","));
    if let (Ok(header), Ok(value)) = (header, value) {
        headers.insert(header, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn featured(slug: &str, region: Option<u32>, category: Option<&str>) -> Collection {
        Collection {
            collection_type: CollectionType::Featured,
            slug: slug.to_owned(),
            region,
            category: category.map(str::to_owned),
            is_public: true,
            ..Collection::default()
        }
    }

    #[test]
    fn exact_slot_wins() {
        let store = Store::in_memory();
        store.create_collection(featured("global", None, None)).unwrap();
        store.create_collection(featured("brazil", Some(7), None)).unwrap();

        let query = SlotQuery { region: Some(7), ..SlotQuery::default() }.of_type(CollectionType::Featured);
        let result = find(&store, query);
        assert_eq!(result.collections[0].slug, "brazil");
        assert!(result.dropped.is_empty());
    }

    #[test]
    fn region_is_dropped_before_category() {
        let store = Store::in_memory();
        store.create_collection(featured("games", None, Some("games"))).unwrap();
        store.create_collection(featured("global", None, None)).unwrap();

        let query = SlotQuery {
            region: Some(7),
            category: Some("games".to_owned()),
            ..SlotQuery::default()
        };
        let result = find(&store, query.clone());
        assert_eq!(result.collections[0].slug, "games");
        assert_eq!(result.dropped, vec!["region"]);

        let music = SlotQuery { category: Some("music".to_owned()), ..query };
        let result = find(&store, music);
        assert_eq!(result.collections[0].slug, "global");
        assert_eq!(result.dropped, vec!["region", "category"]);
    }

    #[test]
    fn private_collections_never_match() {
        let store = Store::in_memory();
        store.create_collection(Collection { is_public: false, ..featured("draft", None, None) }).unwrap();

        let result = find(&store, SlotQuery { region: Some(2), ..SlotQuery::default() });
        assert!(result.collections.is_empty());
        assert!(result.dropped.is_empty());
    }

    #[test]
    fn header_lists_dropped_fields() {
        let mut headers = HeaderMap::new();
        add_fallback_header(&mut headers, "featured", &[]);
        assert!(headers.is_empty());

        add_fallback_header(&mut headers, "featured", &["region", "carrier"]);
        assert_eq!(headers["api-fallback-featured"], "region,carrier");
    }
}
