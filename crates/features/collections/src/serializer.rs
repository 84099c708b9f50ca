use crate::membership::{self, MembershipSource};
use mkt_derive::api_model;
use mkt_domain::catalog::{Carrier, Region};
use mkt_domain::collection::{Collection, CollectionId, CollectionType};
use mkt_domain::l10n::LocalizedText;
use mkt_kernel::server::{ApiError, ApiState, RequestContext};
use mkt_listings::serializer::ListingView;

/// Image URL on the static host, versioned by the image hash.
#[must_use]
pub fn image_url(static_url: &str, collection: &Collection) -> Option<String> {
    collection.image_hash.as_ref().map(|hash| {
        format!(
            "{}/api/v1/rocketfuel/collections/{}/image.png?{hash}",
            static_url.trim_end_matches('/'),
            collection.id
        )
    })
}

#[api_model]
#[derive(Clone, PartialEq)]
pub struct CollectionView {
    pub id: CollectionId,
    /// `0` basic, `1` featured, `2` operator shelf.
    pub collection_type: u8,
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub carrier: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    /// Only sent for operator shelves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_be_hero: Option<bool>,
    pub is_public: bool,
    pub image: Option<String>,
    pub default_language: String,
    pub author: Option<u64>,
    pub apps: Vec<ListingView>,
}

impl CollectionView {
    /// Serializes `collection` with already resolved member views.
    #[must_use]
    pub fn build(collection: &Collection, apps: Vec<ListingView>, state: &ApiState, ctx: &RequestContext) -> Self {
        let text = |field: &LocalizedText| {
            field.localized(&ctx.lang, &collection.default_language).map(str::to_owned)
        };

        Self {
            id: collection.id,
            collection_type: collection.collection_type.into(),
            slug: collection.slug.clone(),
            name: text(&collection.name),
            description: text(&collection.description),
            category: collection.category.clone(),
            region: collection.region.and_then(Region::by_id).map(|r| r.slug.to_owned()),
            carrier: collection.carrier.and_then(Carrier::by_id).map(|c| c.slug.to_owned()),
            background_color: collection.background_color.clone(),
            text_color: collection.text_color.clone(),
            can_be_hero: (collection.collection_type == CollectionType::Operator)
                .then_some(collection.can_be_hero),
            is_public: collection.is_public,
            image: image_url(&state.config.market.static_url, collection),
            default_language: collection.default_language.clone(),
            author: collection.author,
            apps,
        }
    }

    /// Resolves the members the requesting device can run and serializes the collection.
    ///
    /// # Errors
    /// Propagates membership resolution failures.
    pub async fn resolve(
        state: &ApiState,
        ctx: &RequestContext,
        collection: &Collection,
        source: MembershipSource,
    ) -> Result<Self, ApiError> {
        let apps = membership::resolve(state, ctx, collection, source)
            .await?
            .iter()
            .map(|listing| ListingView::build(listing, state, ctx))
            .collect();
        Ok(Self::build(collection, apps, state, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_domain::config::ApiConfig;
    use mkt_kernel::server::QueryParams;

    fn context() -> RequestContext {
        RequestContext {
            user: None,
            region: Region::worldwide(),
            carrier: None,
            lang: "en-US".to_owned(),
            params: QueryParams::default(),
            profile: None,
            path: "/".to_owned(),
        }
    }

    #[test]
    fn hero_flag_only_for_operator_shelves() {
        let state = ApiState::builder().config(ApiConfig::default()).build().unwrap();
        let shelf = Collection {
            id: 3,
            collection_type: CollectionType::Operator,
            can_be_hero: true,
            carrier: Some(1),
            name: LocalizedText::new("en-US", "Telefonica picks"),
            ..Collection::default()
        };

        let view = CollectionView::build(&shelf, Vec::new(), &state, &context());
        assert_eq!(view.can_be_hero, Some(true));
        assert_eq!(view.carrier.as_deref(), Some("telefonica"));

        let basic = Collection { collection_type: CollectionType::Basic, ..shelf };
        let json = serde_json::to_value(CollectionView::build(&basic, Vec::new(), &state, &context())).unwrap();
        assert!(json.get("can_be_hero").is_none());
        assert_eq!(json["name"], "Telefonica picks");
    }

    #[test]
    fn image_url_carries_the_hash() {
        let collection = Collection { id: 9, image_hash: Some("a1b2c3d4".to_owned()), ..Collection::default() };
        assert_eq!(
            image_url("https://static.example.com/", &collection).as_deref(),
            Some("https://static.example.com/api/v1/rocketfuel/collections/9/image.png?a1b2c3d4")
        );
        assert_eq!(image_url("https://static.example.com", &Collection::default()), None);
    }
}
