use mkt_domain::catalog::{FormFactor, Platform};
use mkt_domain::features::{FeatureProfile, FeatureSet};
use mkt_domain::l10n::LocalizedText;
use mkt_domain::listing::{Listing, ListingStatus};
use mkt_index::{
    Clause, Filter, ListingDocument, MemoryIndex, SearchIndex, SearchQuery, Sort,
};
use proptest::prelude::*;

fn listing(id: u64, name: &str, popularity: u64) -> Listing {
    Listing {
        id,
        slug: name.to_lowercase().replace(' ', "-"),
        name: LocalizedText::new("en-US", name),
        default_locale: "en-US".to_owned(),
        status: ListingStatus::Public,
        platforms: [Platform::FirefoxOs].into(),
        form_factors: [FormFactor::Mobile].into(),
        popularity,
        ..Listing::default()
    }
}

async fn index_of(listings: &[Listing]) -> MemoryIndex {
    let index = MemoryIndex::new();
    let docs = listings.iter().map(|l| ListingDocument::from_listing(l, &[])).collect();
    index.upsert(docs).await.unwrap();
    index
}

#[tokio::test]
async fn filters_and_sorts_by_popularity() {
    let mut hidden = listing(3, "Hidden", 900);
    hidden.status = ListingStatus::Pending;
    let index = index_of(&[listing(1, "Maps", 10), listing(2, "Mail", 50), hidden]).await;

    let query = SearchQuery::new()
        .filter(Filter::term("status", "public"))
        .sort_by(Sort::from_key("-popularity"))
        .page(0, 10);
    let hits = index.search(&query).await.unwrap();

    assert_eq!(hits.total, 2);
    assert_eq!(hits.ids(), vec![2, 1]);
}

#[tokio::test]
async fn should_clauses_require_a_match_and_rank_by_boost() {
    let index =
        index_of(&[listing(1, "Star Map", 0), listing(2, "Map Star", 0), listing(3, "Mail", 0)])
            .await;

    let query = SearchQuery::new()
        .should(Clause::Match {
            field: "name".into(),
            query: "star map".into(),
            boost: 3.0,
            analyzer: None,
        })
        .should(Clause::MatchPhrase {
            field: "name".into(),
            query: "star map".into(),
            boost: 4.0,
            slop: 1,
        })
        .page(0, 10);
    let hits = index.search(&query).await.unwrap();

    assert_eq!(hits.ids(), vec![1, 2]);
    assert!(hits.hits[0].score > hits.hits[1].score);
}

#[tokio::test]
async fn fuzzy_clause_tolerates_typos() {
    let index = index_of(&[listing(1, "Calculator", 0)]).await;
    let query = SearchQuery::new()
        .should(Clause::Fuzzy {
            field: "name".into(),
            value: "calculater".into(),
            boost: 2.0,
            prefix_length: 1,
        })
        .page(0, 10);

    assert_eq!(index.search(&query).await.unwrap().ids(), vec![1]);
}

#[tokio::test]
async fn nested_sort_orders_by_rank_in_one_collection() {
    let index = MemoryIndex::new();
    let docs = vec![
        ListingDocument::from_listing(&listing(1, "One", 0), &[(7, 2), (8, 0)]),
        ListingDocument::from_listing(&listing(2, "Two", 0), &[(7, 0)]),
        ListingDocument::from_listing(&listing(3, "Three", 0), &[(7, 1), (8, 1)]),
        ListingDocument::from_listing(&listing(4, "Four", 0), &[(8, 2)]),
    ];
    index.upsert(docs).await.unwrap();

    let query = SearchQuery::new()
        .filter(Filter::term("collection.id", 7))
        .sort_by(Sort::asc("collection.order").nested("collection", Filter::term("collection.id", 7)))
        .page(0, 10);

    assert_eq!(index.search(&query).await.unwrap().ids(), vec![2, 3, 1]);
}

#[tokio::test]
async fn upsert_replaces_and_remove_forgets() {
    let index = index_of(&[listing(1, "Maps", 0)]).await;
    index.upsert(vec![ListingDocument::from_listing(&listing(1, "Atlas", 0), &[])]).await.unwrap();
    assert_eq!(index.len(), 1);

    let atlas = SearchQuery::new()
        .should(Clause::Term { field: "name_sort".into(), value: "atlas".into(), boost: 10.0 })
        .page(0, 10);
    assert_eq!(index.search(&atlas).await.unwrap().ids(), vec![1]);

    index.remove(1).await.unwrap();
    index.remove(42).await.unwrap();
    assert_eq!(index.len(), 0);
}

#[tokio::test]
async fn visibility_and_profile_filters_hide_listings() {
    let mut excluded = listing(2, "Excluded", 0);
    excluded.excluded_regions = [7].into();
    let mut disabled = listing(3, "Disabled", 0);
    disabled.disabled_by_user = true;
    let mut needs_nfc = listing(4, "Needs NFC", 0);
    needs_nfc.features = FeatureSet::NFC;
    let index = index_of(&[listing(1, "Visible", 0), excluded, disabled, needs_nfc]).await;

    let mut query = SearchQuery::new().page(0, 10);
    for filter in ListingDocument::visibility_filters(7) {
        query = query.filter(filter);
    }
    assert_eq!(index.search(&query).await.unwrap().ids(), vec![1, 4]);

    let profile = FeatureProfile::from_supported(FeatureSet::all().difference(FeatureSet::NFC));
    let query = query.filter(ListingDocument::profile_filter(&profile).unwrap());
    assert_eq!(index.search(&query).await.unwrap().ids(), vec![1]);
    assert!(ListingDocument::profile_filter(&FeatureProfile::from_supported(FeatureSet::all())).is_none());
}

#[tokio::test]
async fn missing_sort_values_go_last() {
    let mut reviewed = listing(1, "Reviewed", 0);
    reviewed.reviewed = Some(100);
    let index = index_of(&[listing(2, "Fresh", 0), reviewed]).await;

    for key in ["reviewed", "-reviewed"] {
        let query = SearchQuery::new().sort_by(Sort::from_key(key)).page(0, 10);
        assert_eq!(index.search(&query).await.unwrap().ids()[0], 1);
    }
}

proptest! {
    #[test]
    fn pages_never_exceed_size_and_total_counts_all(
        count in 0_u64..30,
        from in 0_usize..40,
        size in 0_usize..15,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let listings: Vec<Listing> = (1..=count).map(|id| listing(id, "App", id)).collect();
        let index = runtime.block_on(index_of(&listings));

        let hits = index.execute(&SearchQuery::new().page(from, size));
        prop_assert_eq!(hits.total, count);
        prop_assert!(hits.hits.len() <= size);
        let expected = usize::try_from(count).unwrap().saturating_sub(from).min(size);
        prop_assert_eq!(hits.hits.len(), expected);
    }
}
