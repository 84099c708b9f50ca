//! Monetization settings of a listing: premium type and price, offered regions, upsell and
//! the payment account receiving the proceeds.
//!
//! Saving runs in a fixed order: regions, premium type (synced to the provider product when
//! the listing is already linked), then, for listings that now take payments, upsell and
//! account link. A provider failure stops the sequence with a 502. Steps already saved stay.

use crate::Payments;
use crate::orchestrator::remote;
use crate::serializer::{MonetizationView, price_tiers};
use crate::validation::{
    MonetizationChanges, MonetizationChoices, MonetizationPayload, validate_monetization,
};
use mkt_billing::ProductSpec;
use mkt_domain::catalog::{Platform, PremiumType, REGIONS};
use mkt_domain::listing::{Listing, ListingId};
use mkt_domain::payments::AccountLink;
use mkt_kernel::server::{ApiError, ApiState, RequestContext};
use tracing::info;

/// Whether a free listing is on platforms that rule out payments: desktop, no Firefox OS, or
/// Android while Android payments are off (unless it is a packaged listing and packaged
/// Android apps are off as well).
#[must_use]
pub fn cannot_be_paid(listing: &Listing, payments: &Payments) -> bool {
    if listing.premium_type() != PremiumType::Free {
        return false;
    }
    let platforms = &listing.platforms;
    let android_blocked = !payments.android_payments
        && (!listing.is_packaged() || payments.android_packaged)
        && platforms.contains(&Platform::Android);

    platforms.contains(&Platform::Desktop) || !platforms.contains(&Platform::FirefoxOs) || android_blocked
}

/// Current settings of `listing`.
///
/// # Errors
/// Returns [`ApiError::Internal`] when the payments slice is not registered.
pub fn settings(state: &ApiState, listing: &Listing) -> Result<MonetizationView, ApiError> {
    let payments = state.try_get_slice::<Payments>()?;
    let premium_type = listing.premium_type();

    let regions = REGIONS
        .iter()
        .filter(|r| !listing.excluded_regions.contains(&r.id))
        .map(|r| r.slug.to_owned())
        .collect();
    let paid_regions = REGIONS
        .iter()
        .filter(|r| listing.price_regions.is_empty() || listing.price_regions.contains(&r.id))
        .map(|r| r.slug.to_owned())
        .collect();
    let upsell_from = state
        .store
        .all_listings()
        .into_iter()
        .filter(|l| l.upsell_to == Some(listing.id))
        .map(|l| l.id)
        .collect();

    Ok(MonetizationView {
        premium_type: premium_type.api_name().to_owned(),
        price: listing.price().map(|t| t.price()),
        is_paid: premium_type.is_paid() || premium_type == PremiumType::FreeInApp,
        cannot_be_paid: cannot_be_paid(listing, payments),
        regions,
        paid_regions,
        price_tiers: price_tiers(),
        account: state.store.listing_link(listing.id).map(|link| link.account),
        upsell_from,
        platforms: listing.platforms.iter().map(|p| p.slug().to_owned()).collect(),
    })
}

/// Validates all forms, then saves them in order. Returns the ids of every listing touched.
///
/// # Errors
/// Returns [`ApiError::Validation`] before anything is saved, and [`ApiError::BadGateway`]
/// or [`ApiError::Rejected`] when a provider step fails.
pub async fn save(
    state: &ApiState,
    ctx: &RequestContext,
    listing: &Listing,
    payload: &MonetizationPayload,
) -> Result<Vec<ListingId>, ApiError> {
    let user = ctx.require_user()?;
    let payments = state.try_get_slice::<Payments>()?;
    let owned = state.store.listings_owned_by(user);
    let accounts = state.store.usable_accounts(user);
    let choices = MonetizationChoices {
        owned: &owned,
        accounts: &accounts,
        cannot_be_paid: cannot_be_paid(listing, payments),
    };
    let changes = validate_monetization(payload, listing, choices)?;

    let mut touched = vec![listing.id];

    if let Some(excluded) = changes.excluded_regions.clone() {
        state.store.update_listing(listing.id, |stored| {
            stored.excluded_regions = excluded;
            Ok(())
        })?;
    }

    let updated = state.store.update_listing(listing.id, |stored| {
        stored.premium_type = Some(changes.premium_type);
        stored.price_tier = changes.price_tier;
        Ok(())
    })?;
    let spec = product_spec(&updated, ctx);
    if let Some(link) = state.store.listing_link(listing.id) {
        let synced = remote("update_product", state.billing.update_product(&link.product_uri, &spec).await);
        if let Err(err) = synced {
            state.reindex(touched).await;
            return Err(err);
        }
    }

    if changes.is_now_paid() {
        let result = save_paid(state, &updated, &changes, &spec, &mut touched).await;
        state.reindex(touched.iter().copied()).await;
        result?;
    } else {
        state.reindex(touched.iter().copied()).await;
    }

    info!(listing = listing.id, premium_type = changes.premium_type.api_name(), "Monetization saved");
    Ok(touched)
}

async fn save_paid(
    state: &ApiState,
    listing: &Listing,
    changes: &MonetizationChanges,
    spec: &ProductSpec,
    touched: &mut Vec<ListingId>,
) -> Result<(), ApiError> {
    if changes.premium_type != PremiumType::FreeInApp {
        if let Some(free) = changes.upsell_from {
            state.store.update_listing(free, |stored| {
                stored.upsell_to = Some(listing.id);
                Ok(())
            })?;
            touched.push(free);
        }
    }

    if let Some(account) = &changes.account {
        let already_linked = state.store.listing_link(listing.id).is_some_and(|l| l.account == account.id);
        if !already_linked {
            let product_uri = remote("create_product", state.billing.create_product(account, spec).await)?;
            state.store.link_account(AccountLink {
                listing: listing.id,
                account: account.id,
                product_uri,
                disabled: false,
            });
            info!(listing = listing.id, account = account.id, "Listing linked to payment account");
        }
    }
    Ok(())
}

fn product_spec(listing: &Listing, ctx: &RequestContext) -> ProductSpec {
    ProductSpec {
        listing: listing.id,
        name: listing
            .name
            .localized(&ctx.lang, &listing.default_locale)
            .unwrap_or(&listing.slug)
            .to_owned(),
        price_tier: listing.price_tier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_domain::catalog::{AppType, FormFactor};
    use crate::PaymentsInner;

    fn payments(android_payments: bool, android_packaged: bool) -> Payments {
        Payments::new(PaymentsInner {
            portal_url: "https://portal.example.com/login".to_owned(),
            android_payments,
            android_packaged,
        })
    }

    fn free_on(platforms: &[Platform]) -> Listing {
        Listing {
            platforms: platforms.iter().copied().collect(),
            form_factors: [FormFactor::Mobile].into(),
            ..Listing::default()
        }
    }

    #[test]
    fn desktop_or_missing_firefox_os_block_payments() {
        let payments = payments(true, false);
        assert!(cannot_be_paid(&free_on(&[Platform::Desktop, Platform::FirefoxOs]), &payments));
        assert!(cannot_be_paid(&free_on(&[Platform::Android]), &payments));
        assert!(!cannot_be_paid(&free_on(&[Platform::FirefoxOs, Platform::Android]), &payments));
    }

    #[test]
    fn android_depends_on_the_payment_switches() {
        let hosted = free_on(&[Platform::FirefoxOs, Platform::Android]);
        let packaged = Listing { app_type: Some(AppType::Packaged), ..hosted.clone() };

        let off = payments(false, false);
        assert!(cannot_be_paid(&hosted, &off));
        assert!(!cannot_be_paid(&packaged, &off));

        let packaged_on = payments(false, true);
        assert!(cannot_be_paid(&packaged, &packaged_on));
    }

    #[test]
    fn paid_listings_are_never_blocked() {
        let payments = payments(false, false);
        let premium = Listing {
            premium_type: Some(PremiumType::Premium),
            ..free_on(&[Platform::Desktop])
        };
        assert!(!cannot_be_paid(&premium, &payments));
    }
}
