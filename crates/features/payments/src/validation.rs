//! Payment form validation.
//!
//! Forms are checked locally before anything reaches the billing provider. The provider may
//! still reject what passes here; its payload is then handed to the client unchanged.

use mkt_billing::AccountDetails;
use mkt_derive::api_model;
use mkt_domain::catalog::{PremiumType, PriceTier, REGIONS, Region};
use mkt_domain::listing::{Listing, ListingId};
use mkt_domain::payments::{AccountId, PaymentAccount};
use mkt_kernel::server::{ApiError, FieldErrors};
use std::collections::BTreeSet;
use validator::ValidateEmail;

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Seller details of a payment account.
#[api_model]
#[derive(Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AccountForm {
    pub account_name: String,
    pub company_name: String,
    pub vendor_name: String,
    pub finance_email: String,
    pub support_email: String,
    pub address: String,
    pub city: String,
    pub postcode: String,
    /// ISO 3166-1 alpha-3 country code.
    pub country_iso: String,
    /// ISO 4217 currency code.
    pub currency_iso: String,
    pub bank_account_number: String,
    pub bank_name: String,
    pub vat_number: Option<String>,
}

impl From<AccountDetails> for AccountForm {
    fn from(d: AccountDetails) -> Self {
        Self {
            account_name: d.account_name,
            company_name: d.company_name,
            vendor_name: d.vendor_name,
            finance_email: d.finance_email,
            support_email: d.support_email,
            address: d.address,
            city: d.city,
            postcode: d.postcode,
            country_iso: d.country_iso,
            currency_iso: d.currency_iso,
            bank_account_number: d.bank_account_number,
            bank_name: d.bank_name,
            vat_number: d.vat_number,
        }
    }
}

/// Checks required fields and e-mail addresses and returns the provider payload.
///
/// # Errors
/// Returns [`ApiError::Validation`] carrying every field problem found.
pub fn validate_account(form: &AccountForm) -> Result<AccountDetails, ApiError> {
    let mut errors = FieldErrors::new();
    let required = [
        ("account_name", &form.account_name),
        ("company_name", &form.company_name),
        ("vendor_name", &form.vendor_name),
        ("finance_email", &form.finance_email),
        ("support_email", &form.support_email),
        ("address", &form.address),
        ("city", &form.city),
        ("postcode", &form.postcode),
        ("country_iso", &form.country_iso),
        ("currency_iso", &form.currency_iso),
        ("bank_account_number", &form.bank_account_number),
        ("bank_name", &form.bank_name),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.add(field, REQUIRED);
        }
    }
    for (field, value) in [("finance_email", &form.finance_email), ("support_email", &form.support_email)] {
        let value = value.trim();
        if !value.is_empty() && !value.validate_email() {
            errors.add(field, INVALID_EMAIL);
        }
    }
    errors.into_result()?;

    Ok(AccountDetails {
        account_name: form.account_name.trim().to_owned(),
        company_name: form.company_name.trim().to_owned(),
        vendor_name: form.vendor_name.trim().to_owned(),
        finance_email: form.finance_email.trim().to_owned(),
        support_email: form.support_email.trim().to_owned(),
        address: form.address.trim().to_owned(),
        city: form.city.trim().to_owned(),
        postcode: form.postcode.trim().to_owned(),
        country_iso: form.country_iso.trim().to_uppercase(),
        currency_iso: form.currency_iso.trim().to_uppercase(),
        bank_account_number: form.bank_account_number.trim().to_owned(),
        bank_name: form.bank_name.trim().to_owned(),
        vat_number: form.vat_number.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned),
    })
}

/// Terms decision.
#[api_model]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TermsDecision {
    pub accept: bool,
}

/// Monetization settings of a listing. Absent fields keep their current value.
#[api_model]
#[derive(Clone, PartialEq, Eq, Default)]
pub struct MonetizationPayload {
    pub premium_type: Option<String>,
    /// Display price of a tier, e.g. `"0.99"`.
    pub price: Option<String>,
    /// Slugs of the regions the listing is offered in.
    pub regions: Option<Vec<String>>,
    /// Free listing that upsells to this one.
    pub upsell_from: Option<ListingId>,
    /// Payment account receiving the proceeds.
    pub account: Option<AccountId>,
}

/// Validated monetization changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonetizationChanges {
    pub premium_type: PremiumType,
    pub price_tier: Option<u32>,
    pub excluded_regions: Option<BTreeSet<u32>>,
    pub upsell_from: Option<ListingId>,
    pub account: Option<PaymentAccount>,
}

impl MonetizationChanges {
    /// Whether the listing takes payments after the change.
    #[must_use]
    pub const fn is_now_paid(&self) -> bool {
        self.premium_type.is_paid() || matches!(self.premium_type, PremiumType::FreeInApp)
    }
}

/// What the monetization form may reference besides the listing itself.
#[derive(Debug, Clone, Copy)]
pub struct MonetizationChoices<'a> {
    /// Listings the caller owns.
    pub owned: &'a [Listing],
    /// Active accounts the caller may link.
    pub accounts: &'a [PaymentAccount],
    /// Whether a free listing could not switch to a paid premium type.
    pub cannot_be_paid: bool,
}

/// Validates every monetization form at once.
///
/// # Errors
/// Returns [`ApiError::Validation`] carrying every field problem found.
pub fn validate_monetization(
    payload: &MonetizationPayload,
    listing: &Listing,
    choices: MonetizationChoices<'_>,
) -> Result<MonetizationChanges, ApiError> {
    let mut errors = FieldErrors::new();

    let premium_type = match payload.premium_type.as_deref() {
        Some(name) => PremiumType::from_api_name(name).unwrap_or_else(|| {
            errors.add("premium_type", format!("\"{name}\" is not a valid choice."));
            listing.premium_type()
        }),
        None => listing.premium_type(),
    };
    if premium_type.is_paid() && choices.cannot_be_paid {
        errors.add("premium_type", "Paid listings are not supported on the selected platforms.");
    }

    let price_tier = if premium_type.is_paid() {
        let price = payload.price.clone().or_else(|| listing.price().map(PriceTier::price));
        match price.as_deref().and_then(PriceTier::by_price).filter(|t| t.active && !t.is_free()) {
            Some(tier) => Some(tier.id),
            None => {
                errors.add("price", "Premium app specified without a valid price.");
                None
            },
        }
    } else {
        None
    };

    let excluded_regions: Option<BTreeSet<u32>> = payload.regions.as_ref().map(|slugs| {
        if slugs.is_empty() {
            errors.add("regions", "You must select at least one region.");
        }
        let mut offered = BTreeSet::new();
        for slug in slugs {
            match Region::by_slug(slug) {
                Some(region) => {
                    offered.insert(region.id);
                },
                None => errors.add("regions", format!("\"{slug}\" is not a valid choice.")),
            }
        }
        REGIONS.iter().map(|r| r.id).filter(|id| !offered.contains(id)).collect()
    });

    let upsell_from = payload.upsell_from.filter(|_| premium_type.is_paid());
    if let Some(id) = upsell_from {
        let valid = id != listing.id
            && choices.owned.iter().any(|l| l.id == id && l.premium_type() == PremiumType::Free);
        if !valid {
            errors.add("upsell_from", INVALID_CHOICE);
        }
    }

    let account = payload.account.and_then(|id| {
        let account = choices.accounts.iter().find(|a| a.id == id && a.agreed_tos).cloned();
        if account.is_none() {
            errors.add("account", INVALID_CHOICE);
        }
        account
    });

    errors.into_result()?;
    Ok(MonetizationChanges { premium_type, price_tier, excluded_regions, upsell_from, account })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> AccountForm {
        AccountForm {
            account_name: "Stars Inc".to_owned(),
            company_name: "Stars Inc".to_owned(),
            vendor_name: "Stars".to_owned(),
            finance_email: "finance@stars.example.com".to_owned(),
            support_email: "help@stars.example.com".to_owned(),
            address: "1 Orbit Way".to_owned(),
            city: "Lisbon".to_owned(),
            postcode: "1000".to_owned(),
            country_iso: "prt".to_owned(),
            currency_iso: "eur".to_owned(),
            bank_account_number: "PT50000201231234567890154".to_owned(),
            bank_name: "Banco".to_owned(),
            vat_number: Some("  ".to_owned()),
        }
    }

    fn errors_of<T: std::fmt::Debug>(result: Result<T, ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation { errors, .. }) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn account_form_is_normalized() {
        let details = validate_account(&form()).unwrap();
        assert_eq!(details.country_iso, "PRT");
        assert_eq!(details.currency_iso, "EUR");
        assert_eq!(details.vat_number, None);
    }

    #[test]
    fn account_form_reports_every_field() {
        let incomplete = AccountForm { city: String::new(), support_email: "nope".to_owned(), ..form() };
        let errors = errors_of(validate_account(&incomplete));
        assert_eq!(errors.get("city"), Some(&[REQUIRED.to_owned()][..]));
        assert!(errors.get("support_email").is_some());
        assert!(errors.get("finance_email").is_none());
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in ["a@@b.com", "john smith@stars.example.com", "a@b..com", "<x>@y.z", "@stars.example.com"] {
            let form = AccountForm { finance_email: email.to_owned(), ..form() };
            let errors = errors_of(validate_account(&form));
            assert_eq!(errors.get("finance_email"), Some(&[INVALID_EMAIL.to_owned()][..]), "{email}");
        }
        let padded = AccountForm { support_email: "  help@stars.example.com ".to_owned(), ..form() };
        assert_eq!(validate_account(&padded).unwrap().support_email, "help@stars.example.com");
    }

    fn choices<'a>(owned: &'a [Listing], accounts: &'a [PaymentAccount]) -> MonetizationChoices<'a> {
        MonetizationChoices { owned, accounts, cannot_be_paid: false }
    }

    #[test]
    fn premium_needs_a_paid_tier() {
        let listing = Listing { id: 1, ..Listing::default() };
        let payload = MonetizationPayload { premium_type: Some("premium".to_owned()), ..Default::default() };
        let errors = errors_of(validate_monetization(&payload, &listing, choices(&[], &[])));
        assert!(errors.get("price").is_some());

        let payload = MonetizationPayload { price: Some("0.99".to_owned()), ..payload };
        let changes = validate_monetization(&payload, &listing, choices(&[], &[])).unwrap();
        assert_eq!(changes.price_tier, Some(1));
        assert!(changes.is_now_paid());
    }

    #[test]
    fn regions_become_exclusions() {
        let listing = Listing { id: 1, ..Listing::default() };
        let payload = MonetizationPayload {
            regions: Some(REGIONS.iter().filter(|r| r.slug != "br").map(|r| r.slug.to_owned()).collect()),
            ..Default::default()
        };
        let changes = validate_monetization(&payload, &listing, choices(&[], &[])).unwrap();
        assert_eq!(changes.excluded_regions, Some([7].into()));

        let payload = MonetizationPayload { regions: Some(vec!["atlantis".to_owned()]), ..Default::default() };
        assert!(errors_of(validate_monetization(&payload, &listing, choices(&[], &[]))).get("regions").is_some());
    }

    #[test]
    fn references_must_be_usable() {
        let listing = Listing { id: 1, ..Listing::default() };
        let free = Listing { id: 2, ..Listing::default() };
        let pending = PaymentAccount {
            id: 9,
            owner: 5,
            name: "Pending".to_owned(),
            account_id: "5-1".to_owned(),
            uri: "/accounts/1/".to_owned(),
            shared: false,
            agreed_tos: false,
            inactive: false,
            created: 0,
        };
        let payload = MonetizationPayload {
            premium_type: Some("premium".to_owned()),
            price: Some("0.99".to_owned()),
            upsell_from: Some(3),
            account: Some(9),
            ..Default::default()
        };
        let owned = [free];
        let accounts = [pending.clone()];
        let errors = errors_of(validate_monetization(&payload, &listing, choices(&owned, &accounts)));
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["account", "upsell_from"]);

        let active = [PaymentAccount { agreed_tos: true, ..pending }];
        let payload = MonetizationPayload { upsell_from: Some(2), ..payload };
        let changes = validate_monetization(&payload, &listing, choices(&owned, &active)).unwrap();
        assert_eq!(changes.upsell_from, Some(2));
        assert_eq!(changes.account.map(|a| a.id), Some(9));
    }

    #[test]
    fn blocked_platforms_cannot_turn_paid() {
        let listing = Listing { id: 1, ..Listing::default() };
        let payload = MonetizationPayload {
            premium_type: Some("premium".to_owned()),
            price: Some("0.99".to_owned()),
            ..Default::default()
        };
        let blocked = MonetizationChoices { owned: &[], accounts: &[], cannot_be_paid: true };
        assert!(errors_of(validate_monetization(&payload, &listing, blocked)).get("premium_type").is_some());
    }
}
