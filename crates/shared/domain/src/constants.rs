//! Shared string constants and limits.

pub const SYSTEM_TAG: &str = "System";
pub const SEARCH_TAG: &str = "Search";
pub const COLLECTIONS_TAG: &str = "Collections";
pub const LISTINGS_TAG: &str = "Listings";
pub const PAYMENTS_TAG: &str = "Payments";

/// Header carrying the authenticated developer id, set by the gateway.
pub const USER_HEADER: &str = "x-mkt-user";
/// Header carrying the request region slug when no `region` parameter is sent.
pub const REGION_HEADER: &str = "x-mkt-region";
/// Header carrying the carrier slug of the requesting device.
pub const CARRIER_HEADER: &str = "x-mkt-carrier";

/// Maximum number of categories a listing may belong to.
pub const MAX_CATEGORIES: usize = 2;
/// Hard ceiling for collection membership results.
pub const MAX_COLLECTION_MEMBERS: usize = 100;
/// Length of generated in-app product secrets.
pub const IN_APP_SECRET_LENGTH: usize = 48;
