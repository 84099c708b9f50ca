//! Static marketplace lookup tables: platforms, form factors, legacy device types,
//! premium and app types, regions, carriers, categories and price tiers.

use serde::{Deserialize, Serialize};

/// Operating platform a listing can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Desktop,
    Android,
    #[serde(rename = "firefoxos")]
    FirefoxOs,
}

impl Platform {
    pub const ALL: [Self; 3] = [Self::Desktop, Self::Android, Self::FirefoxOs];

    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Desktop => 1,
            Self::Android => 2,
            Self::FirefoxOs => 3,
        }
    }

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Android => "android",
            Self::FirefoxOs => "firefoxos",
        }
    }

    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.slug() == slug)
    }
}

/// Physical device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFactor {
    Desktop,
    Mobile,
    Tablet,
}

impl FormFactor {
    pub const ALL: [Self; 3] = [Self::Desktop, Self::Mobile, Self::Tablet];

    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Desktop => 1,
            Self::Mobile => 2,
            Self::Tablet => 3,
        }
    }

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
        }
    }

    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.slug() == slug)
    }
}

/// Legacy device type kept for API v1 clients.
///
/// Every device type maps to exactly one `(Platform, FormFactor)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "desktop")]
    Desktop,
    #[serde(rename = "android-mobile")]
    AndroidMobile,
    #[serde(rename = "android-tablet")]
    AndroidTablet,
    #[serde(rename = "firefoxos")]
    FirefoxOs,
}

impl DeviceType {
    pub const ALL: [Self; 4] =
        [Self::Desktop, Self::AndroidMobile, Self::AndroidTablet, Self::FirefoxOs];

    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Desktop => 1,
            Self::AndroidMobile => 2,
            Self::AndroidTablet => 3,
            Self::FirefoxOs => 4,
        }
    }

    #[must_use]
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::AndroidMobile => "android-mobile",
            Self::AndroidTablet => "android-tablet",
            Self::FirefoxOs => "firefoxos",
        }
    }

    #[must_use]
    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.api_name() == name)
    }

    /// Builds the device type from the `dev`/`device` request pair
    /// (`dev=android&device=mobile` is `android-mobile`).
    #[must_use]
    pub fn from_request_pair(dev: &str, device: Option<&str>) -> Option<Self> {
        match (dev, device) {
            ("android", Some(kind)) => Self::from_api_name(&format!("android-{kind}")),
            ("android", None) => None,
            (other, _) => Self::from_api_name(other),
        }
    }

    #[must_use]
    pub const fn platform(self) -> Platform {
        match self {
            Self::Desktop => Platform::Desktop,
            Self::AndroidMobile | Self::AndroidTablet => Platform::Android,
            Self::FirefoxOs => Platform::FirefoxOs,
        }
    }

    #[must_use]
    pub const fn form_factor(self) -> FormFactor {
        match self {
            Self::Desktop => FormFactor::Desktop,
            Self::AndroidMobile | Self::FirefoxOs => FormFactor::Mobile,
            Self::AndroidTablet => FormFactor::Tablet,
        }
    }
}

/// Premium classification of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PremiumType {
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "premium")]
    Premium,
    #[serde(rename = "premium-inapp")]
    PremiumInApp,
    #[serde(rename = "free-inapp")]
    FreeInApp,
    #[serde(rename = "other")]
    Other,
}

impl PremiumType {
    pub const ALL: [Self; 5] =
        [Self::Free, Self::Premium, Self::PremiumInApp, Self::FreeInApp, Self::Other];
    pub const PAID: [Self; 2] = [Self::Premium, Self::PremiumInApp];
    pub const FREE: [Self; 3] = [Self::Free, Self::FreeInApp, Self::Other];

    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Premium => 1,
            Self::PremiumInApp => 2,
            Self::FreeInApp => 3,
            Self::Other => 4,
        }
    }

    #[must_use]
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::PremiumInApp => "premium-inapp",
            Self::FreeInApp => "free-inapp",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.api_name() == name)
    }

    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Premium | Self::PremiumInApp)
    }

    #[must_use]
    pub const fn has_in_app(self) -> bool {
        matches!(self, Self::PremiumInApp | Self::FreeInApp)
    }
}

/// Delivery model of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    Hosted,
    Packaged,
    Privileged,
}

impl AppType {
    pub const ALL: [Self; 3] = [Self::Hosted, Self::Packaged, Self::Privileged];

    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Hosted => 1,
            Self::Packaged => 2,
            Self::Privileged => 3,
        }
    }

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Hosted => "hosted",
            Self::Packaged => "packaged",
            Self::Privileged => "privileged",
        }
    }

    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.slug() == slug)
    }

    #[must_use]
    pub const fn is_packaged(self) -> bool {
        matches!(self, Self::Packaged | Self::Privileged)
    }
}

/// Sales region.
///
/// Popularity is global in adolescent regions and region-local in mature ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub id: u32,
    pub slug: &'static str,
    pub name: &'static str,
    pub currency: &'static str,
    pub adolescent: bool,
}

impl Region {
    #[must_use]
    pub const fn is_mature(&self) -> bool {
        !self.adolescent
    }

    #[must_use]
    pub fn by_slug(slug: &str) -> Option<&'static Self> {
        REGIONS.iter().find(|r| r.slug == slug)
    }

    #[must_use]
    pub fn by_id(id: u32) -> Option<&'static Self> {
        REGIONS.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn worldwide() -> &'static Self {
        &REGIONS[0]
    }
}

pub static REGIONS: [Region; 12] = [
    Region { id: 1, slug: "restofworld", name: "Rest of World", currency: "USD", adolescent: true },
    Region { id: 2, slug: "us", name: "United States", currency: "USD", adolescent: false },
    Region { id: 4, slug: "uk", name: "United Kingdom", currency: "GBP", adolescent: false },
    Region { id: 7, slug: "br", name: "Brazil", currency: "BRL", adolescent: true },
    Region { id: 8, slug: "es", name: "Spain", currency: "EUR", adolescent: false },
    Region { id: 9, slug: "co", name: "Colombia", currency: "COP", adolescent: true },
    Region { id: 10, slug: "ve", name: "Venezuela", currency: "USD", adolescent: true },
    Region { id: 11, slug: "pl", name: "Poland", currency: "PLN", adolescent: true },
    Region { id: 12, slug: "mx", name: "Mexico", currency: "MXN", adolescent: true },
    Region { id: 14, slug: "de", name: "Germany", currency: "EUR", adolescent: false },
    Region { id: 15, slug: "hu", name: "Hungary", currency: "HUF", adolescent: true },
    Region { id: 30, slug: "fr", name: "France", currency: "EUR", adolescent: false },
];

/// Mobile network operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Carrier {
    pub id: u32,
    pub slug: &'static str,
    pub name: &'static str,
}

impl Carrier {
    #[must_use]
    pub fn by_slug(slug: &str) -> Option<&'static Self> {
        CARRIERS.iter().find(|c| c.slug == slug)
    }

    #[must_use]
    pub fn by_id(id: u32) -> Option<&'static Self> {
        CARRIERS.iter().find(|c| c.id == id)
    }
}

pub static CARRIERS: [Carrier; 8] = [
    Carrier { id: 0, slug: "carrierless", name: "Carrierless" },
    Carrier { id: 1, slug: "telefonica", name: "Telefonica" },
    Carrier { id: 2, slug: "america_movil", name: "America Movil" },
    Carrier { id: 3, slug: "deutsche_telekom", name: "Deutsche Telekom" },
    Carrier { id: 4, slug: "telenor", name: "Telenor" },
    Carrier { id: 5, slug: "hutchinson", name: "Hutchinson" },
    Carrier { id: 6, slug: "sprint", name: "Sprint" },
    Carrier { id: 7, slug: "megafon", name: "MegaFon" },
];

pub static CATEGORIES: [&str; 18] = [
    "books",
    "business",
    "education",
    "entertainment",
    "games",
    "health-fitness",
    "lifestyle",
    "maps-navigation",
    "music",
    "news-weather",
    "photo-video",
    "productivity",
    "reference",
    "shopping",
    "social",
    "sports",
    "travel",
    "utilities",
];

#[must_use]
pub fn is_category(slug: &str) -> bool {
    CATEGORIES.contains(&slug)
}

/// A price point. Tier zero is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceTier {
    pub id: u32,
    /// Price in the smallest currency unit (cents of USD).
    pub cents: u32,
    pub active: bool,
}

impl PriceTier {
    #[must_use]
    pub fn by_id(id: u32) -> Option<&'static Self> {
        PRICE_TIERS.iter().find(|t| t.id == id)
    }

    /// Looks a tier up by its display price, e.g. `"0.99"`.
    #[must_use]
    pub fn by_price(price: &str) -> Option<&'static Self> {
        PRICE_TIERS.iter().find(|t| t.price() == price)
    }

    #[must_use]
    pub fn active() -> impl Iterator<Item = &'static Self> {
        PRICE_TIERS.iter().filter(|t| t.active)
    }

    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.cents == 0
    }

    #[must_use]
    pub fn price(&self) -> String {
        format!("{}.{:02}", self.cents / 100, self.cents % 100)
    }

    /// Price formatted for a region's currency.
    #[must_use]
    pub fn price_locale(&self, region: &Region) -> String {
        let amount = self.price();
        match region.currency {
            "USD" => format!("${amount}"),
            "EUR" => format!("{amount} €"),
            "GBP" => format!("£{amount}"),
            "BRL" => format!("R${amount}"),
            other => format!("{amount} {other}"),
        }
    }
}

pub static PRICE_TIERS: [PriceTier; 9] = [
    PriceTier { id: 0, cents: 0, active: true },
    PriceTier { id: 1, cents: 99, active: true },
    PriceTier { id: 2, cents: 199, active: true },
    PriceTier { id: 3, cents: 299, active: true },
    PriceTier { id: 4, cents: 499, active: true },
    PriceTier { id: 5, cents: 999, active: true },
    PriceTier { id: 6, cents: 1499, active: true },
    PriceTier { id: 7, cents: 1999, active: true },
    PriceTier { id: 8, cents: 4999, active: false },
];

/// Language analyzers available for localized relevance clauses.
#[must_use]
pub fn analyzer_for_locale(locale: &str) -> Option<&'static str> {
    let lang = locale.split(['-', '_']).next().unwrap_or(locale).to_ascii_lowercase();
    match lang.as_str() {
        "en" => Some("english"),
        "es" => Some("spanish"),
        "de" => Some("german"),
        "fr" => Some("french"),
        "it" => Some("italian"),
        "pl" => Some("polish"),
        "pt" => Some("portuguese"),
        "ru" => Some("russian"),
        "hu" => Some("hungarian"),
        "nl" => Some("dutch"),
        _ => None,
    }
}
