//! Curated collections of listings.

use crate::l10n::LocalizedText;
use crate::listing::{ListingId, UserId};
use serde::{Deserialize, Serialize};

pub type CollectionId = u64;

/// Collection classification. Featured and operator collections are unique per
/// `(category, region, carrier)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CollectionType {
    #[default]
    Basic,
    Featured,
    Operator,
}

impl CollectionType {
    #[must_use]
    pub const fn is_unique_per_slot(self) -> bool {
        matches!(self, Self::Featured | Self::Operator)
    }
}

impl From<CollectionType> for u8 {
    fn from(value: CollectionType) -> Self {
        match value {
            CollectionType::Basic => 0,
            CollectionType::Featured => 1,
            CollectionType::Operator => 2,
        }
    }
}

impl TryFrom<u8> for CollectionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Basic),
            1 => Ok(Self::Featured),
            2 => Ok(Self::Operator),
            other => Err(format!("\"{other}\" is not a valid choice.")),
        }
    }
}

/// The `(category, region, carrier)` combination a collection is pinned to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionSlot {
    pub category: Option<String>,
    pub region: Option<u32>,
    pub carrier: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub collection_type: CollectionType,
    pub slug: String,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub category: Option<String>,
    pub region: Option<u32>,
    pub carrier: Option<u32>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub can_be_hero: bool,
    pub is_public: bool,
    pub image_hash: Option<String>,
    pub default_language: String,
    pub author: Option<UserId>,
    /// Member listings in display order.
    pub apps: Vec<ListingId>,
}

impl Collection {
    #[must_use]
    pub fn slot(&self) -> CollectionSlot {
        CollectionSlot {
            category: self.category.clone(),
            region: self.region,
            carrier: self.carrier,
        }
    }

    /// Rank of a member within the collection.
    #[must_use]
    pub fn position(&self, listing: ListingId) -> Option<usize> {
        self.apps.iter().position(|id| *id == listing)
    }
}
