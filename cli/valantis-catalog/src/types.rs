//! Catalog domain types as exchanged with the API.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};

/// Opaque key naming a product in the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A catalog entry.
///
/// Two products with the same [`ProductId`] are the same product,
/// whatever their other fields say.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Carried as `product` on the wire.
    #[serde(rename = "product")]
    pub name: String,
    /// Accepted as a JSON number or a numeric string.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub price: f64,
    #[serde(default)]
    pub brand: Option<String>,
}

/// User supplied predicates narrowing the catalog.
///
/// Absent fields impose no constraint. Serialized with absent fields
/// omitted, which is also the shape `get_ids` expects as its params.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

impl FilterSet {
    /// Whether `product` satisfies every present predicate.
    ///
    /// Name is a case-sensitive substring match, price is exact numeric
    /// equality and brand is exact equality.
    pub fn matches(&self, product: &Product) -> bool {
        let name_matches = self
            .name
            .as_deref()
            .is_none_or(|name| product.name.contains(name));
        let price_matches = self.price.is_none_or(|price| product.price == price);
        let brand_matches = self
            .brand
            .as_deref()
            .is_none_or(|brand| product.brand.as_deref() == Some(brand));

        name_matches && price_matches && brand_matches
    }
}
