//! Raw filter values as typed by a user.

use thiserror::Error;
use valantis_catalog::FilterSet;

#[derive(Debug, Error, PartialEq)]
pub enum FilterInputError {
    #[error("price '{0}' is not a number")]
    InvalidPrice(String),
}

/// Unvalidated filter fields.
///
/// Values are trimmed and blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterInput {
    pub name: Option<String>,
    pub price: Option<String>,
    pub brand: Option<String>,
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl TryFrom<FilterInput> for FilterSet {
    type Error = FilterInputError;

    fn try_from(input: FilterInput) -> Result<Self, Self::Error> {
        let price = normalize(input.price)
            .map(|price| {
                price
                    .parse::<f64>()
                    .ok()
                    .filter(|parsed| parsed.is_finite())
                    .ok_or(FilterInputError::InvalidPrice(price))
            })
            .transpose()?;

        Ok(FilterSet {
            name: normalize(input.name),
            price,
            brand: normalize(input.brand),
        })
    }
}
