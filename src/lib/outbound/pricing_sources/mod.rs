//! Concrete pricing-source backends.
//!
//! Each backend only knows its own query syntax and response shape; rate
//! limiting, circuit breaking, and retry are supplied uniformly by
//! [`crate::domain::pipeline::pricing::SourceAdapter`].

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::domain::card::models::comps::RawComp;
use crate::domain::card::models::pricing::{PriceQuery, PriceVariant};
use crate::domain::pipeline::pricing::SourceAdapterBackend;

/// Builds the quoted-phrase search string the MUST adapter behavior
/// requires: name and set matched as one phrase, or name alone for the
/// name-only fallback search.
fn quoted_phrase(name: &str, set: Option<&str>) -> String {
    match set {
        Some(set) => format!("\"{name} {set}\""),
        None => format!("\"{name}\""),
    }
}

/// Whether `number` contains characters that trip up the source's search
/// syntax (anything but letters and digits), so it should be dropped from
/// the query rather than sent as-is.
fn number_is_punctuation_problematic(number: &str) -> bool {
    number.chars().any(|c| !c.is_alphanumeric())
}

#[derive(Debug, Deserialize)]
struct SoldListing {
    price: f64,
    currency: String,
    condition: String,
    sold_at: DateTime<Utc>,
    listing_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    listings: Vec<SoldListing>,
}

/// One HTTP-reachable comp marketplace, queried by card name/set/number.
#[derive(Debug, Clone)]
pub struct HttpMarketplaceBackend {
    name: String,
    client: Client,
    base_url: String,
}

impl HttpMarketplaceBackend {
    pub fn new(name: impl Into<String>, client: Client, base_url: String) -> Self {
        Self {
            name: name.into(),
            client,
            base_url,
        }
    }

    /// Runs one quoted-phrase search for `variant`, skipping the collector
    /// number whenever it contains punctuation the source's query syntax
    /// can't handle.
    async fn search(
        &self,
        phrase: &str,
        query: &PriceQuery,
        variant: PriceVariant,
    ) -> anyhow::Result<Vec<RawComp>> {
        let mut request = self
            .client
            .get(format!("{}/sold-listings", self.base_url.trim_end_matches('/')))
            .query(&[
                ("q", phrase),
                ("window_days", &query.window_days.to_string()),
                ("variant", variant.as_query_param()),
            ]);

        if let Some(number) = &query.number {
            if !number_is_punctuation_problematic(number) {
                request = request.query(&[("number", number.as_str())]);
            }
        }
        if let Some(condition) = &query.condition {
            request = request.query(&[("condition", condition.as_str())]);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{} sold-listings request failed", self.name))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", self.name))?;

        let parsed: SearchResponse = response
            .json()
            .await
            .with_context(|| format!("{} response was not valid JSON", self.name))?;

        Ok(parsed
            .listings
            .into_iter()
            .map(|l| RawComp {
                source: self.name.clone(),
                price: l.price,
                currency: l.currency,
                condition: l.condition,
                sold_date: l.sold_at,
                listing_url: l.listing_url,
            })
            .collect())
    }
}

impl SourceAdapterBackend for HttpMarketplaceBackend {
    fn name(&self) -> &str {
        &self.name
    }

    /// MUST behaviors, applied in order: (a) quoted name+set phrase search,
    /// number dropped when punctuation-problematic; (b) if that returns no
    /// listings, retry with a name-only phrase; (c) if still empty, retry
    /// the name-only phrase under the rarity-derived variant's fallback
    /// (normal falls back to holofoil).
    async fn fetch_raw(&self, query: &PriceQuery) -> anyhow::Result<Vec<RawComp>> {
        let variant = query.price_variant();
        let primary_phrase = quoted_phrase(&query.card_name, query.set.as_deref());
        let mut comps = self.search(&primary_phrase, query, variant).await?;

        if comps.is_empty() && query.set.is_some() {
            let name_only_phrase = quoted_phrase(&query.card_name, None);
            comps = self.search(&name_only_phrase, query, variant).await?;
        }

        if comps.is_empty() {
            if let Some(fallback_variant) = variant.fallback() {
                let name_only_phrase = quoted_phrase(&query.card_name, None);
                comps = self.search(&name_only_phrase, query, fallback_variant).await?;
            }
        }

        Ok(comps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_phrase_combines_name_and_set() {
        assert_eq!(quoted_phrase("Charizard", Some("Base Set")), "\"Charizard Base Set\"");
    }

    #[test]
    fn quoted_phrase_without_set_is_name_only() {
        assert_eq!(quoted_phrase("Charizard", None), "\"Charizard\"");
    }

    #[test]
    fn collector_numbers_with_punctuation_are_flagged() {
        assert!(number_is_punctuation_problematic("4/102"));
        assert!(number_is_punctuation_problematic("SWSH-001"));
        assert!(!number_is_punctuation_problematic("4"));
        assert!(!number_is_punctuation_problematic("102"));
    }
}
