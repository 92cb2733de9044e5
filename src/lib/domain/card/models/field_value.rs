//! The OCR-reasoner's per-field result shape, including the `set` field's
//! dual single-value / multi-candidate form.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::unit::UnitInterval;

/// A single candidate value with its own confidence, used inside
/// [`FieldValue::MultiCandidate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate<T> {
    pub value: Option<T>,
    pub confidence: UnitInterval,
}

/// One field of [`super::card_metadata::CardMetadata`].
///
/// Most fields (name, rarity, collector number, illustrator) are a single
/// value with one confidence and rationale. The `set` field may instead be
/// a multi-candidate form carrying alternate guesses the language model
/// considered. Parsing must accept either shape without the caller needing
/// to know in advance which one a given response used.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<T> {
    Single {
        value: Option<T>,
        confidence: UnitInterval,
        rationale: String,
    },
    MultiCandidate {
        value: Option<T>,
        candidates: Vec<Candidate<T>>,
        rationale: String,
    },
}

impl<T: Clone> FieldValue<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FieldValue::Single { value, .. } => value.as_ref(),
            FieldValue::MultiCandidate { value, .. } => value.as_ref(),
        }
    }

    pub fn confidence(&self) -> UnitInterval {
        match self {
            FieldValue::Single { confidence, .. } => *confidence,
            FieldValue::MultiCandidate { candidates, .. } => candidates
                .first()
                .map(|c| c.confidence)
                .unwrap_or(UnitInterval::clamp(0.0)),
        }
    }

    pub fn rationale(&self) -> &str {
        match self {
            FieldValue::Single { rationale, .. } => rationale,
            FieldValue::MultiCandidate { rationale, .. } => rationale,
        }
    }

    /// The value to persist: the primary value, or (merge rule 3) the
    /// first candidate's value when the primary is null.
    pub fn resolved_value(&self) -> Option<T> {
        match self {
            FieldValue::Single { value, .. } => value.clone(),
            FieldValue::MultiCandidate {
                value, candidates, ..
            } => value
                .clone()
                .or_else(|| candidates.first().and_then(|c| c.value.clone())),
        }
    }
}

impl<T: Serialize> Serialize for FieldValue<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        match self {
            FieldValue::Single {
                value,
                confidence,
                rationale,
            } => {
                map.serialize_entry("value", value)?;
                map.serialize_entry("confidence", confidence)?;
                map.serialize_entry("rationale", rationale)?;
            }
            FieldValue::MultiCandidate {
                value,
                candidates,
                rationale,
            } => {
                map.serialize_entry("value", value)?;
                map.serialize_entry("candidates", candidates)?;
                map.serialize_entry("rationale", rationale)?;
            }
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldValue<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldValueVisitor<T>(std::marker::PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for FieldValueVisitor<T> {
            type Value = FieldValue<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a field value object with either `confidence` or `candidates`")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut value: Option<Option<T>> = None;
                let mut confidence: Option<UnitInterval> = None;
                let mut candidates: Option<Vec<Candidate<T>>> = None;
                let mut rationale: Option<String> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "value" => value = Some(map.next_value()?),
                        "confidence" => confidence = Some(map.next_value()?),
                        "candidates" => candidates = Some(map.next_value()?),
                        "rationale" => rationale = Some(map.next_value()?),
                        _ => {
                            let _: de::IgnoredAny = map.next_value()?;
                        }
                    }
                }

                let rationale = rationale.ok_or_else(|| de::Error::missing_field("rationale"))?;
                let value = value.unwrap_or(None);

                if let Some(candidates) = candidates {
                    Ok(FieldValue::MultiCandidate {
                        value,
                        candidates,
                        rationale,
                    })
                } else {
                    let confidence =
                        confidence.ok_or_else(|| de::Error::missing_field("confidence"))?;
                    Ok(FieldValue::Single {
                        value,
                        confidence,
                        rationale,
                    })
                }
            }
        }

        deserializer.deserialize_map(FieldValueVisitor(std::marker::PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_shape() {
        let json = r#"{"value":"Charizard","confidence":0.92,"rationale":"exact match"}"#;
        let field: FieldValue<String> = serde_json::from_str(json).unwrap();
        assert_eq!(field.value(), Some(&"Charizard".to_string()));
    }

    #[test]
    fn parses_multi_candidate_shape() {
        let json = r#"{
            "value": null,
            "candidates": [
                {"value": "Base Set", "confidence": 0.6},
                {"value": "Base Set 2", "confidence": 0.3}
            ],
            "rationale": "ambiguous set symbol"
        }"#;
        let field: FieldValue<String> = serde_json::from_str(json).unwrap();
        assert_eq!(field.resolved_value(), Some("Base Set".to_string()));
    }
}
