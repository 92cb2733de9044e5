pub mod authenticity;
pub mod card;
pub mod card_metadata;
pub mod comps;
pub mod errors;
pub mod feature_envelope;
pub mod field_value;
pub mod pricing;
pub mod unit;

pub use authenticity::{AuthenticityResult, AuthenticitySignals};
pub use card::{Card, Identification};
pub use card_metadata::CardMetadata;
pub use comps::{Condition, NormalizedComp, RawComp};
pub use errors::{
    AggregationError, AuthenticityError, FeatureExtractionError, OcrReasonerError, PipelineError,
    PricingError,
};
pub use feature_envelope::FeatureEnvelope;
pub use field_value::{Candidate, FieldValue};
pub use pricing::{PriceQuery, PricingResult, Trend, ValuationSummary};
pub use unit::{NonNegativeUsd, UnitInterval};
