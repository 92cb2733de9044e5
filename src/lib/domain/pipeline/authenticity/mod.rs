pub mod phash;
pub mod scorer;
pub mod signals;

pub use phash::{hamming_distance, perceptual_hash};
pub use scorer::AuthenticityScorer;
