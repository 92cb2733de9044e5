pub mod card;
pub mod dead_letter;
pub mod health;
pub mod idempotency;
pub mod postgres;

pub use postgres::Postgres;
