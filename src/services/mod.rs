// Service exports
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod scorer;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;
pub use repository::{InsertOutcome, ProfileRepository, RepositoryError};
pub use scorer::{Scorer, ScorerClient, ScorerError};
