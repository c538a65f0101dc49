//! 持久化实现

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::{
    PostgresCredentialRepository, PostgresPrincipalRepository, PostgresVerificationRepository,
    apply_schema,
};
