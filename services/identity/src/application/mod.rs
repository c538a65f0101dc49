//! 应用层

pub mod accounts;
pub mod credential_store;
pub mod gateway;
pub mod verification_links;

pub use accounts::{AccountService, ProvisionAccount, ProvisionCredential};
pub use credential_store::CredentialStore;
pub use gateway::{AuthGateway, AuthorizedPrincipal, IssuedToken};
pub use verification_links::VerificationLinkStore;
