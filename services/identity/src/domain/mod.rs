//! 领域层

pub mod credential;
pub mod email;
pub mod notifier;
pub mod principal;
pub mod repositories;
pub mod verification;

pub use credential::*;
pub use email::*;
pub use notifier::*;
pub use principal::*;
pub use repositories::*;
pub use verification::*;
