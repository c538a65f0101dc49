//! warden-auth-core - 认证核心库
//!
//! 密码哈希、JWT 签发与校验、claims 完整性检查

mod claims;
mod password;
mod token;

pub use claims::{TokenSubject, UnverifiedClaims, VerifiedClaims};
pub use password::{HashCost, HashedSecret, PasswordHasher};
pub use token::{TokenService, TtlPolicy, strip_bearer};
