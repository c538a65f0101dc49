//! JWT 签发与校验

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use warden_errors::{AppError, AppResult};

use crate::claims::{SessionClaims, TokenSubject, UnverifiedClaims, VerifiedClaims};

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// token 有效期策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlPolicy {
    /// 使用配置中的有效期
    Default,
    Custom(Duration),
}

/// 去掉可选的 `Bearer ` 前缀（大小写不敏感，可重复）
pub fn strip_bearer(raw: &str) -> &str {
    let mut rest = raw.trim();
    loop {
        let is_prefixed = rest.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("bearer"))
            && rest[6..].starts_with(char::is_whitespace);
        if !is_prefixed {
            return rest;
        }
        rest = rest[6..].trim_start();
    }
}

/// Token 服务
///
/// 签名密钥在启动时加载一次，进程内不轮换。
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    expires_in: i64,
}

impl TokenService {
    /// 仅支持 HS256/HS384/HS512，密钥非空，有效期为正
    pub fn new(secret: &str, algorithm: &str, expires_in: i64) -> AppResult<Self> {
        if secret.is_empty() {
            return Err(AppError::config("jwt secret must not be empty"));
        }
        if expires_in <= 0 {
            return Err(AppError::config("jwt expiry must be positive"));
        }
        let algorithm: Algorithm = algorithm
            .parse()
            .map_err(|_| AppError::config(format!("unknown jwt algorithm: {algorithm}")))?;
        if !HMAC_ALGORITHMS.contains(&algorithm) {
            return Err(AppError::config(format!(
                "jwt algorithm {algorithm:?} is not an HMAC algorithm"
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            expires_in,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }

    /// 签发 token
    pub fn issue(&self, subject: &TokenSubject, ttl: TtlPolicy) -> AppResult<String> {
        let lifetime = match ttl {
            TtlPolicy::Default => Duration::seconds(self.expires_in),
            TtlPolicy::Custom(lifetime) => lifetime,
        };
        let now = Utc::now();

        let claims = SessionClaims {
            id: subject.id.to_string(),
            email: &subject.email,
            scope: subject.scope.as_str(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))
    }

    /// 不校验签名地解析 token，解析失败返回 None
    pub fn decode(&self, token: &str) -> Option<UnverifiedClaims> {
        let token = strip_bearer(token);
        if token.is_empty() {
            return None;
        }

        let mut validation = Validation::new(self.algorithm);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<UnverifiedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .ok()
    }

    /// claims 完整性检查
    pub fn verify(&self, claims: &UnverifiedClaims) -> AppResult<()> {
        claims.verify().map(|_| ())
    }

    /// 完整校验：签名、过期时间（零容差）、完整性
    pub fn authenticate(&self, token: &str) -> AppResult<VerifiedClaims> {
        let token = strip_bearer(token);

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<UnverifiedClaims>(token, &self.decoding_key, &validation)
            .map_err(classify)?
            .claims;
        let subject = claims.verify()?;
        // jsonwebtoken 不检查 iat
        let issued_at = claims.iat.ok_or(AppError::IncompleteToken)?;
        let expires_at = claims.exp.ok_or(AppError::IncompleteToken)?;

        Ok(VerifiedClaims::new(subject, issued_at, expires_at))
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> AppError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AppError::Expired,
        ErrorKind::MissingRequiredClaim(_) => AppError::IncompleteToken,
        _ => AppError::signature_invalid(err.to_string()),
    }
}
