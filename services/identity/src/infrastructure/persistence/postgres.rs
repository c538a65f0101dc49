//! PostgreSQL Repository 实现

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use warden_adapter_postgres::{db_error, is_unique_violation};
use warden_auth_core::HashedSecret;
use warden_common::{Scope, UserId};
use warden_errors::{AppError, AppResult};

use crate::domain::{
    CredentialRepository, Email, LinkDigest, NewAccount, Principal, PrincipalRepository,
    StoredCredential, VerificationRepository,
};

const SCHEMA: &str = include_str!("../../../migrations/0001_identity.sql");

/// 建表（幂等）
pub async fn apply_schema(pool: &PgPool) -> AppResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(db_error("Failed to apply identity schema"))?;
    tracing::info!("Identity schema applied");
    Ok(())
}

#[derive(sqlx::FromRow)]
struct PrincipalRow {
    id: Uuid,
    email: String,
    scope: String,
    active: bool,
}

impl PrincipalRow {
    fn into_principal(self) -> AppResult<Principal> {
        let scope = self
            .scope
            .parse::<Scope>()
            .map_err(|e| AppError::internal(format!("corrupt principal row {}: {}", self.id, e)))?;

        Ok(Principal {
            id: UserId::from_uuid(self.id),
            email: Email::from_stored(self.email),
            scope,
            active: self.active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    principal: PrincipalRow,
    password_hash: String,
}

/// 分区名来自封闭的 `Scope` 枚举，对应 schema 中的同名视图
fn credential_lookup_sql(scope: Scope) -> String {
    format!(
        r#"
        SELECT p.id, p.email, p.scope, p.active, c.password_hash
        FROM {} p
        JOIN credentials c ON c.owner_id = p.id
        WHERE p.email = $1
        "#,
        scope.partition()
    )
}

fn unique_or_db(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        if is_unique_violation(&e) {
            AppError::DuplicateAccount
        } else {
            db_error(context)(e)
        }
    }
}

pub struct PostgresPrincipalRepository {
    pool: PgPool,
}

impl PostgresPrincipalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalRepository for PostgresPrincipalRepository {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, email, scope, active
            FROM principals
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find principal"))?;

        row.map(PrincipalRow::into_principal).transpose()
    }

    async fn create(&self, account: &NewAccount) -> AppResult<()> {
        let principal = &account.principal;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO principals (id, email, scope, active)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(principal.id.0)
        .bind(principal.email.as_str())
        .bind(principal.scope.as_str())
        .bind(principal.active)
        .execute(&mut *tx)
        .await
        .map_err(unique_or_db("Failed to insert principal"))?;

        if let Some(hash) = &account.password_hash {
            sqlx::query("INSERT INTO credentials (owner_id, password_hash) VALUES ($1, $2)")
                .bind(principal.id.0)
                .bind(hash.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to insert credential"))?;
        }

        if let Some(digest) = &account.verification {
            sqlx::query("INSERT INTO email_verifications (hash, owner_id) VALUES ($1, $2)")
                .bind(digest.as_str())
                .bind(principal.id.0)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to insert verification"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;
        Ok(())
    }

    async fn update(&self, principal: &Principal) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE principals SET email = $2, scope = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(principal.id.0)
        .bind(principal.email.as_str())
        .bind(principal.scope.as_str())
        .execute(&self.pool)
        .await
        .map_err(unique_or_db("Failed to update principal"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("principal {}", principal.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM principals WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete principal"))?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct PostgresCredentialRepository {
    pool: PgPool,
}

impl PostgresCredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialRepository for PostgresCredentialRepository {
    async fn find_by_email_and_scope(
        &self,
        email: &str,
        scope: Scope,
    ) -> AppResult<Option<StoredCredential>> {
        let sql = credential_lookup_sql(scope);
        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find credential"))?;

        row.map(|r| -> AppResult<StoredCredential> {
            Ok(StoredCredential {
                principal: r.principal.into_principal()?,
                password_hash: HashedSecret::from_hash(r.password_hash),
            })
        })
        .transpose()
    }

    async fn replace_hash(&self, owner_id: &UserId, hash: &HashedSecret) -> AppResult<()> {
        let result = sqlx::query("UPDATE credentials SET password_hash = $2 WHERE owner_id = $1")
            .bind(owner_id.0)
            .bind(hash.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to replace credential hash"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("credential of {}", owner_id)));
        }
        Ok(())
    }
}

pub struct PostgresVerificationRepository {
    pool: PgPool,
}

impl PostgresVerificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationRepository for PostgresVerificationRepository {
    async fn insert(&self, owner_id: &UserId, digest: &LinkDigest) -> AppResult<()> {
        sqlx::query("INSERT INTO email_verifications (hash, owner_id) VALUES ($1, $2)")
            .bind(digest.as_str())
            .bind(owner_id.0)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to insert verification"))?;
        Ok(())
    }

    async fn find_owner(&self, digest: &LinkDigest) -> AppResult<Option<UserId>> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT owner_id FROM email_verifications WHERE hash = $1")
                .bind(digest.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to find verification"))?;

        Ok(row.map(|(owner,)| UserId::from_uuid(owner)))
    }

    async fn consume_and_activate(&self, owner_id: &UserId) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let consumed: Vec<(String,)> =
            sqlx::query_as("DELETE FROM email_verifications WHERE owner_id = $1 RETURNING hash")
                .bind(owner_id.0)
                .fetch_all(&mut *tx)
                .await
                .map_err(db_error("Failed to consume verification"))?;

        if consumed.is_empty() {
            tx.rollback()
                .await
                .map_err(db_error("Failed to rollback transaction"))?;
            return Ok(false);
        }

        let activated = sqlx::query("UPDATE principals SET active = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(owner_id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to activate principal"))?;

        if activated.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(db_error("Failed to rollback transaction"))?;
            return Ok(false);
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;
        Ok(true)
    }
}
