//! Postgres implementations of the persistence ports.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::PgPool;

use crate::domain::{Provider, Transaction, TransactionStatus};
use crate::ports::{
    MerchantConfig, MerchantConfigProvider, RepositoryError, RepositoryResult,
    TransactionRepository,
};

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                id, user_id, order_id, amount, provider, receive_address,
                status, payload, signature, redirect_url, alternate_url, note,
                provider_reference, secret_version, expires_at, completed_at,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                      $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.user_id)
        .bind(&tx.order_id)
        .bind(&tx.amount)
        .bind(tx.provider.as_str())
        .bind(&tx.receive_address)
        .bind(tx.status.as_str())
        .bind(&tx.payload)
        .bind(&tx.signature)
        .bind(&tx.redirect_url)
        .bind(&tx.alternate_url)
        .bind(&tx.note)
        .bind(&tx.provider_reference)
        .bind(tx.secret_version)
        .bind(tx.expires_at)
        .bind(tx.completed_at)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(&tx.id, e))?;

        row.into_domain()
    }

    async fn get(&self, id: &str) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(TransactionRow::into_domain).transpose()
    }

    async fn mark_terminal(
        &self,
        id: &str,
        status: TransactionStatus,
        provider_reference: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Transaction>> {
        // Conditional write: the `status = 'pending'` predicate is what makes
        // concurrent resolvers race safely. The loser matches zero rows.
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE transactions
            SET status = $2,
                completed_at = $3,
                updated_at = $3,
                provider_reference = COALESCE($4, provider_reference)
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(completed_at)
        .bind(provider_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(TransactionRow::into_domain).transpose()
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            UPDATE transactions
            SET status = 'expired', completed_at = $1, updated_at = $1
            WHERE status = 'pending' AND expires_at < $1
            RETURNING *
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }
}

/// Postgres-backed merchant configuration. The singleton row is lazily
/// seeded with configured defaults on first read; every secret version is
/// retained in `merchant_secret_history`.
#[derive(Clone)]
pub struct PostgresMerchantConfig {
    pool: PgPool,
    default_receive_address: String,
    default_signing_secret: String,
}

impl PostgresMerchantConfig {
    pub fn new(pool: PgPool, default_receive_address: &str, default_signing_secret: &str) -> Self {
        Self {
            pool,
            default_receive_address: default_receive_address.to_string(),
            default_signing_secret: default_signing_secret.to_string(),
        }
    }

    async fn seed_if_absent(&self) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO merchant_config (id, receive_address, signing_secret, version, updated_at)
            VALUES (1, $1, $2, 1, NOW())
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&self.default_receive_address)
        .bind(&self.default_signing_secret)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
            INSERT INTO merchant_secret_history (version, signing_secret, rotated_at)
            SELECT version, signing_secret, NOW() FROM merchant_config WHERE id = 1
            ON CONFLICT (version) DO NOTHING
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }
}

#[async_trait]
impl MerchantConfigProvider for PostgresMerchantConfig {
    async fn current(&self) -> RepositoryResult<MerchantConfig> {
        self.seed_if_absent().await?;

        let row = sqlx::query_as::<_, MerchantConfigRow>(
            "SELECT receive_address, signing_secret, version FROM merchant_config WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(MerchantConfig {
            receive_address: row.receive_address,
            signing_secret: row.signing_secret,
            secret_version: row.version,
        })
    }

    async fn secret_for_version(&self, version: i32) -> RepositoryResult<Option<String>> {
        let secret: Option<(String,)> = sqlx::query_as(
            "SELECT signing_secret FROM merchant_secret_history WHERE version = $1",
        )
        .bind(version)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        if let Some((secret,)) = secret {
            return Ok(Some(secret));
        }

        // History rows are written on rotation; the current version may not
        // be mirrored yet.
        let current = self.current().await?;
        if current.secret_version == version {
            return Ok(Some(current.signing_secret));
        }
        Ok(None)
    }
}

fn storage_error(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(err.to_string())
}

fn map_insert_error(id: &str, err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(db_err.kind(), ErrorKind::UniqueViolation) {
            return RepositoryError::DuplicateId(id.to_string());
        }
    }
    storage_error(err)
}

/// Internal row type for sqlx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    user_id: Option<String>,
    order_id: Option<String>,
    amount: BigDecimal,
    provider: String,
    receive_address: String,
    status: String,
    payload: String,
    signature: String,
    redirect_url: String,
    alternate_url: String,
    note: String,
    provider_reference: Option<String>,
    secret_version: Option<i32>,
    expires_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct MerchantConfigRow {
    receive_address: String,
    signing_secret: String,
    version: i32,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        let provider = Provider::parse(&self.provider).ok_or_else(|| {
            RepositoryError::Storage(format!("unknown provider in row: {}", self.provider))
        })?;
        let status = TransactionStatus::parse(&self.status).ok_or_else(|| {
            RepositoryError::Storage(format!("unknown status in row: {}", self.status))
        })?;

        Ok(Transaction {
            id: self.id,
            user_id: self.user_id,
            order_id: self.order_id,
            amount: self.amount,
            provider,
            receive_address: self.receive_address,
            status,
            payload: self.payload,
            signature: self.signature,
            redirect_url: self.redirect_url,
            alternate_url: self.alternate_url,
            note: self.note,
            provider_reference: self.provider_reference,
            secret_version: self.secret_version,
            expires_at: self.expires_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
