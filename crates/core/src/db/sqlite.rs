use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::error::{Result, TetherError};
use crate::models::binding::{NewBinding, RankBinding, RankOperator, ValidatedBatch};
use crate::models::identity::{Identity, ProviderTokens, SessionTokens};

use super::repository::{BindingRepository, IdentityRepository, TetherRepository};

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_identity(&self, column: &str, value: &str) -> Result<Option<Identity>> {
        // `column` is one of three fixed names below, never user input.
        let query = format!(
            "SELECT discord_id, roblox_id, session_token, session_refresh_token, \
             session_expires_at, discord_access_token, discord_refresh_token, \
             discord_expires_at FROM users WHERE {column} = ?"
        );
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_identity))
    }
}

impl TetherRepository for SqliteRepository {}

fn row_to_identity(row: sqlx::sqlite::SqliteRow) -> Identity {
    let session = match (
        row.get::<Option<String>, _>("session_token"),
        row.get::<Option<String>, _>("session_refresh_token"),
        row.get::<Option<i64>, _>("session_expires_at"),
    ) {
        (Some(token), Some(refresh_token), Some(expires_at)) => Some(SessionTokens {
            token,
            refresh_token,
            expires_at,
        }),
        _ => None,
    };

    let discord_tokens = match (
        row.get::<Option<String>, _>("discord_access_token"),
        row.get::<Option<String>, _>("discord_refresh_token"),
        row.get::<Option<i64>, _>("discord_expires_at"),
    ) {
        (Some(access_token), Some(refresh_token), Some(expires_at)) => Some(ProviderTokens {
            access_token,
            refresh_token,
            expires_at,
        }),
        _ => None,
    };

    Identity {
        discord_id: row.get("discord_id"),
        roblox_id: row.get("roblox_id"),
        session,
        discord_tokens,
    }
}

fn row_to_binding(row: sqlx::sqlite::SqliteRow) -> Result<RankBinding> {
    let operator: String = row.get("operator");
    let roles: String = row.get("roles");
    Ok(RankBinding {
        id: row.get("id"),
        server_id: row.get("server_id"),
        group_name: row.get("group_name"),
        operator: RankOperator::parse(&operator).unwrap_or(RankOperator::Eq),
        rank: row.get("rank"),
        secondary_rank: row.get("secondary_rank"),
        roles: serde_json::from_str(&roles)
            .map_err(|e| TetherError::Serialization(format!("invalid roles column: {e}")))?,
    })
}

#[async_trait]
impl IdentityRepository for SqliteRepository {
    async fn upsert_identity(&self, identity: &Identity) -> Result<Identity> {
        let session = identity.session.as_ref();
        let provider = identity.discord_tokens.as_ref();
        sqlx::query(
            "INSERT INTO users (discord_id, roblox_id, session_token, session_refresh_token, \
             session_expires_at, discord_access_token, discord_refresh_token, discord_expires_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(discord_id) DO UPDATE SET \
             session_token = excluded.session_token, \
             session_refresh_token = excluded.session_refresh_token, \
             session_expires_at = excluded.session_expires_at, \
             discord_access_token = excluded.discord_access_token, \
             discord_refresh_token = excluded.discord_refresh_token, \
             discord_expires_at = excluded.discord_expires_at",
        )
        .bind(&identity.discord_id)
        .bind(&identity.roblox_id)
        .bind(session.map(|s| s.token.as_str()))
        .bind(session.map(|s| s.refresh_token.as_str()))
        .bind(session.map(|s| s.expires_at))
        .bind(provider.map(|p| p.access_token.as_str()))
        .bind(provider.map(|p| p.refresh_token.as_str()))
        .bind(provider.map(|p| p.expires_at))
        .execute(&self.pool)
        .await
        .map_err(TetherError::from_db)?;

        self.get_identity_by_discord_id(&identity.discord_id)
            .await?
            .ok_or_else(|| TetherError::NotFound("identity vanished after upsert".into()))
    }

    async fn get_identity_by_token(&self, token: &str) -> Result<Option<Identity>> {
        self.fetch_identity("session_token", token).await
    }

    async fn get_identity_by_discord_id(&self, discord_id: &str) -> Result<Option<Identity>> {
        self.fetch_identity("discord_id", discord_id).await
    }

    async fn get_identity_by_roblox_id(&self, roblox_id: &str) -> Result<Option<Identity>> {
        self.fetch_identity("roblox_id", roblox_id).await
    }

    async fn rotate_session(
        &self,
        token: &str,
        expected_refresh: &str,
        next: &SessionTokens,
    ) -> Result<bool> {
        // Compare-and-swap: only the first concurrent rotation can match the
        // stored pair, so exactly one freshly minted pair ever lands.
        let result = sqlx::query(
            "UPDATE users SET session_token = ?, session_refresh_token = ?, \
             session_expires_at = ? \
             WHERE session_token = ? AND session_refresh_token = ?",
        )
        .bind(&next.token)
        .bind(&next.refresh_token)
        .bind(next.expires_at)
        .bind(token)
        .bind(expected_refresh)
        .execute(&self.pool)
        .await
        .map_err(TetherError::from_db)?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_provider_tokens(&self, discord_id: &str, tokens: &ProviderTokens) -> Result<()> {
        sqlx::query(
            "UPDATE users SET discord_access_token = ?, discord_refresh_token = ?, \
             discord_expires_at = ? WHERE discord_id = ?",
        )
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at)
        .bind(discord_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_roblox_id(&self, discord_id: &str, roblox_id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET roblox_id = ? WHERE discord_id = ?")
            .bind(roblox_id)
            .bind(discord_id)
            .execute(&self.pool)
            .await
            .map_err(TetherError::from_db)?;
        Ok(())
    }

    async fn clear_roblox_id(&self, discord_id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET roblox_id = NULL WHERE discord_id = ?")
            .bind(discord_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_session(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET session_token = NULL, session_refresh_token = NULL, \
             session_expires_at = NULL WHERE session_token = ?",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl BindingRepository for SqliteRepository {
    async fn list_bindings(&self, server_id: &str) -> Result<Vec<RankBinding>> {
        let rows = sqlx::query(
            "SELECT id, server_id, group_name, operator, rank, secondary_rank, roles \
             FROM bindings WHERE server_id = ? ORDER BY id",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_binding).collect()
    }

    async fn apply_binding_batch(
        &self,
        server_id: &str,
        batch: &ValidatedBatch,
    ) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let mut committed = Vec::new();

        for binding in &batch.insert {
            let result = sqlx::query(
                "INSERT INTO bindings (server_id, group_name, operator, rank, secondary_rank, roles) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(server_id)
            .bind(&binding.group_name)
            .bind(binding.operator.as_str())
            .bind(binding.rank)
            .bind(binding.secondary_rank)
            .bind(roles_json(binding)?)
            .execute(&mut *tx)
            .await
            .map_err(TetherError::from_db)?;
            committed.push(result.last_insert_rowid());
        }

        for update in &batch.update {
            let binding = &update.binding;
            let result = sqlx::query(
                "UPDATE bindings SET group_name = ?, operator = ?, rank = ?, \
                 secondary_rank = ?, roles = ? WHERE id = ? AND server_id = ?",
            )
            .bind(&binding.group_name)
            .bind(binding.operator.as_str())
            .bind(binding.rank)
            .bind(binding.secondary_rank)
            .bind(roles_json(binding)?)
            .bind(update.id)
            .bind(server_id)
            .execute(&mut *tx)
            .await
            .map_err(TetherError::from_db)?;
            if result.rows_affected() == 0 {
                // Rolls the whole batch back when the transaction drops.
                return Err(TetherError::NotFound(format!(
                    "binding {} does not exist in this server",
                    update.id
                )));
            }
            committed.push(update.id);
        }

        for id in &batch.delete {
            sqlx::query("DELETE FROM bindings WHERE id = ? AND server_id = ?")
                .bind(id)
                .bind(server_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(committed)
    }
}

fn roles_json(binding: &NewBinding) -> Result<String> {
    serde_json::to_string(&binding.roles)
        .map_err(|e| TetherError::Serialization(format!("roles not serializable: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabasePool;
    use crate::models::binding::BindingUpdate;

    async fn setup() -> SqliteRepository {
        let pool = DatabasePool::new_sqlite_memory().await.unwrap();
        match pool {
            DatabasePool::Sqlite(p) => SqliteRepository::new(p),
        }
    }

    fn sample_session() -> SessionTokens {
        SessionTokens {
            token: "tok-1".into(),
            refresh_token: "ref-1".into(),
            expires_at: 1_750_000_600,
        }
    }

    fn sample_provider() -> ProviderTokens {
        ProviderTokens {
            access_token: "d-access".into(),
            refresh_token: "d-refresh".into(),
            expires_at: 1_750_604_800,
        }
    }

    fn sample_identity(discord_id: &str) -> Identity {
        Identity::new(discord_id.into(), sample_session(), sample_provider())
    }

    fn sample_binding(group: &str) -> NewBinding {
        NewBinding {
            group_name: group.into(),
            operator: RankOperator::Gte,
            rank: 3,
            secondary_rank: None,
            roles: vec!["r1".into(), "r2".into()],
        }
    }

    #[tokio::test]
    async fn upsert_and_fetch_identity() {
        let repo = setup().await;
        let identity = repo.upsert_identity(&sample_identity("d1")).await.unwrap();
        assert_eq!(identity.discord_id, "d1");
        assert_eq!(identity.session, Some(sample_session()));

        let by_token = repo.get_identity_by_token("tok-1").await.unwrap().unwrap();
        assert_eq!(by_token.discord_id, "d1");
        assert!(repo.get_identity_by_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_preserves_existing_roblox_link() {
        let repo = setup().await;
        repo.upsert_identity(&sample_identity("d1")).await.unwrap();
        repo.set_roblox_id("d1", "555").await.unwrap();

        // Re-login: fresh credentials, no roblox id on the incoming record.
        let mut again = sample_identity("d1");
        again.session.as_mut().unwrap().token = "tok-2".into();
        let stored = repo.upsert_identity(&again).await.unwrap();
        assert_eq!(stored.roblox_id.as_deref(), Some("555"));
        assert_eq!(stored.session.unwrap().token, "tok-2");
    }

    #[tokio::test]
    async fn fetch_by_roblox_id() {
        let repo = setup().await;
        repo.upsert_identity(&sample_identity("d1")).await.unwrap();
        repo.set_roblox_id("d1", "555").await.unwrap();
        let identity = repo.get_identity_by_roblox_id("555").await.unwrap().unwrap();
        assert_eq!(identity.discord_id, "d1");
    }

    #[tokio::test]
    async fn duplicate_roblox_link_is_a_conflict() {
        let repo = setup().await;
        repo.upsert_identity(&sample_identity("d1")).await.unwrap();
        let mut other = sample_identity("d2");
        other.session.as_mut().unwrap().token = "tok-2".into();
        repo.upsert_identity(&other).await.unwrap();

        repo.set_roblox_id("d1", "555").await.unwrap();
        let err = repo.set_roblox_id("d2", "555").await.unwrap_err();
        assert!(matches!(err, TetherError::Conflict(_)));
    }

    #[tokio::test]
    async fn rotate_session_swaps_only_on_matching_pair() {
        let repo = setup().await;
        repo.upsert_identity(&sample_identity("d1")).await.unwrap();
        let next = SessionTokens {
            token: "tok-next".into(),
            refresh_token: "ref-next".into(),
            expires_at: 1_750_001_200,
        };

        assert!(repo.rotate_session("tok-1", "ref-1", &next).await.unwrap());
        let identity = repo.get_identity_by_token("tok-next").await.unwrap().unwrap();
        assert_eq!(identity.session.unwrap().refresh_token, "ref-next");
    }

    #[tokio::test]
    async fn rotate_session_rejects_mismatched_refresh() {
        let repo = setup().await;
        repo.upsert_identity(&sample_identity("d1")).await.unwrap();
        let next = SessionTokens {
            token: "tok-next".into(),
            refresh_token: "ref-next".into(),
            expires_at: 1_750_001_200,
        };
        assert!(!repo.rotate_session("tok-1", "wrong", &next).await.unwrap());
        // The stored pair is untouched.
        assert!(repo.get_identity_by_token("tok-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_concurrent_rotation_loses() {
        let repo = setup().await;
        repo.upsert_identity(&sample_identity("d1")).await.unwrap();
        let first = SessionTokens {
            token: "tok-a".into(),
            refresh_token: "ref-a".into(),
            expires_at: 1_750_001_200,
        };
        let second = SessionTokens {
            token: "tok-b".into(),
            refresh_token: "ref-b".into(),
            expires_at: 1_750_001_200,
        };
        assert!(repo.rotate_session("tok-1", "ref-1", &first).await.unwrap());
        assert!(!repo.rotate_session("tok-1", "ref-1", &second).await.unwrap());
        // The winner's pair survives.
        assert!(repo.get_identity_by_token("tok-a").await.unwrap().is_some());
        assert!(repo.get_identity_by_token("tok-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_session_logs_out() {
        let repo = setup().await;
        repo.upsert_identity(&sample_identity("d1")).await.unwrap();
        assert!(repo.clear_session("tok-1").await.unwrap());
        assert!(repo.get_identity_by_token("tok-1").await.unwrap().is_none());

        let identity = repo.get_identity_by_discord_id("d1").await.unwrap().unwrap();
        assert!(identity.session.is_none());
        // Provider tokens are untouched by logout.
        assert!(identity.discord_tokens.is_some());

        assert!(!repo.clear_session("tok-1").await.unwrap());
    }

    #[tokio::test]
    async fn clear_roblox_id_unlinks() {
        let repo = setup().await;
        repo.upsert_identity(&sample_identity("d1")).await.unwrap();
        repo.set_roblox_id("d1", "555").await.unwrap();
        repo.clear_roblox_id("d1").await.unwrap();
        let identity = repo.get_identity_by_discord_id("d1").await.unwrap().unwrap();
        assert!(identity.roblox_id.is_none());
    }

    #[tokio::test]
    async fn insert_batch_round_trips() {
        let repo = setup().await;
        let batch = ValidatedBatch {
            insert: vec![sample_binding("Eden")],
            ..Default::default()
        };
        let ids = repo.apply_binding_batch("srv-1", &batch).await.unwrap();
        assert_eq!(ids.len(), 1);

        let bindings = repo.list_bindings("srv-1").await.unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].id, ids[0]);
        assert_eq!(bindings[0].group_name, "Eden");
        assert_eq!(bindings[0].operator, RankOperator::Gte);
        assert_eq!(bindings[0].roles, vec!["r1".to_string(), "r2".to_string()]);

        // Other servers see nothing.
        assert!(repo.list_bindings("srv-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_batch_changes_row() {
        let repo = setup().await;
        let ids = repo
            .apply_binding_batch(
                "srv-1",
                &ValidatedBatch {
                    insert: vec![sample_binding("Eden")],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut changed = sample_binding("Eden");
        changed.operator = RankOperator::Between;
        changed.rank = 2;
        changed.secondary_rank = Some(4);
        let committed = repo
            .apply_binding_batch(
                "srv-1",
                &ValidatedBatch {
                    update: vec![BindingUpdate {
                        id: ids[0],
                        binding: changed,
                    }],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(committed, ids);

        let bindings = repo.list_bindings("srv-1").await.unwrap();
        assert_eq!(bindings[0].operator, RankOperator::Between);
        assert_eq!(bindings[0].secondary_rank, Some(4));
    }

    #[tokio::test]
    async fn failed_batch_writes_nothing() {
        let repo = setup().await;
        let batch = ValidatedBatch {
            insert: vec![sample_binding("Eden")],
            update: vec![BindingUpdate {
                id: 9999,
                binding: sample_binding("Eden"),
            }],
            ..Default::default()
        };
        let err = repo.apply_binding_batch("srv-1", &batch).await.unwrap_err();
        assert!(matches!(err, TetherError::NotFound(_)));
        // The otherwise-valid insert rolled back with the batch.
        assert!(repo.list_bindings("srv-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_scoped_to_the_server() {
        let repo = setup().await;
        let ids = repo
            .apply_binding_batch(
                "srv-1",
                &ValidatedBatch {
                    insert: vec![sample_binding("Eden")],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Deleting the same id under another server must be a no-op.
        repo.apply_binding_batch(
            "srv-2",
            &ValidatedBatch {
                delete: vec![ids[0]],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(repo.list_bindings("srv-1").await.unwrap().len(), 1);

        repo.apply_binding_batch(
            "srv-1",
            &ValidatedBatch {
                delete: vec![ids[0]],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(repo.list_bindings("srv-1").await.unwrap().is_empty());
    }
}
