use async_trait::async_trait;

use weatherbell_common::error::StorageError;
use weatherbell_common::types::{ConversationState, User};

use super::PgDatabase;
use crate::store::{Result, UserStore};

#[derive(sqlx::FromRow)]
struct UserRow {
    tg_id: i64,
    chat_id: i64,
    name: String,
    city: Option<String>,
    city_id: Option<i64>,
    region: Option<String>,
    state: String,
    sticker: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            tg_id: row.tg_id,
            chat_id: row.chat_id,
            name: row.name,
            city: row.city,
            city_id: row.city_id,
            region: row.region,
            state: ConversationState::from_tag(&row.state),
            sticker: row.sticker,
        }
    }
}

#[async_trait]
impl UserStore for PgDatabase {
    async fn save_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (tg_id, chat_id, name, city, city_id, region, state, sticker)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (tg_id) DO UPDATE
            SET chat_id = $2, name = $3, city = $4, city_id = $5, region = $6,
                state = $7, sticker = $8, updated_at = NOW()
            "#,
        )
        .bind(user.tg_id)
        .bind(user.chat_id)
        .bind(&user.name)
        .bind(&user.city)
        .bind(user.city_id)
        .bind(&user.region)
        .bind(user.state.as_str())
        .bind(user.sticker)
        .execute(&self.pool)
        .await?;

        tracing::debug!(tg_id = user.tg_id, state = %user.state, "User saved to PostgreSQL");
        Ok(())
    }

    async fn get_user(&self, tg_id: i64) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT tg_id, chat_id, name, city, city_id, region, state, sticker
            FROM users
            WHERE tg_id = $1
            "#,
        )
        .bind(tg_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::from)
            .ok_or_else(|| StorageError::NotFound(format!("user {}", tg_id)))
    }
}
