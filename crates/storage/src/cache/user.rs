use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;

use weatherbell_common::error::StorageError;
use weatherbell_common::types::{ConversationState, User};

use super::RedisCache;
use crate::store::{Result, UserStore};

pub(super) fn user_key(tg_id: i64) -> String {
    format!("user:{}", tg_id)
}

fn to_fields(user: &User) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("chat_id", user.chat_id.to_string()),
        ("name", user.name.clone()),
        ("state", user.state.as_str().to_string()),
        ("sticker", user.sticker.to_string()),
    ];
    if let Some(city) = &user.city {
        fields.push(("city", city.clone()));
    }
    if let Some(city_id) = user.city_id {
        fields.push(("city_id", city_id.to_string()));
    }
    if let Some(region) = &user.region {
        fields.push(("region", region.clone()));
    }
    fields
}

fn from_fields(tg_id: i64, mut fields: HashMap<String, String>) -> Result<User> {
    let chat_id = match fields.get("chat_id") {
        Some(raw) => raw
            .parse()
            .map_err(|_| StorageError::InvalidRecord(format!("user {} chat_id {:?}", tg_id, raw)))?,
        None => tg_id,
    };
    let city_id = match fields.get("city_id") {
        Some(raw) => Some(
            raw.parse()
                .map_err(|_| StorageError::InvalidRecord(format!("user {} city_id {:?}", tg_id, raw)))?,
        ),
        None => None,
    };

    Ok(User {
        tg_id,
        chat_id,
        name: fields.remove("name").unwrap_or_default(),
        city: fields.remove("city"),
        city_id,
        region: fields.remove("region"),
        state: fields
            .get("state")
            .map(|tag| ConversationState::from_tag(tag))
            .unwrap_or_default(),
        sticker: fields.get("sticker").is_some_and(|v| v == "true"),
    })
}

#[async_trait]
impl UserStore for RedisCache {
    async fn save_user(&self, user: &User) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = user_key(user.tg_id);
        let fields = to_fields(user);

        // Replace the whole hash in one MULTI so cleared optional fields disappear.
        let _: () = redis::pipe()
            .atomic()
            .del(&key)
            .ignore()
            .hset_multiple(&key, fields.as_slice())
            .ignore()
            .query_async(&mut conn)
            .await?;

        tracing::debug!(tg_id = user.tg_id, state = %user.state, "User saved to Redis");
        Ok(())
    }

    async fn get_user(&self, tg_id: i64) -> Result<User> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(user_key(tg_id)).await?;
        if fields.is_empty() {
            return Err(StorageError::NotFound(format!("user {}", tg_id)));
        }
        from_fields(tg_id, fields)
    }
}
