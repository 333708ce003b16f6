//! Channel credentials from PostgreSQL.

use async_trait::async_trait;
use copper_sparrow_core::ChannelId;
use copper_sparrow_flow::ChannelDirectory;
use copper_sparrow_messaging::ChannelCredentials;
use sqlx::{FromRow, PgPool};
use tracing::warn;

/// Row type for channel queries.
#[derive(FromRow)]
struct ChannelRow {
    sender_id: String,
    access_token: String,
}

/// A [`ChannelDirectory`] over the `channels` table.
pub struct PgChannelDirectory {
    pool: PgPool,
}

impl PgChannelDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelDirectory for PgChannelDirectory {
    async fn credentials(&self, channel_id: ChannelId) -> Option<ChannelCredentials> {
        let row: Option<ChannelRow> = match sqlx::query_as(
            "SELECT sender_id, access_token FROM channels WHERE id = $1",
        )
        .bind(channel_id.to_string())
        .fetch_optional(&self.pool)
        .await
        {
            Ok(row) => row,
            Err(error) => {
                warn!(%channel_id, %error, "channel lookup failed");
                return None;
            }
        };
        row.map(|row| ChannelCredentials {
            channel_id,
            sender_id: row.sender_id,
            access_token: row.access_token,
        })
    }
}
