//! Conversation timeline writes for delivered messages.

use async_trait::async_trait;
use copper_sparrow_core::MessageId;
use copper_sparrow_messaging::{MessageRecorder, OutboundRecord, RecorderError};
use sqlx::PgPool;

/// A [`MessageRecorder`] over the `messages` table.
pub struct PgMessageRecorder {
    pool: PgPool,
}

impl PgMessageRecorder {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRecorder for PgMessageRecorder {
    async fn record(&self, record: OutboundRecord) -> Result<(), RecorderError> {
        sqlx::query(
            r#"
            INSERT INTO messages
                (id, customer_id, channel_id, direction, content, media_url,
                 provider_message_id, sent_at)
            VALUES ($1, $2, $3, 'outbound', $4, $5, $6, $7)
            "#,
        )
        .bind(MessageId::new().to_string())
        .bind(record.customer_id.to_string())
        .bind(record.channel_id.to_string())
        .bind(record.message.content_summary())
        .bind(record.message.media_url())
        .bind(&record.provider_message_id)
        .bind(record.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|error| RecorderError::Backend {
            message: error.to_string(),
        })?;

        Ok(())
    }
}
