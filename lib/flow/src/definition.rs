//! The stored flow definition.

use chrono::{DateTime, Utc};
use copper_sparrow_core::{ChannelId, FlowId};
use serde::{Deserialize, Serialize};

use crate::trigger::TriggerRule;

/// A named workflow definition.
///
/// The engine treats flows as read-only: they are authored elsewhere and the
/// engine only reads them when matching triggers and loading graphs. There is
/// no versioning; an edit to a live flow affects in-flight executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// Flow identifier.
    pub id: FlowId,
    /// The channel this flow listens on.
    pub channel_id: ChannelId,
    /// Operator-facing name.
    pub name: String,
    /// The rule deciding which inbound messages start this flow.
    #[serde(flatten)]
    pub trigger: TriggerRule,
    /// Higher priority wins when several flows match.
    pub priority: i32,
    /// Inactive flows never match.
    pub is_active: bool,
    /// Draft flows never match.
    pub is_published: bool,
    /// When the flow was created.
    pub created_at: DateTime<Utc>,
    /// When the flow was last edited.
    pub updated_at: DateTime<Utc>,
}
