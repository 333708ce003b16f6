//! The stamp ledger state machine.

use chrono::{DateTime, Duration, Utc};
use copper_sparrow_core::{CustomerId, StampCardId, StampRequestId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// Ledger tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct LoyaltyConfig {
    /// Minimum time between two stamp requests from the same customer.
    pub cooldown: Duration,
    /// Approvals needed to complete a reward.
    pub reward_threshold: u32,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::hours(4),
            reward_threshold: 10,
        }
    }
}

/// Errors from ledger operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoyaltyError {
    /// The customer requested again inside the cooldown window.
    CooldownActive { until: DateTime<Utc> },
    /// No request with that id.
    RequestNotFound { request_id: StampRequestId },
    /// The request was already approved or rejected.
    AlreadyResolved { request_id: StampRequestId },
}

impl fmt::Display for LoyaltyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CooldownActive { until } => {
                write!(f, "stamp request refused, cooldown active until {until}")
            }
            Self::RequestNotFound { request_id } => {
                write!(f, "stamp request {request_id} not found")
            }
            Self::AlreadyResolved { request_id } => {
                write!(f, "stamp request {request_id} was already resolved")
            }
        }
    }
}

impl std::error::Error for LoyaltyError {}

/// State of one stamp request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// One customer-initiated stamp request awaiting an operator's decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampRequest {
    pub id: StampRequestId,
    pub customer_id: CustomerId,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// A customer's stamp card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampCard {
    pub id: StampCardId,
    pub customer_id: CustomerId,
    /// Stamps collected toward the next reward. Resets when the reward
    /// threshold is reached.
    pub stamps: u32,
    /// Rewards completed over the card's lifetime.
    pub rewards_earned: u32,
}

/// Result of approving a request.
#[derive(Debug, Clone)]
pub struct StampOutcome {
    pub card: StampCard,
    /// True when this approval completed a reward (and reset the counter).
    pub reward_earned: bool,
}

/// In-memory ledger holding cards and requests per customer.
#[derive(Debug, Default)]
pub struct StampLedger {
    config: LoyaltyConfig,
    cards: HashMap<CustomerId, StampCard>,
    requests: HashMap<StampRequestId, StampRequest>,
    last_request_at: HashMap<CustomerId, DateTime<Utc>>,
}

impl StampLedger {
    #[must_use]
    pub fn new(config: LoyaltyConfig) -> Self {
        Self {
            config,
            cards: HashMap::new(),
            requests: HashMap::new(),
            last_request_at: HashMap::new(),
        }
    }

    /// Opens a stamp request for a customer.
    ///
    /// Idempotent: an existing pending request is returned as-is. A request
    /// arriving inside the cooldown window is refused with the gate's expiry.
    ///
    /// # Errors
    ///
    /// [`LoyaltyError::CooldownActive`] when the cooldown has not elapsed.
    pub fn request_stamp(&mut self, customer_id: CustomerId) -> Result<StampRequest, LoyaltyError> {
        if let Some(pending) = self
            .requests
            .values()
            .find(|request| {
                request.customer_id == customer_id && request.status == RequestStatus::Pending
            })
            .cloned()
        {
            return Ok(pending);
        }

        let now = Utc::now();
        if let Some(&last) = self.last_request_at.get(&customer_id) {
            let until = last + self.config.cooldown;
            if now < until {
                return Err(LoyaltyError::CooldownActive { until });
            }
        }

        let request = StampRequest {
            id: StampRequestId::new(),
            customer_id,
            status: RequestStatus::Pending,
            requested_at: now,
            resolved_at: None,
        };
        self.last_request_at.insert(customer_id, now);
        self.requests.insert(request.id, request.clone());
        info!(request_id = %request.id, %customer_id, "stamp request opened");
        Ok(request)
    }

    /// Approves a pending request, stamping the customer's card.
    ///
    /// The approval that reaches the reward threshold completes a reward and
    /// resets the card's stamp counter.
    ///
    /// # Errors
    ///
    /// The request must exist and still be pending.
    pub fn approve(&mut self, request_id: StampRequestId) -> Result<StampOutcome, LoyaltyError> {
        let request = self.resolve(request_id, RequestStatus::Approved)?;

        let card = self
            .cards
            .entry(request.customer_id)
            .or_insert_with(|| StampCard {
                id: StampCardId::new(),
                customer_id: request.customer_id,
                stamps: 0,
                rewards_earned: 0,
            });
        card.stamps += 1;
        let reward_earned = card.stamps >= self.config.reward_threshold;
        if reward_earned {
            card.stamps = 0;
            card.rewards_earned += 1;
            info!(card_id = %card.id, customer_id = %card.customer_id, "reward completed");
        }
        Ok(StampOutcome {
            card: card.clone(),
            reward_earned,
        })
    }

    /// Rejects a pending request. The card is untouched.
    ///
    /// # Errors
    ///
    /// The request must exist and still be pending.
    pub fn reject(&mut self, request_id: StampRequestId) -> Result<StampRequest, LoyaltyError> {
        self.resolve(request_id, RequestStatus::Rejected)
    }

    /// The customer's card, if any stamps were ever approved.
    #[must_use]
    pub fn card(&self, customer_id: CustomerId) -> Option<&StampCard> {
        self.cards.get(&customer_id)
    }

    fn resolve(
        &mut self,
        request_id: StampRequestId,
        status: RequestStatus,
    ) -> Result<StampRequest, LoyaltyError> {
        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or(LoyaltyError::RequestNotFound { request_id })?;
        if request.status != RequestStatus::Pending {
            return Err(LoyaltyError::AlreadyResolved { request_id });
        }
        request.status = status;
        request.resolved_at = Some(Utc::now());
        Ok(request.clone())
    }
}
