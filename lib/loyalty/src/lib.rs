//! Loyalty stamp verification.
//!
//! A human-in-the-loop approval workflow that runs beside the flow engine:
//! a customer asks for a stamp, an operator approves or rejects it, and a
//! full card earns a reward. Only the boundary behavior lives here; the
//! conversational side is an ordinary flow.
//!
//! The rules worth keeping strict:
//! - requesting a stamp is idempotent: an existing pending request is
//!   returned, never duplicated
//! - a cooldown gates how often a customer may request
//! - the approval that reaches the reward threshold completes the reward and
//!   resets the card's counter

pub mod ledger;

pub use ledger::{
    LoyaltyConfig, LoyaltyError, RequestStatus, StampCard, StampLedger, StampOutcome,
    StampRequest,
};
