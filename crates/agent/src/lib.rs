//! Conversational boundary for the booking subsystem.
//!
//! Everything non-deterministic sits behind exactly one seam: the
//! [`llm::LlmClient`] trait, consulted once per turn to classify the user's
//! intent. The rest is deterministic: an immutable per-turn
//! [`context::ConversationContext`] updated through explicit patches, and the
//! [`tools::BookingTools`] surface that executes availability checks and
//! booking-ledger operations against the repositories.
//!
//! The LLM never decides schedules, prices, or state transitions. It
//! translates free text into one of a closed set of intents; the dispatch
//! and every business rule downstream of it are plain code.

pub mod context;
pub mod dates;
pub mod intent;
pub mod llm;
pub mod runtime;
pub mod tools;
