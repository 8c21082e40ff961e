//! wx-nlu: NLU engine client and action dispatcher for wx-gateway
//!
//! Drives a Wit-style converse loop: the engine interprets user text and
//! decides which named actions to run; this crate supplies the action
//! implementations (`send`, `getForecast`) and carries the conversation
//! state between steps.

pub mod client;
pub mod dispatcher;
pub mod error;

pub use client::{
    first_entity_value, ConverseStep, Entities, Entity, NluEngine, StepType, WitClient,
};
pub use dispatcher::ActionDispatcher;
pub use error::{NluError, Result};
