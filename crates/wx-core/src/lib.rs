//! wx-core: Weather Bot Gateway Core Library
//!
//! Shared configuration, error types, the in-memory conversation session
//! store and the outbound-messaging seams used by the platform crates.

pub mod config;
pub mod error;
pub mod outbound;
pub mod session;

pub use config::{AuthConfig, Config, FacebookConfig, NluConfig, ServerConfig, WeatherConfig};
pub use error::{Error, Result};
pub use outbound::{MessageSender, ProfileLookup, UserProfile};
pub use session::{ConversationState, InMemorySessionStore, Session};
