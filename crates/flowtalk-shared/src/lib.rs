pub mod auth;
pub mod constants;
pub mod error;
pub mod lang;
pub mod types;

pub use error::AuthError;
pub use lang::Language;
pub use types::{ChannelId, CommunityId, MessageId, ThreadId, UserId};
