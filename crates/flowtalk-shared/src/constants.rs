/// Application name
pub const APP_NAME: &str = "FlowTalk";

/// Maximum message content length in Unicode code points
pub const MAX_CONTENT_CODEPOINTS: usize = 4000;

/// Session token lifetime in days
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Maximum page size for message history queries
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default bound on concurrent external translator calls per process
pub const DEFAULT_TRANSLATE_CONCURRENCY: usize = 8;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Sentinel community id that marks a channel as a direct-message thread
pub const DM_COMMUNITY: &str = "dm";

/// Name of the channel created with every new community
pub const DEFAULT_CHANNEL_NAME: &str = "general";

/// Cookie that carries the session token
pub const AUTH_COOKIE: &str = "ft_token";

/// Key derivation contexts (BLAKE3)
pub const KDF_CONTEXT_TOKEN_MAC: &str = "flowtalk-token-mac-v1";
pub const KDF_CONTEXT_PASSWORD: &str = "flowtalk-password-v1";
