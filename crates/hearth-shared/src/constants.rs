/// Application name
pub const APP_NAME: &str = "Hearth";

/// Separator used when joining sorted member ids into a membership key
pub const MEMBERS_KEY_SEPARATOR: &str = "|";

/// Prefix marking an encoded reaction key
pub const REACTION_KEY_PREFIX: &str = "u_";

/// Separator between hex codepoints inside a reaction key
pub const REACTION_KEY_SEPARATOR: char = '_';

/// Typing records older than this are treated as expired by readers (ms)
pub const DEFAULT_TYPING_WINDOW_MS: i64 = 3_000;

/// Minimum number of distinct members in any conversation
pub const MIN_CONVERSATION_MEMBERS: usize = 2;

/// Name snapshotted for a typing user with no profile
pub const FALLBACK_TYPING_NAME: &str = "User";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
