/// Application name
pub const APP_NAME: &str = "Palaver";

/// Maximum text length of an outgoing message, in bytes
pub const MAX_TEXT_LENGTH: usize = 4096;

/// Maximum length of a shared item name, in bytes
pub const MAX_ITEM_NAME_LENGTH: usize = 255;

/// Default capacity of the remote command channel
pub const DEFAULT_COMMAND_BUFFER: usize = 32;

/// Default capacity of a per-conversation subscription event channel
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Default capacity of the client notification channel
pub const DEFAULT_NOTIFICATION_BUFFER: usize = 64;

/// Resubscribe attempts before a subscription is reported lost
pub const DEFAULT_RESUBSCRIBE_MAX_ATTEMPTS: u32 = 5;

/// Base delay for resubscribe backoff, in milliseconds
pub const DEFAULT_RESUBSCRIBE_BASE_DELAY_MS: u64 = 250;

/// Ceiling for resubscribe backoff, in milliseconds
pub const DEFAULT_RESUBSCRIBE_MAX_DELAY_MS: u64 = 8_000;

/// Context menu bounds used for outside-tap dismissal, in logical pixels
pub const CONTEXT_MENU_WIDTH: f32 = 200.0;
pub const CONTEXT_MENU_HEIGHT: f32 = 160.0;
