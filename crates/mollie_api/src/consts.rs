/// Versioned API root.
pub const BASE_URL: &str = "https://api.mollie.com/v2";

/// Hard cap on `_links.next` hops when draining a paginated collection.
pub const PAGINATION_PAGE_CAP: usize = 10;

/// Prefix of live-environment API keys; everything else is treated as test.
pub const LIVE_KEY_PREFIX: &str = "live_";

pub const HTTP_TOO_MANY_REQUESTS: u16 = 429;
pub const HTTP_BAD_GATEWAY: u16 = 502;
pub const HTTP_SERVICE_UNAVAILABLE: u16 = 503;
pub const HTTP_GONE: u16 = 410;
