/// Log tags identifying the component that emitted a message

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Webserver,
    Websocket,
    Hub,
    RateLimit,
    Auth,
    Notify,
}

impl LogTag {
    /// Every tag, in display order
    pub fn all() -> &'static [LogTag] {
        &[
            LogTag::System,
            LogTag::Config,
            LogTag::Webserver,
            LogTag::Websocket,
            LogTag::Hub,
            LogTag::RateLimit,
            LogTag::Auth,
            LogTag::Notify,
        ]
    }

    /// Key used in `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system",
            LogTag::Config => "config",
            LogTag::Webserver => "webserver",
            LogTag::Websocket => "websocket",
            LogTag::Hub => "hub",
            LogTag::RateLimit => "rate-limit",
            LogTag::Auth => "auth",
            LogTag::Notify => "notify",
        }
        .to_string()
    }

    /// Short uncolored label used in the log file
    pub fn to_plain_string(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Webserver => "WEBSERVER",
            LogTag::Websocket => "WS",
            LogTag::Hub => "HUB",
            LogTag::RateLimit => "RATELIMIT",
            LogTag::Auth => "AUTH",
            LogTag::Notify => "NOTIFY",
        }
    }
}
