//! Prerender policy settings.
//!
//! Built once from a flat string map (the `[prerender]` table of the gateway
//! config, or whatever the embedding application supplies). List settings are
//! appended to the built-in defaults exactly once, here; everything else is
//! read from the raw map on demand.

use std::collections::HashMap;

/// Public rendering service used when nothing else is configured.
pub const PRERENDER_IO_SERVICE_URL: &str = "https://service.prerender.io/";

/// Process-wide override for the rendering service URL.
pub const PRERENDER_SERVICE_URL_ENV: &str = "PRERENDER_SERVICE_URL";

/// Recognized configuration keys.
pub mod keys {
    pub const CRAWLER_USER_AGENTS: &str = "crawlerUserAgents";
    pub const EXTENSIONS_TO_IGNORE: &str = "extensionsToIgnore";
    pub const EVENT_HANDLER: &str = "preRenderEventHandler";
    pub const PROXY: &str = "proxy";
    pub const PROXY_PORT: &str = "proxyPort";
    pub const SOCKET_TIMEOUT: &str = "socketTimeout";
    pub const PRERENDER_TOKEN: &str = "prerenderToken";
    pub const FORWARDED_URL_HEADER: &str = "forwardedURLHeader";
    pub const PROTOCOL: &str = "protocol";
    pub const WHITELIST: &str = "whitelist";
    pub const BLACKLIST: &str = "blacklist";
    pub const SERVICE_URL: &str = "prerenderServiceUrl";
    pub const MAX_CONNECTIONS_PER_HOST: &str = "maxConnectionsPerHost";

    /// Read by the `in-memory-cache` event handler only.
    pub const CACHE_TTL_SECONDS: &str = "cacheTtlSeconds";
    pub const CACHE_MAX_ENTRIES: &str = "cacheMaxEntries";
}

const DEFAULT_CRAWLER_USER_AGENTS: &[&str] = &[
    "baiduspider",
    "facebookexternalhit",
    "twitterbot",
    "rogerbot",
    "linkedinbot",
    "embedly",
    "quora link preview",
    "showyoubot",
    "outbrain",
    "pinterest",
    "developers.google.com/+/web/snippet",
    "slackbot",
    "vkShare",
    "W3C_Validator",
    "redditbot",
    "Applebot",
    "googlebot",
    "yahoo! slurp",
    "bingbot",
    "yandex",
    "whatsapp",
    "flipboard",
    "tumblr",
    "bitlybot",
    "skypeuripreview",
    "nuzzel",
    "discordbot",
    "google page speed",
    "qwantify",
    "pinterestbot",
    "bitrix link preview",
    "xing-contenttabreceiver",
    "chrome-lighthouse",
    "telegrambot",
    "Yeti",
    "kakaotalk-scrap",
    "Daum",
];

const DEFAULT_EXTENSIONS_TO_IGNORE: &[&str] = &[
    ".js", ".json", ".css", ".xml", ".less", ".png", ".jpg", ".jpeg", ".gif", ".pdf", ".doc",
    ".txt", ".ico", ".rss", ".zip", ".mp3", ".rar", ".exe", ".wmv", ".doc", ".avi", ".ppt",
    ".mpg", ".mpeg", ".tif", ".wav", ".mov", ".psd", ".ai", ".xls", ".mp4", ".m4a", ".swf",
    ".dat", ".dmg", ".iso", ".flv", ".m4v", ".torrent", ".woff", ".ttf",
];

/// Merged prerender policy settings.
#[derive(Debug, Clone, Default)]
pub struct PrerenderConfig {
    raw: HashMap<String, String>,
    crawler_user_agents: Vec<String>,
    extensions_to_ignore: Vec<String>,
}

impl PrerenderConfig {
    /// Build the config, appending any list overrides to the built-ins.
    pub fn new(raw: HashMap<String, String>) -> Self {
        let crawler_user_agents =
            merge_list(DEFAULT_CRAWLER_USER_AGENTS, raw.get(keys::CRAWLER_USER_AGENTS));
        let extensions_to_ignore =
            merge_list(DEFAULT_EXTENSIONS_TO_IGNORE, raw.get(keys::EXTENSIONS_TO_IGNORE));

        Self {
            raw,
            crawler_user_agents,
            extensions_to_ignore,
        }
    }

    /// Raw access to any key, for event handlers that read their own settings.
    /// Blank values are treated as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
    }

    pub fn crawler_user_agents(&self) -> &[String] {
        &self.crawler_user_agents
    }

    pub fn extensions_to_ignore(&self) -> &[String] {
        &self.extensions_to_ignore
    }

    /// `None` means "unrestricted", which is not the same as an empty list.
    pub fn whitelist(&self) -> Option<Vec<String>> {
        self.pattern_list(keys::WHITELIST)
    }

    /// `None` means "unrestricted", which is not the same as an empty list.
    pub fn blacklist(&self) -> Option<Vec<String>> {
        self.pattern_list(keys::BLACKLIST)
    }

    pub fn event_handler(&self) -> Option<&str> {
        self.get(keys::EVENT_HANDLER)
    }

    pub fn proxy(&self) -> Option<&str> {
        self.get(keys::PROXY)
    }

    pub fn proxy_port(&self) -> Option<&str> {
        self.get(keys::PROXY_PORT)
    }

    /// Raw socket timeout in milliseconds. Parsed when the client is built.
    pub fn socket_timeout(&self) -> Option<&str> {
        self.get(keys::SOCKET_TIMEOUT)
    }

    pub fn max_connections_per_host(&self) -> Option<&str> {
        self.get(keys::MAX_CONNECTIONS_PER_HOST)
    }

    pub fn prerender_token(&self) -> Option<&str> {
        self.get(keys::PRERENDER_TOKEN)
    }

    pub fn forwarded_url_header(&self) -> Option<&str> {
        self.get(keys::FORWARDED_URL_HEADER)
    }

    pub fn protocol(&self) -> Option<&str> {
        self.get(keys::PROTOCOL)
    }

    /// Resolve the rendering service URL.
    ///
    /// Lookup order: the `prerenderServiceUrl` key, then the
    /// `PRERENDER_SERVICE_URL` environment variable, then
    /// [`PRERENDER_IO_SERVICE_URL`]. Evaluated on every call so environment
    /// changes are picked up without a restart.
    pub fn prerender_service_url(&self) -> String {
        if let Some(url) = self.get(keys::SERVICE_URL) {
            return url.to_string();
        }
        match std::env::var(PRERENDER_SERVICE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => PRERENDER_IO_SERVICE_URL.to_string(),
        }
    }

    fn pattern_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)
            .map(|v| v.trim().split(',').map(|p| p.trim().to_string()).collect())
    }
}

fn merge_list(defaults: &[&str], overrides: Option<&String>) -> Vec<String> {
    let mut merged: Vec<String> = defaults.iter().map(|s| s.to_string()).collect();
    if let Some(extra) = overrides.filter(|v| !v.trim().is_empty()) {
        merged.extend(extra.trim().split(',').map(|s| s.trim().to_string()));
    }
    merged
}
