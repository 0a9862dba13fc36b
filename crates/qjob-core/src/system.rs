use std::sync::OnceLock;

static HOST: OnceLock<String> = OnceLock::new();

/// Name of the host this controller runs on.
///
/// Resolved once; falls back to `localhost` when the hostname is not valid UTF-8 or cannot be read.
pub fn exec_host() -> &'static str {
    HOST.get_or_init(|| {
        hostname::get()
            .ok()
            .and_then(|name| name.to_str().map(str::to_string))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    })
}
