use std::path::{Path, PathBuf};

pub const ENV_PORT: &str = "PORT";
pub const ENV_HEADLESS: &str = "HEADLESS";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_MIN_REQUEST_SPACING_MS: &str = "MIN_REQUEST_SPACING_MS";
pub const ENV_BATCH_DELAY_MS: &str = "BATCH_DELAY_MS";
pub const ENV_MAX_BATCH_SIZE: &str = "MAX_BATCH_SIZE";
pub const ENV_SCREENSHOT_DIR: &str = "SCREENSHOT_DIR";

/// HTTP bind port. `--port=N` on the command line wins over this.
pub fn port() -> u16 {
    std::env::var(ENV_PORT)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// Whether the browser runs headless. Default: enabled.
/// Set `HEADLESS=0` to watch navigation in a visible window.
pub fn headless_mode() -> bool {
    let Ok(v) = std::env::var(ENV_HEADLESS) else {
        return true;
    };
    let v = v.trim().to_ascii_lowercase();
    if v.is_empty() {
        return true;
    }
    !matches!(v.as_str(), "0" | "false" | "no" | "off")
}

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is **auto-discovery** (see `scraping::browser_manager::find_browser_executable()`).
/// This function only returns a value when `CHROME_EXECUTABLE` is set to an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}

/// Minimum spacing between paced navigations, in milliseconds. Default: 5000.
pub fn min_request_spacing_ms() -> u64 {
    std::env::var(ENV_MIN_REQUEST_SPACING_MS)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5000)
}

/// Default delay between batch queries, in milliseconds. Default: 3000.
/// A per-request `delay_ms` in the batch body wins over this.
pub fn batch_delay_ms() -> u64 {
    std::env::var(ENV_BATCH_DELAY_MS)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// Ceiling on queries per batch request. Default: 10.
pub fn max_batch_size() -> usize {
    std::env::var(ENV_MAX_BATCH_SIZE)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10)
}

/// Directory for best-effort block-diagnostic screenshots.
/// Default: a dedicated folder under the system temp dir.
pub fn screenshot_dir() -> PathBuf {
    match std::env::var(ENV_SCREENSHOT_DIR) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => std::env::temp_dir().join("overview-scout-screenshots"),
    }
}
