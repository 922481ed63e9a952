use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::MORPH_VERSION;

const PROXY_KEYS: &[&str] = &[
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
    "NO_PROXY",
    "no_proxy",
];

/// Decide whether morph should honor standard proxy environment variables.
///
/// - `MORPH_KEEP_PROXIES=1/true/yes/on` forces proxies on.
/// - `MORPH_KEEP_PROXIES=0/false/no/off/""` forces proxies off.
/// - Unset: proxies are used only when a proxy variable is present.
pub(crate) fn keep_proxies() -> bool {
    match env::var("MORPH_KEEP_PROXIES") {
        Ok(raw) => {
            let value = raw.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "" | "0" | "false" | "no" | "off")
        }
        Err(_) => PROXY_KEYS.iter().any(|key| {
            env::var(key)
                .ok()
                .is_some_and(|value| !value.trim().is_empty())
        }),
    }
}

/// Blocking HTTP client shared by remote sync calls.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_http_client() -> Result<Client> {
    let builder = Client::builder()
        .user_agent(format!("morph/{MORPH_VERSION}"))
        .timeout(Duration::from_secs(30));
    let builder = if keep_proxies() {
        builder
    } else {
        builder.no_proxy()
    };
    builder.build().context("failed to build HTTP client")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serial_test::serial;

    pub(crate) struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        pub(crate) fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = env::var(key).ok();
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => env::set_var(self.key, value),
                None => env::remove_var(self.key),
            }
        }
    }

    fn clear_proxy_vars() -> Vec<EnvGuard> {
        PROXY_KEYS
            .iter()
            .map(|key| EnvGuard::set(key, None))
            .collect()
    }

    #[test]
    #[serial]
    fn proxies_follow_proxy_env_when_unset() {
        let _keep = EnvGuard::set("MORPH_KEEP_PROXIES", None);
        let _cleared = clear_proxy_vars();
        assert!(!keep_proxies());

        let _proxy = EnvGuard::set("HTTPS_PROXY", Some("http://proxy.example"));
        assert!(keep_proxies());
    }

    #[test]
    #[serial]
    fn keep_proxies_variable_overrides_detection() {
        let _cleared = clear_proxy_vars();
        let _keep = EnvGuard::set("MORPH_KEEP_PROXIES", Some("yes"));
        assert!(keep_proxies());

        let _proxy = EnvGuard::set("HTTP_PROXY", Some("http://proxy.example"));
        let _keep = EnvGuard::set("MORPH_KEEP_PROXIES", Some("off"));
        assert!(!keep_proxies());
    }

    #[test]
    #[serial]
    fn client_builds_without_proxies() {
        let _keep = EnvGuard::set("MORPH_KEEP_PROXIES", Some("0"));
        assert!(build_http_client().is_ok());
    }
}
