use std::time::Duration;

use envconfig::Envconfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PROBE_PATH: &str = mocksvc_backend::PROBE_PATH;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEBUGGER_CONNECT_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Envconfig, Clone, Debug)]
pub struct LifecycleConfig {
    #[envconfig(from = "MOCKSVC_HOST", default = "127.0.0.1")]
    pub host: String,
    #[envconfig(from = "MOCKSVC_STARTUP_TIMEOUT_MS", default = "10000")]
    pub startup_timeout_ms: u64,
    #[envconfig(from = "MOCKSVC_PROBE_INTERVAL_MS", default = "200")]
    pub probe_interval_ms: u64,
    #[envconfig(from = "MOCKSVC_PROBE_PATH", default = "/static")]
    pub probe_path: String,
    /// Overrides the per-probe timeout derived from `debugger`.
    #[envconfig(from = "MOCKSVC_PROBE_TIMEOUT_MS")]
    pub probe_timeout_ms: Option<u64>,
    /// Set to `1` or `true` when running under an interactive debugger.
    #[envconfig(from = "MOCKSVC_DEBUGGER")]
    pub debugger: Option<String>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            startup_timeout_ms: 10_000,
            probe_interval_ms: 200,
            probe_path: DEFAULT_PROBE_PATH.to_string(),
            probe_timeout_ms: None,
            debugger: None,
        }
    }
}

impl LifecycleConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn under_debugger(&self) -> bool {
        match self.debugger.as_deref().map(str::trim) {
            Some(v) => v == "1" || v.eq_ignore_ascii_case("true"),
            None => false,
        }
    }

    /// Connect and request timeout of a single readiness probe.
    pub fn probe_timeout(&self) -> Duration {
        if let Some(ms) = self.probe_timeout_ms {
            return Duration::from_millis(ms);
        }
        if self.under_debugger() {
            DEBUGGER_CONNECT_TIMEOUT
        } else {
            CONNECT_TIMEOUT
        }
    }

    /// `http://<host>:<port>`, bracketing IPv6 literals.
    pub fn endpoint_url(&self, port: u16) -> String {
        if self.host.contains(':') {
            format!("http://[{}]:{}", self.host, port)
        } else {
            format!("http://{}:{}", self.host, port)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(pairs: &[(&str, &str)]) -> LifecycleConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LifecycleConfig::init_from_hashmap(&map).unwrap()
    }

    #[test]
    fn env_defaults_match_default_impl() {
        let conf = from_map(&[]);
        let default = LifecycleConfig::default();
        assert_eq!(conf.host, default.host);
        assert_eq!(conf.startup_timeout_ms, default.startup_timeout_ms);
        assert_eq!(conf.probe_interval_ms, default.probe_interval_ms);
        assert_eq!(conf.probe_path, default.probe_path);
        assert_eq!(conf.probe_timeout(), CONNECT_TIMEOUT);
        assert_eq!(conf.startup_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn debugger_flag_widens_probe_timeout() {
        assert_eq!(
            from_map(&[("MOCKSVC_DEBUGGER", "1")]).probe_timeout(),
            DEBUGGER_CONNECT_TIMEOUT
        );
        assert_eq!(
            from_map(&[("MOCKSVC_DEBUGGER", "TRUE")]).probe_timeout(),
            DEBUGGER_CONNECT_TIMEOUT
        );
        assert_eq!(
            from_map(&[("MOCKSVC_DEBUGGER", "0")]).probe_timeout(),
            CONNECT_TIMEOUT
        );
    }

    #[test]
    fn explicit_probe_timeout_wins() {
        let conf = from_map(&[
            ("MOCKSVC_DEBUGGER", "1"),
            ("MOCKSVC_PROBE_TIMEOUT_MS", "250"),
        ]);
        assert_eq!(conf.probe_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn endpoint_url_formats_hosts() {
        let mut conf = LifecycleConfig::default();
        assert_eq!(conf.endpoint_url(5000), "http://127.0.0.1:5000");
        conf.host = "::1".into();
        assert_eq!(conf.endpoint_url(5000), "http://[::1]:5000");
    }
}
