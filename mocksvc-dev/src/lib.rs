use clap::Parser;
use envconfig::Envconfig;
use mocksvc::LifecycleConfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "MOCKSVC_SERVICE", default = "widgets")]
    pub service: String,
    #[envconfig(from = "HTTP_PORT")]
    pub http_port: Option<u16>,
    #[envconfig(from = "MOCKSVC_HOST", default = "127.0.0.1")]
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: "widgets".into(),
            http_port: None,
            host: mocksvc::DEFAULT_HOST.into(),
        }
    }
}

/// Flags of `mocksvc-server`; each one overrides its environment variable.
#[derive(Parser, Clone, Debug, Default)]
#[command(about = "Run one mock service until Ctrl+C")]
pub struct Opts {
    /// Service name to start.
    #[arg(short, long)]
    pub service: Option<String>,
    /// Fixed port; a free one is picked when absent or 0.
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Interface to listen on.
    #[arg(long)]
    pub host: Option<String>,
}

impl Config {
    pub fn merge(mut self, opts: Opts) -> Self {
        if let Some(service) = opts.service {
            self.service = service;
        }
        if let Some(port) = opts.port {
            self.http_port = Some(port);
        }
        if let Some(host) = opts.host {
            self.host = host;
        }
        self
    }

    /// Port to pin, treating 0 as "pick one".
    pub fn fixed_port(&self) -> Option<u16> {
        self.http_port.filter(|p| *p != 0)
    }

    pub fn lifecycle(&self, mut base: LifecycleConfig) -> LifecycleConfig {
        base.host = self.host.clone();
        base
    }
}
