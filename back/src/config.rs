use std::{path::PathBuf, time::Duration};

use clap::Parser;

#[derive(Clone, Debug, Parser)]
#[command(name = "todo-service", version, about = "Todo item tracking service")]
pub struct Config {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 7890)]
    pub port: u16,

    /// RON snapshot the items are loaded from and flushed to.
    #[arg(long, env = "TODO_DATA_FILE", default_value = "data.ron")]
    pub data_file: PathBuf,

    /// Seconds between overdue sweeps.
    #[arg(
        long,
        env = "TODO_SWEEP_INTERVAL_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval_secs: u64,

    /// Seconds between snapshot flushes.
    #[arg(
        long,
        env = "TODO_FLUSH_INTERVAL_SECS",
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub flush_interval_secs: u64,

    /// PEM certificate. Serves HTTPS when given together with `--tls-key`.
    #[arg(long, env = "SSL_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    #[arg(long, env = "SSL_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,
}

impl Config {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn tls(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.tls_cert.as_ref().zip(self.tls_key.as_ref())
    }
}
