use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::Level;
use yt_playlist_import::ConfigArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct RootArgs {
    /// OAuth client secret downloaded from the Google Cloud Console
    #[arg(long, env = "YT_CLIENT_SECRET", default_value = "client_secret.json")]
    pub client_secret: PathBuf,

    /// Where the OAuth token is cached between runs
    #[arg(long, env = "YT_TOKEN", default_value = "token.json")]
    pub token: PathBuf,

    /// Ignore the cached token and go through the consent screen again
    #[arg(long, default_value = "false")]
    pub clear_cache: bool,

    /// Proxy to use for all API requests in the format http://<ip>:<port>
    #[arg(long, env = "YT_PROXY")]
    pub proxy: Option<String>,

    #[arg(long, value_enum, default_value = "info")]
    pub logging: LoggingLevel,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum LoggingLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LoggingLevel> for Level {
    fn from(level: LoggingLevel) -> Self {
        match level {
            LoggingLevel::Error => Level::ERROR,
            LoggingLevel::Warn => Level::WARN,
            LoggingLevel::Info => Level::INFO,
            LoggingLevel::Debug => Level::DEBUG,
            LoggingLevel::Trace => Level::TRACE,
        }
    }
}
