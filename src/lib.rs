pub mod import;
pub mod sync;
pub mod video_api;
pub mod youtube;

use std::path::PathBuf;

use clap::Parser;

/// Import settings shared by the binary and the library, flattened into the
/// command line arguments
#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    /// Folder containing one CSV file per playlist to import
    #[arg(long, env = "YT_IMPORTS_DIR", default_value = "imports")]
    pub imports_dir: PathBuf,

    /// Suffix identifying playlist files, the playlist name is the file name
    /// without it
    #[arg(long, default_value = "-videos.csv")]
    pub file_suffix: String,

    /// CSV column holding the video identifiers
    #[arg(long, default_value = "Video ID")]
    pub video_id_column: String,

    /// Description given to the playlists created on YouTube
    #[arg(long, default_value = "")]
    pub playlist_description: String,

    /// How many times a transient API failure is retried before giving up.
    /// Set to 0 to disable retries
    #[arg(long, default_value = "3")]
    pub max_retries: usize,

    /// Initial delay between retries, doubled on every attempt
    #[arg(long, default_value = "1000")]
    pub retry_delay_ms: u64,

    /// Upper bound on the number of pages read when listing a playlist's
    /// videos, at least one
    #[arg(
        long,
        default_value = "200",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfigArgs::try_parse_from(["yt_playlist_import"]).unwrap();
        assert_eq!(config.imports_dir, PathBuf::from("imports"));
        assert_eq!(config.file_suffix, "-videos.csv");
        assert_eq!(config.video_id_column, "Video ID");
        assert_eq!(config.max_pages, 200);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_max_pages_must_be_positive() {
        assert!(ConfigArgs::try_parse_from(["yt_playlist_import", "--max-pages", "0"]).is_err());
        let config =
            ConfigArgs::try_parse_from(["yt_playlist_import", "--max-pages", "1"]).unwrap();
        assert_eq!(config.max_pages, 1);
    }
}
