use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};

use crate::ConfigArgs;

/// Videos destined for the playlist called `name`, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    pub video_ids: Vec<String>,
}

/// Reads every playlist file of the imports folder, sorted by file name.
///
/// Returns `None` when the folder doesn't exist, in which case nothing should
/// be synchronized.
pub fn read_collections(config: &ConfigArgs) -> Result<Option<Vec<Collection>>> {
    let dir = &config.imports_dir;
    if !dir.is_dir() {
        warn!("imports folder {:?} not found", dir);
        return Ok(None);
    }

    let mut files: Vec<(String, PathBuf)> = vec![];
    for entry in std::fs::read_dir(dir).wrap_err_with(|| format!("reading {:?}", dir))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(name) = playlist_name(file_name, &config.file_suffix) {
            files.push((name.to_string(), path));
        }
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));

    let collections = files
        .into_iter()
        .map(|(name, path)| Collection {
            video_ids: read_video_ids(&path, &config.video_id_column),
            name,
        })
        .collect();
    Ok(Some(collections))
}

/// `Watch later-videos.csv` -> `Watch later`
fn playlist_name<'a>(file_name: &'a str, suffix: &str) -> Option<&'a str> {
    file_name
        .strip_suffix(suffix)
        .filter(|name| !name.is_empty())
}

/// Collects the non-blank values of `column`. A malformed file is read up to
/// the first bad record.
pub fn read_video_ids(path: &Path, column: &str) -> Vec<String> {
    let mut video_ids = vec![];
    let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
        Ok(r) => r,
        Err(e) => {
            warn!("error reading {:?}: {}", path, e);
            return video_ids;
        }
    };

    let index = match reader.headers() {
        Ok(headers) => headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == column),
        Err(e) => {
            warn!("error reading {:?}: {}", path, e);
            return video_ids;
        }
    };
    let Some(index) = index else {
        warn!("no {:?} column in {:?}", column, path);
        return video_ids;
    };

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("error reading {:?}: {}", path, e);
                break;
            }
        };
        if let Some(id) = record.get(index).map(str::trim).filter(|id| !id.is_empty()) {
            video_ids.push(id.to_string());
        }
    }
    info!("found {} videos in {:?}", video_ids.len(), path);
    video_ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &Path) -> ConfigArgs {
        ConfigArgs {
            imports_dir: dir.to_path_buf(),
            file_suffix: "-videos.csv".to_string(),
            video_id_column: "Video ID".to_string(),
            playlist_description: String::new(),
            max_retries: 0,
            retry_delay_ms: 0,
            max_pages: 10,
        }
    }

    #[test]
    fn test_playlist_name() {
        assert_eq!(playlist_name("Favorites-videos.csv", "-videos.csv"), Some("Favorites"));
        assert_eq!(playlist_name("playlists.csv", "-videos.csv"), None);
        assert_eq!(playlist_name("-videos.csv", "-videos.csv"), None);
    }

    #[test]
    fn test_read_video_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Mix-videos.csv");
        std::fs::write(
            &path,
            "Video ID,Playlist Video Creation Timestamp\n\
             abc123 ,2023-01-01T00:00:00+00:00\n\
             ,2023-01-02T00:00:00+00:00\n\
             \x20\x20,2023-01-03T00:00:00+00:00\n\
             def456,2023-01-04T00:00:00+00:00\n\
             abc123,2023-01-05T00:00:00+00:00\n",
        )
        .unwrap();

        let ids = read_video_ids(&path, "Video ID");
        assert_eq!(ids, vec!["abc123", "def456", "abc123"]);
    }

    #[test]
    fn test_read_video_ids_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Other-videos.csv");
        std::fs::write(&path, "Title,Url\nfoo,https://example.com\n").unwrap();

        assert!(read_video_ids(&path, "Video ID").is_empty());
    }

    #[test]
    fn test_read_video_ids_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Short-videos.csv");
        std::fs::write(&path, "Title,Video ID\nfirst,v1\nsecond\nthird,v3,extra\n").unwrap();

        assert_eq!(read_video_ids(&path, "Video ID"), vec!["v1", "v3"]);
    }

    #[test]
    fn test_read_video_ids_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_video_ids(&dir.path().join("nope-videos.csv"), "Video ID").is_empty());
    }

    #[test]
    fn test_read_collections() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b-videos.csv"), "Video ID\nv2\n").unwrap();
        std::fs::write(dir.path().join("a-videos.csv"), "Video ID\nv1\nv3\n").unwrap();
        std::fs::write(dir.path().join("Empty-videos.csv"), "Video ID\n").unwrap();
        std::fs::write(dir.path().join("playlists.csv"), "Playlist ID\nPL1\n").unwrap();
        std::fs::create_dir(dir.path().join("nested-videos.csv")).unwrap();

        let collections = read_collections(&config(dir.path())).unwrap().unwrap();
        let names: Vec<_> = collections.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Empty", "a", "b"]);
        assert!(collections[0].video_ids.is_empty());
        assert_eq!(collections[1].video_ids, vec!["v1", "v3"]);
        assert_eq!(collections[2].video_ids, vec!["v2"]);
    }

    #[test]
    fn test_read_collections_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let collections = read_collections(&config(&dir.path().join("imports"))).unwrap();
        assert!(collections.is_none());
    }
}
