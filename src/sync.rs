use std::collections::{HashMap, HashSet};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use color_eyre::eyre::Result;
use tracing::{error, info, warn};

use crate::ConfigArgs;
use crate::import::{Collection, read_collections};
use crate::video_api::{ApiError, DynVideoApi, Playlist, VideoApi};

/// Playlist name -> playlist id for the account, kept up to date with the
/// playlists created during the run.
#[derive(Debug, Default)]
pub struct PlaylistDirectory(HashMap<String, String>);

impl PlaylistDirectory {
    /// Only one page of playlists is requested, accounts are assumed to own at
    /// most 50 of them. A failure yields an empty directory, every collection
    /// will then try to create its playlist.
    pub async fn fetch(api: &dyn VideoApi, config: &ConfigArgs) -> Self {
        let res = (|| api.get_playlists_info())
            .retry(backoff(config))
            .sleep(tokio::time::sleep)
            .when(ApiError::is_transient)
            .notify(|e, dur| warn!("listing playlists failed, retrying in {:?}: {}", dur, e))
            .await;
        match res {
            Ok(playlists) => Self::from_playlists(playlists),
            Err(e) => {
                error!("error fetching existing playlists: {}", e);
                Self::default()
            }
        }
    }

    /// Duplicate names collapse, the last playlist wins
    pub fn from_playlists(playlists: impl IntoIterator<Item = Playlist>) -> Self {
        Self(playlists.into_iter().map(|p| (p.name, p.id)).collect())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, playlist: Playlist) {
        self.0.insert(playlist.name, playlist.id);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No video to import, nothing was requested
    Empty,
    /// The playlist didn't exist and couldn't be created
    CreateFailed,
    UpToDate {
        created: bool,
    },
    Synced {
        created: bool,
        attempted: usize,
        added: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub name: String,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Default)]
pub struct SyncReport(pub Vec<CollectionReport>);

impl SyncReport {
    pub fn created(&self) -> usize {
        self.0
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    SyncOutcome::UpToDate { created: true } | SyncOutcome::Synced { created: true, .. }
                )
            })
            .count()
    }

    /// (added, attempted) over all collections
    pub fn added(&self) -> (usize, usize) {
        self.0.iter().fold((0, 0), |acc, r| match r.outcome {
            SyncOutcome::Synced {
                attempted, added, ..
            } => (acc.0 + added, acc.1 + attempted),
            _ => acc,
        })
    }
}

fn backoff(config: &ConfigArgs) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.retry_delay_ms))
        .with_max_times(config.max_retries)
        .with_jitter()
}

/// Imports every collection of the imports folder into the account
pub async fn import_folder(api: &DynVideoApi, config: &ConfigArgs) -> Result<SyncReport> {
    let Some(collections) = read_collections(config)? else {
        return Ok(SyncReport::default());
    };

    let mut directory = PlaylistDirectory::fetch(api.as_ref(), config).await;
    info!("found {} existing playlists", directory.len());

    let report = synchronize(api.as_ref(), &collections, &mut directory, config).await;
    let (added, attempted) = report.added();
    info!(
        "synchronization complete: {} playlists created, {}/{} videos added",
        report.created(),
        added,
        attempted
    );
    Ok(report)
}

/// Processes the collections one after the other, in order
pub async fn synchronize(
    api: &dyn VideoApi,
    collections: &[Collection],
    directory: &mut PlaylistDirectory,
    config: &ConfigArgs,
) -> SyncReport {
    let mut reports = vec![];
    for collection in collections {
        info!("synchronizing playlist \"{}\" ...", collection.name);
        let outcome = synchronize_collection(api, collection, directory, config).await;
        reports.push(CollectionReport {
            name: collection.name.clone(),
            outcome,
        });
    }
    SyncReport(reports)
}

pub async fn synchronize_collection(
    api: &dyn VideoApi,
    collection: &Collection,
    directory: &mut PlaylistDirectory,
    config: &ConfigArgs,
) -> SyncOutcome {
    if collection.video_ids.is_empty() {
        info!("no videos for \"{}\", skipping", collection.name);
        return SyncOutcome::Empty;
    }

    let (playlist_id, created) = match directory.get(&collection.name) {
        Some(id) => {
            info!("using existing playlist \"{}\" [{}]", collection.name, id);
            (id.to_string(), false)
        }
        None => match api
            .create_playlist(&collection.name, &config.playlist_description)
            .await
        {
            Ok(playlist) => {
                info!("created playlist \"{}\" [{}]", collection.name, playlist.id);
                let id = playlist.id.clone();
                // The remote may normalize the title, keep the local name as key
                directory.insert(Playlist {
                    id: playlist.id,
                    name: collection.name.clone(),
                });
                (id, true)
            }
            Err(e) => {
                error!("error creating playlist \"{}\": {}", collection.name, e);
                return SyncOutcome::CreateFailed;
            }
        },
    };

    let membership = get_playlist_video_ids(api, &playlist_id, config).await;
    info!("playlist already contains {} videos", membership.len());

    let missing = missing_videos(&collection.video_ids, &membership);
    if missing.is_empty() {
        info!("all videos already in \"{}\"", collection.name);
        return SyncOutcome::UpToDate { created };
    }

    info!("adding {} videos to \"{}\"", missing.len(), collection.name);
    let mut added = 0;
    for video_id in missing.iter() {
        if add_video(api, &playlist_id, video_id, config).await {
            added += 1;
        }
    }
    info!(
        "added {}/{} videos to \"{}\"",
        added,
        missing.len(),
        collection.name
    );

    SyncOutcome::Synced {
        created,
        attempted: missing.len(),
        added,
    }
}

/// Reads the whole membership of a playlist. A failing page ends the reading,
/// the videos gathered so far are returned.
pub async fn get_playlist_video_ids(
    api: &dyn VideoApi,
    playlist_id: &str,
    config: &ConfigArgs,
) -> HashSet<String> {
    let mut video_ids = HashSet::new();
    let mut page_token: Option<String> = None;
    // Reading no page at all would make every video look missing
    let max_pages = config.max_pages.max(1);

    for _ in 0..max_pages {
        let res = (|| api.get_playlist_items_page(playlist_id, page_token.clone()))
            .retry(backoff(config))
            .sleep(tokio::time::sleep)
            .when(ApiError::is_transient)
            .notify(|e, dur| {
                warn!(
                    "listing items of {} failed, retrying in {:?}: {}",
                    playlist_id, dur, e
                )
            })
            .await;
        let page = match res {
            Ok(page) => page,
            Err(e) => {
                error!("error fetching playlist items for {}: {}", playlist_id, e);
                return video_ids;
            }
        };

        video_ids.extend(page.video_ids);
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => return video_ids,
        }
    }

    warn!(
        "stopped listing items of {} after {} pages",
        playlist_id, max_pages
    );
    video_ids
}

/// Videos not in `membership`, in input order. Repeated ids are kept.
pub fn missing_videos<'a>(video_ids: &'a [String], membership: &HashSet<String>) -> Vec<&'a str> {
    video_ids
        .iter()
        .filter(|id| !membership.contains(id.as_str()))
        .map(String::as_str)
        .collect()
}

async fn add_video(api: &dyn VideoApi, playlist_id: &str, video_id: &str, config: &ConfigArgs) -> bool {
    let res = (|| api.add_video_to_playlist(playlist_id, video_id))
        .retry(backoff(config))
        .sleep(tokio::time::sleep)
        .when(ApiError::is_transient_insert)
        .notify(|e, dur| warn!("adding video {} failed, retrying in {:?}: {}", video_id, dur, e))
        .await;
    match res {
        Ok(()) => true,
        Err(e) => {
            error!("error adding video {} to playlist: {}", video_id, e);
            false
        }
    }
}
