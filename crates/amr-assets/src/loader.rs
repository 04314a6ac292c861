//! Filesystem asset loader with a worker pool.
//!
//! `request` never blocks: it queues a job and returns `Pending`. Workers
//! read the file and post the result on a completion channel. The frame
//! thread calls [`FsAssetLoader::drain`] and hands each [`Completion`] to
//! `MarkerRegistry::complete_load`, so registry and scene state are only
//! ever touched from that thread.
//!
//! Assets that already loaded once are answered with `Ready` straight away.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use amr_core::{AssetHandle, AssetLoader, AssetRef, LoadError, LoadStatus, LoadTicket};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::config::LoaderConfig;

/// Result of one asset job, ready to be fed to the registry.
#[derive(Clone, Debug)]
pub struct Completion {
    pub ticket: LoadTicket,
    pub asset: AssetRef,
    pub result: Result<AssetHandle, LoadError>,
}

/// A resident asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedAsset {
    pub handle: AssetHandle,
    pub path: PathBuf,
    pub bytes: usize,
}

struct Job {
    ticket: LoadTicket,
    asset: AssetRef,
    path: PathBuf,
}

struct Loaded {
    completion: Completion,
    resident: Option<LoadedAsset>,
}

pub struct FsAssetLoader {
    config: LoaderConfig,
    jobs: Option<Sender<Job>>,
    done: Receiver<Loaded>,
    workers: Vec<JoinHandle<()>>,
    /// Why requests are refused, decided once at construction.
    unavailable: Option<String>,
    resident: HashMap<AssetRef, LoadedAsset>,
    outstanding: usize,
}

impl FsAssetLoader {
    /// Spawn `config.workers` worker threads (at least one).
    pub fn new(config: LoaderConfig) -> Self {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (done_tx, done_rx) = unbounded::<Loaded>();
        let next_handle = Arc::new(AtomicU64::new(0));

        let workers = (0..config.workers.max(1))
            .map(|i| {
                let jobs = job_rx.clone();
                let done = done_tx.clone();
                let next_handle = Arc::clone(&next_handle);
                thread::Builder::new()
                    .name(format!("amr-loader-{i}"))
                    .spawn(move || worker_loop(jobs, done, next_handle))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!("failed to spawn loader worker: {e}");
                    None
                }
            })
            .collect::<Vec<_>>();

        let jobs = if workers.is_empty() { None } else { Some(job_tx) };
        let unavailable = if jobs.is_none() {
            Some("no loader workers".to_string())
        } else if !config.asset_dir.is_dir() {
            Some(format!("asset directory {} missing", config.asset_dir.display()))
        } else {
            None
        };
        if let Some(reason) = &unavailable {
            tracing::warn!("asset loader unavailable: {reason}");
        }

        Self {
            config,
            jobs,
            done: done_rx,
            workers,
            unavailable,
            resident: HashMap::new(),
            outstanding: 0,
        }
    }

    /// Where `asset` lives on disk.
    pub fn path_for(&self, asset: &AssetRef) -> PathBuf {
        let ext = match asset {
            AssetRef::Texture(_) => &self.config.texture_extension,
            AssetRef::Model(_) => &self.config.model_extension,
        };
        self.config
            .asset_dir
            .join(format!("{}.{ext}", asset.name()))
    }

    /// Jobs requested but not yet drained.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn resident(&self, asset: &AssetRef) -> Option<&LoadedAsset> {
        self.resident.get(asset)
    }

    /// Collect every completion available right now. Never blocks.
    pub fn drain(&mut self) -> Vec<Completion> {
        let mut out = Vec::new();
        while let Ok(loaded) = self.done.try_recv() {
            out.push(self.accept(loaded));
        }
        out
    }

    /// Block until every outstanding job has completed or `timeout` passes.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<Completion> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        while self.outstanding > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.done.recv_timeout(remaining) {
                Ok(loaded) => out.push(self.accept(loaded)),
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        "{} asset loads still outstanding after {timeout:?}",
                        self.outstanding
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        out
    }

    fn accept(&mut self, loaded: Loaded) -> Completion {
        self.outstanding = self.outstanding.saturating_sub(1);
        if let Some(asset) = loaded.resident {
            self.resident.insert(loaded.completion.asset.clone(), asset);
        }
        loaded.completion
    }
}

impl AssetLoader for FsAssetLoader {
    fn request(&mut self, ticket: LoadTicket, asset: &AssetRef) -> Result<LoadStatus, LoadError> {
        if let Some(loaded) = self.resident.get(asset) {
            tracing::debug!("{asset} already resident");
            return Ok(LoadStatus::Ready(loaded.handle));
        }
        if let Some(reason) = &self.unavailable {
            return Err(LoadError::Unavailable(reason.clone()));
        }
        let Some(jobs) = &self.jobs else {
            return Err(LoadError::Unavailable("no loader workers".to_string()));
        };

        let job = Job {
            ticket,
            asset: asset.clone(),
            path: self.path_for(asset),
        };
        jobs.send(job)
            .map_err(|_| LoadError::Unavailable("loader workers exited".to_string()))?;
        self.outstanding += 1;
        tracing::debug!("queued {asset} (ticket {})", ticket.0);
        Ok(LoadStatus::Pending)
    }
}

impl Drop for FsAssetLoader {
    fn drop(&mut self) {
        // Closing the job channel ends every worker loop.
        self.jobs.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("loader worker panicked");
            }
        }
    }
}

fn worker_loop(jobs: Receiver<Job>, done: Sender<Loaded>, next_handle: Arc<AtomicU64>) {
    while let Ok(job) = jobs.recv() {
        let result = read_asset(&job.path).map(|bytes| LoadedAsset {
            handle: AssetHandle(next_handle.fetch_add(1, Ordering::Relaxed)),
            path: job.path.clone(),
            bytes,
        });
        let loaded = match result {
            Ok(asset) => {
                tracing::debug!("loaded {} ({} bytes)", asset.path.display(), asset.bytes);
                Loaded {
                    completion: Completion {
                        ticket: job.ticket,
                        asset: job.asset,
                        result: Ok(asset.handle),
                    },
                    resident: Some(asset),
                }
            }
            Err(e) => Loaded {
                completion: Completion {
                    ticket: job.ticket,
                    asset: job.asset,
                    result: Err(e),
                },
                resident: None,
            },
        };
        if done.send(loaded).is_err() {
            break;
        }
    }
}

/// Read an asset file. Decoding is the renderer's business; an empty file
/// is the only content check.
fn read_asset(path: &Path) -> Result<usize, LoadError> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(path.display().to_string()),
        _ => LoadError::Io(format!("{}: {e}", path.display())),
    })?;
    if bytes.is_empty() {
        return Err(LoadError::Decode(format!("{} is empty", path.display())));
    }
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn loader(dir: &TempDir) -> FsAssetLoader {
        FsAssetLoader::new(LoaderConfig {
            asset_dir: dir.path().to_path_buf(),
            workers: 1,
            ..LoaderConfig::default()
        })
    }

    #[test]
    fn test_path_for_uses_extension_per_kind() {
        let dir = TempDir::new().unwrap();
        let loader = loader(&dir);
        assert_eq!(
            loader.path_for(&AssetRef::Model("diya_textured".into())),
            dir.path().join("diya_textured.sfb")
        );
        assert_eq!(
            loader.path_for(&AssetRef::Texture("rangoli".into())),
            dir.path().join("rangoli.png")
        );
    }

    #[test]
    fn test_read_asset_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.sfb");
        assert!(matches!(read_asset(&missing), Err(LoadError::NotFound(_))));

        let empty = dir.path().join("empty.sfb");
        fs::write(&empty, b"").unwrap();
        assert!(matches!(read_asset(&empty), Err(LoadError::Decode(_))));

        let full = dir.path().join("full.sfb");
        fs::write(&full, b"model").unwrap();
        assert_eq!(read_asset(&full), Ok(5));
    }

    #[test]
    fn test_missing_asset_dir_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut loader = FsAssetLoader::new(LoaderConfig {
            asset_dir: dir.path().join("absent"),
            ..LoaderConfig::default()
        });
        let err = loader
            .request(LoadTicket(0), &AssetRef::Model("m".into()))
            .unwrap_err();
        assert!(matches!(err, LoadError::Unavailable(_)));
        assert_eq!(loader.outstanding(), 0);
    }

    #[test]
    fn test_asset_dir_checked_once_at_construction() {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("assets");
        fs::create_dir(&assets).unwrap();
        let mut loader = FsAssetLoader::new(LoaderConfig {
            asset_dir: assets.clone(),
            workers: 1,
            ..LoaderConfig::default()
        });

        // Removing the directory afterwards is only noticed by the worker.
        fs::remove_dir(&assets).unwrap();
        let status = loader
            .request(LoadTicket(0), &AssetRef::Model("m".into()))
            .unwrap();
        assert_eq!(status, LoadStatus::Pending);
        assert_eq!(loader.outstanding(), 1);

        let done = loader.wait_idle(Duration::from_secs(5));
        assert_eq!(done.len(), 1);
        assert!(matches!(done[0].result, Err(LoadError::NotFound(_))));
    }
}
