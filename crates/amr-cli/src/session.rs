//! A replay session: one registry, its host, and the frame loop around them.

use std::time::Duration;

use amr_assets::{Config, FsAssetLoader};
use amr_core::{
    AssetLoader, AssetRef, Counters, DiagnosticsSink, Frame, LoadError, LoadStatus, LoadTicket,
    MarkerRegistry, MemoryScene, NodeHandle, Pose, RegistrySnapshot, SceneError, SceneGraph,
    SceneNode,
};
use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

/// How long to wait for outstanding loads when a frame asks to settle or
/// the session ends.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Scene, loader and console diagnostics for a replay.
pub struct ReplayHost {
    scene: MemoryScene,
    loader: FsAssetLoader,
    /// Print each published counter pair as `tracking / detected`.
    echo: bool,
    publications: usize,
}

impl SceneGraph for ReplayHost {
    fn attach(&mut self, anchor: &Pose, node: &SceneNode) -> Result<NodeHandle, SceneError> {
        self.scene.attach(anchor, node)
    }

    fn detach(&mut self, node: NodeHandle) -> Result<(), SceneError> {
        self.scene.detach(node)
    }
}

impl AssetLoader for ReplayHost {
    fn request(&mut self, ticket: LoadTicket, asset: &AssetRef) -> Result<LoadStatus, LoadError> {
        self.loader.request(ticket, asset)
    }
}

impl DiagnosticsSink for ReplayHost {
    fn publish(&mut self, counters: Counters) {
        self.publications += 1;
        if self.echo {
            println!("{} / {}", counters.tracking, counters.detected);
        }
    }
}

/// End-of-session report.
#[derive(Debug, Serialize)]
pub struct Report {
    pub session: Uuid,
    pub frames: usize,
    pub skipped_frames: usize,
    pub publications: usize,
    pub attach_calls: usize,
    pub detach_calls: usize,
    pub registry: RegistrySnapshot,
}

pub struct Session {
    id: Uuid,
    registry: MarkerRegistry,
    host: ReplayHost,
    frames: usize,
    skipped_frames: usize,
}

impl Session {
    pub fn new(config: &Config, echo: bool) -> Result<Self> {
        let catalog = config.catalog().context("invalid overlay table")?;
        let id = Uuid::new_v4();
        tracing::info!(
            "session {id}: {} overlays, assets from {}",
            catalog.len(),
            config.loader.asset_dir.display()
        );
        Ok(Self {
            id,
            registry: MarkerRegistry::with_options(catalog, config.registry),
            host: ReplayHost {
                scene: MemoryScene::new(),
                loader: FsAssetLoader::new(config.loader.clone()),
                echo,
                publications: 0,
            },
            frames: 0,
            skipped_frames: 0,
        })
    }

    /// Deliver finished loads, then process one tracker frame.
    pub fn step(&mut self, frame: &Frame, settle: bool) {
        if settle {
            self.settle();
        } else {
            self.pump();
        }
        self.frames += 1;
        if !self.registry.process_camera_frame(frame, &mut self.host) {
            self.skipped_frames += 1;
        }
    }

    /// Hand every completion available now to the registry.
    fn pump(&mut self) {
        for c in self.host.loader.drain() {
            self.registry.complete_load(c.ticket, c.result, &mut self.host);
        }
    }

    /// Wait for all outstanding loads and hand them to the registry.
    fn settle(&mut self) {
        for c in self.host.loader.wait_idle(SETTLE_TIMEOUT) {
            self.registry.complete_load(c.ticket, c.result, &mut self.host);
        }
    }

    pub fn report(&self) -> Report {
        Report {
            session: self.id,
            frames: self.frames,
            skipped_frames: self.skipped_frames,
            publications: self.host.publications,
            attach_calls: self.host.scene.attach_calls,
            detach_calls: self.host.scene.detach_calls,
            registry: self.registry.snapshot(),
        }
    }

    /// Settle outstanding loads, report, then tear the scene down.
    pub fn finish(mut self) -> Report {
        self.settle();
        let report = self.report();
        self.host.echo = false;
        self.registry.clear(&mut self.host);
        tracing::info!(
            "session {} closed, {} nodes left in scene",
            self.id,
            self.host.scene.nodes.len()
        );
        report
    }
}
