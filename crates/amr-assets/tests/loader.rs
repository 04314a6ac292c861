//! Filesystem loader driving a real registry: completions are produced on
//! worker threads and delivered back on the test thread.

use std::fs;
use std::time::Duration;

use amr_assets::{Config, FsAssetLoader, LoaderConfig};
use amr_core::{
    AssetLoader, AssetRef, Counters, DiagnosticsSink, LoadError, LoadStatus, LoadTicket, Marker,
    MarkerId, MarkerRegistry, MemoryScene, NodeHandle, OverlayCatalog, Pose, SceneError,
    SceneGraph, SceneNode,
};
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

struct TestHost {
    scene: MemoryScene,
    loader: FsAssetLoader,
    published: Vec<Counters>,
}

impl SceneGraph for TestHost {
    fn attach(&mut self, anchor: &Pose, node: &SceneNode) -> Result<NodeHandle, SceneError> {
        self.scene.attach(anchor, node)
    }

    fn detach(&mut self, node: NodeHandle) -> Result<(), SceneError> {
        self.scene.detach(node)
    }
}

impl AssetLoader for TestHost {
    fn request(&mut self, ticket: LoadTicket, asset: &AssetRef) -> Result<LoadStatus, LoadError> {
        self.loader.request(ticket, asset)
    }
}

impl DiagnosticsSink for TestHost {
    fn publish(&mut self, counters: Counters) {
        self.published.push(counters);
    }
}

fn host(dir: &TempDir) -> TestHost {
    TestHost {
        scene: MemoryScene::new(),
        loader: FsAssetLoader::new(LoaderConfig {
            asset_dir: dir.path().to_path_buf(),
            ..LoaderConfig::default()
        }),
        published: Vec::new(),
    }
}

fn settle(reg: &mut MarkerRegistry, host: &mut TestHost) {
    let completions = host.loader.wait_idle(WAIT);
    for c in completions {
        reg.complete_load(c.ticket, c.result, host);
    }
}

#[test]
fn model_loads_on_worker_and_attaches() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("diya_textured.sfb"), b"sfb-bytes").unwrap();

    let mut reg = MarkerRegistry::new(OverlayCatalog::builtin());
    let mut host = host(&dir);

    reg.process_frame(&[Marker::tracking(6, "abs_6", Pose::identity())], &mut host);
    assert!(reg.contains(MarkerId(6)));
    assert_eq!(host.scene.attach_calls, 0);

    settle(&mut reg, &mut host);
    assert_eq!(host.scene.attach_calls, 1);
    assert_eq!(host.loader.outstanding(), 0);

    let resident = host
        .loader
        .resident(&AssetRef::Model("diya_textured".into()))
        .unwrap();
    assert_eq!(resident.bytes, 9);
}

#[test]
fn resident_asset_attaches_in_same_frame() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("kandil_texture.sfb"), b"kandil").unwrap();

    let mut reg = MarkerRegistry::new(OverlayCatalog::builtin());
    let mut host = host(&dir);

    reg.process_frame(&[Marker::tracking(1, "abs_7", Pose::identity())], &mut host);
    settle(&mut reg, &mut host);
    assert_eq!(host.scene.attach_calls, 1);

    // Second marker with the same model: cache hit, no new job.
    reg.process_frame(&[Marker::tracking(2, "abs_7", Pose::identity())], &mut host);
    assert_eq!(host.scene.attach_calls, 2);
    assert_eq!(host.loader.outstanding(), 0);
    assert_eq!(reg.counters().tracking, 2);
}

#[test]
fn missing_file_leaves_marker_unregistered() {
    let dir = TempDir::new().unwrap();

    let mut reg = MarkerRegistry::new(OverlayCatalog::builtin());
    let mut host = host(&dir);

    reg.process_frame(&[Marker::tracking(5, "abs_5", Pose::identity())], &mut host);
    assert_eq!(reg.counters().tracking, 1);

    settle(&mut reg, &mut host);
    assert!(reg.is_empty());
    assert!(reg.has_failed(MarkerId(5)));
    assert_eq!(reg.counters().tracking, 0);
    assert_eq!(host.scene.attach_calls, 0);
}

#[test]
fn stop_before_load_finishes_drops_completion() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("diya_textured.sfb"), b"sfb").unwrap();

    let mut reg = MarkerRegistry::new(OverlayCatalog::builtin());
    let mut host = host(&dir);

    reg.process_frame(&[Marker::tracking(6, "abs_6", Pose::identity())], &mut host);
    reg.process_frame(&[Marker::stopped(6, "abs_6")], &mut host);
    settle(&mut reg, &mut host);

    assert!(reg.is_empty());
    assert_eq!(host.scene.attach_calls, 0);
    assert!(host.scene.nodes.is_empty());
}

#[test]
fn config_file_resolves_asset_dir_relative_to_itself() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("models")).unwrap();
    fs::write(dir.path().join("models").join("lamp.glb"), b"glb").unwrap();
    let config_path = dir.path().join("amr.toml");
    fs::write(
        &config_path,
        r#"
        [loader]
        asset_dir = "models"
        model_extension = "glb"
        workers = 1

        [[overlay]]
        label = "lamp"
        kind = "dynamic"
        model = "lamp"
        "#,
    )
    .unwrap();

    let (config, used) = Config::resolve(Some(&config_path)).unwrap();
    assert_eq!(used.as_deref(), Some(config_path.as_path()));
    assert_eq!(config.loader.asset_dir, dir.path().join("models"));

    let mut reg = MarkerRegistry::with_options(config.catalog().unwrap(), config.registry);
    let mut host = TestHost {
        scene: MemoryScene::new(),
        loader: FsAssetLoader::new(config.loader.clone()),
        published: Vec::new(),
    };
    reg.process_frame(&[Marker::tracking(1, "lamp", Pose::identity())], &mut host);
    settle(&mut reg, &mut host);
    assert_eq!(host.scene.attach_calls, 1);
    assert_eq!(host.published.last().map(|c| c.tracking), Some(1));
}
