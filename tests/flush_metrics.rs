use std::collections::HashSet;
use std::num::NonZeroUsize;

use metrics_util::debugging::DebuggingRecorder;
use tagflush::cache::{ContentCacheFlusher, FlusherConfig};
use tagflush::domain::assets::AssetHandle;
use tagflush::infra::fixture::Fixture;

const FIXTURE: &str = r#"
[[node_types]]
name = "Image"

[[nodes]]
identifier = "root"
node_type = "Image"
path = "/r"

[[nodes]]
identifier = "picture"
node_type = "Image"
path = "/r/picture"

[[assets]]
handle = "photo"

[[assets.usages]]
node = "picture"
node_type = "Image"

[[cache_entries]]
id = "gallery"
tags = ["Node_picture"]

[[cache_entries]]
id = "front"
tags = ["Everything"]
"#;

#[tokio::test]
async fn flush_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // capacity 1: seeding two entries evicts one
    let world = Fixture::parse(FIXTURE)
        .expect("fixture")
        .build(NonZeroUsize::MIN)
        .expect("world");
    world.cache.set("extra", "body", ["Node_picture"]);

    let flusher = ContentCacheFlusher::new(FlusherConfig::default(), world.collaborators());
    flusher
        .register_asset_change(&AssetHandle::new("photo"))
        .await
        .expect("asset registers");
    let report = flusher.commit().await;
    assert!(report.entries_removed >= 1);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "tagflush_tags_flushed_total",
        "tagflush_entries_removed_total",
        "tagflush_render_contexts_created_total",
        "tagflush_store_evict_total",
        "tagflush_commit_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
