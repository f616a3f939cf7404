use super::*;
use crate::scene::graph::SceneGraph;
use serde_json::json;

fn info(name: &str) -> CreationInfo {
    CreationInfo::from_value(json!({ "filepath": name }))
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "render_replay_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[derive(Clone, Default)]
struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn captured_logs(f: impl FnOnce()) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = logs.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

fn spawn(rec: &mut Recorder, g: &mut SceneGraph, name: &str) -> (NodeId, InstanceKey) {
    let node = g.create_node(None).unwrap();
    let key = rec.on_create_render_asset_instance(g, node, info(name));
    (node, key)
}

#[test]
fn create_then_destroy_within_one_keyframe_leaves_no_trace() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    let (node, _) = spawn(&mut rec, &mut g, "a");

    g.destroy_node(node).unwrap();

    let kf = rec.current_keyframe();
    assert!(kf.creations.is_empty());
    assert!(kf.deletions.is_empty());
    assert_eq!(rec.instance_count(), 0);
}

#[test]
fn keys_are_strictly_increasing_across_deletions() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    let mut keys = Vec::new();
    for i in 0..5 {
        let (node, key) = spawn(&mut rec, &mut g, "a");
        keys.push(key);
        if i % 2 == 0 {
            g.destroy_node(node).unwrap();
        }
    }
    assert_eq!(
        keys,
        (0..5).map(InstanceKey).collect::<Vec<_>>(),
        "keys start at zero and never repeat"
    );
}

#[test]
fn second_save_without_changes_has_no_state_updates() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    spawn(&mut rec, &mut g, "a");

    rec.save_keyframe(&g);
    rec.save_keyframe(&g);

    let saved = rec.saved_keyframes();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].state_updates.len(), 1);
    assert!(saved[1].state_updates.is_empty());
}

#[test]
fn save_moves_current_keyframe_to_saved_list() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    rec.on_load_render_asset(AssetInfo::from_value(json!("a.glb")));
    spawn(&mut rec, &mut g, "a");

    rec.save_keyframe(&g);

    assert!(rec.current_keyframe().is_empty());
    let saved = rec.saved_keyframes();
    assert_eq!(saved[0].loads.len(), 1);
    assert_eq!(saved[0].creations.len(), 1);
}

#[test]
fn create_move_delete_scenario_consolidates_to_nothing() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    let (node, key) = spawn(&mut rec, &mut g, "a");
    assert_eq!(key, InstanceKey(0));
    rec.save_keyframe(&g);

    g.set_translation(node, Vec3::new(1.0, 0.0, 0.0)).unwrap();
    rec.save_keyframe(&g);

    g.destroy_node(node).unwrap();
    rec.save_keyframe(&g);

    let doc = serde_json::to_value(rec.keyframes_document()).unwrap();
    let kfs = doc["keyframes"].as_array().unwrap();
    assert_eq!(kfs.len(), 3);
    assert_eq!(
        kfs[0]["creations"],
        json!([{ "instanceKey": 0, "creation": { "filepath": "a" } }])
    );
    // First observation of a new instance is always emitted.
    assert_eq!(kfs[0]["stateUpdates"][0]["instanceKey"], json!(0));
    assert_eq!(
        kfs[1],
        json!({
            "stateUpdates": [{
                "instanceKey": 0,
                "absTransform": {
                    "translation": [1.0, 0.0, 0.0],
                    "rotation": [1.0, 0.0, 0.0, 0.0],
                },
                "semanticId": 0,
            }]
        })
    );
    assert_eq!(kfs[2], json!({ "deletions": [0] }));

    let s = rec.write_saved_keyframes_to_string().unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&s).unwrap(), doc);
    assert_eq!(rec.saved_keyframe_count(), 0);
    assert!(rec.current_keyframe().is_empty());
}

#[test]
fn flush_keeps_live_creations_for_the_next_flush() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    rec.on_load_render_asset(AssetInfo::from_value(json!("a.glb")));
    let (node, key) = spawn(&mut rec, &mut g, "a");
    rec.save_keyframe(&g);
    rec.write_saved_keyframes_to_string().unwrap();

    let kf = rec.current_keyframe();
    assert_eq!(kf.loads.len(), 1);
    assert_eq!(kf.creations, vec![(key, info("a"))]);
    assert!(kf.state_updates.is_empty());

    // The next flush still cancels the carried-over creation.
    g.destroy_node(node).unwrap();
    assert!(rec.current_keyframe().creations.is_empty());
    assert!(rec.current_keyframe().deletions.is_empty());
}

#[test]
fn unsaved_deletion_cancels_flushed_creation() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    let (node, _) = spawn(&mut rec, &mut g, "a");
    rec.save_keyframe(&g);

    g.destroy_node(node).unwrap();
    assert_eq!(rec.current_keyframe().deletions, vec![InstanceKey(0)]);

    rec.write_saved_keyframes_to_bytes().unwrap();
    let kf = rec.current_keyframe();
    assert!(kf.creations.is_empty());
    assert!(kf.deletions.is_empty());
}

#[test]
fn consolidation_keeps_unsaved_one_shot_events() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    spawn(&mut rec, &mut g, "a");
    rec.add_user_transform_to_keyframe("agent", Vec3::X, Quat::IDENTITY);
    rec.save_keyframe(&g);

    rec.add_user_transform_to_keyframe("camera", Vec3::Y, Quat::IDENTITY);
    rec.write_saved_keyframes_to_bytes().unwrap();

    let kf = rec.current_keyframe();
    assert_eq!(kf.user_transforms.len(), 1);
    assert!(kf.user_transforms.contains_key("camera"));
}

#[test]
fn cached_state_survives_a_flush() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    let (node, _) = spawn(&mut rec, &mut g, "a");
    rec.save_keyframe(&g);
    rec.write_saved_keyframes_to_bytes().unwrap();

    rec.save_keyframe(&g);
    assert!(rec.saved_keyframes()[0].state_updates.is_empty());

    g.set_semantic_id(node, 9).unwrap();
    rec.save_keyframe(&g);
    assert_eq!(rec.saved_keyframes()[1].state_updates[0].1.semantic_id, 9);
}

#[test]
fn user_transform_last_write_before_save_wins() {
    let g = SceneGraph::new();
    let mut rec = Recorder::new();
    rec.add_user_transform_to_keyframe("agent", Vec3::X, Quat::IDENTITY);
    rec.add_user_transform_to_keyframe("agent", Vec3::Z, Quat::IDENTITY);
    rec.save_keyframe(&g);

    let saved = rec.saved_keyframes();
    assert_eq!(saved[0].user_transforms["agent"].translation, Vec3::Z);
}

#[test]
fn destroying_a_parent_deletes_child_instances() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    let parent = g.create_node(None).unwrap();
    let child = g.create_node(Some(parent)).unwrap();
    let pk = rec.on_create_render_asset_instance(&mut g, parent, info("p"));
    let ck = rec.on_create_render_asset_instance(&mut g, child, info("c"));
    rec.save_keyframe(&g);

    g.destroy_node(parent).unwrap();

    assert_eq!(rec.current_keyframe().deletions, vec![ck, pk]);
    assert_eq!(rec.instance_count(), 0);
}

#[test]
fn lookups_by_node() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    let (a, ka) = spawn(&mut rec, &mut g, "a");
    let (b, kb) = spawn(&mut rec, &mut g, "b");
    assert_eq!(rec.find_instance(b), Some(1));
    assert_eq!(rec.instance_key(a), Some(ka));
    assert_eq!(rec.instance_key(b), Some(kb));

    g.destroy_node(a).unwrap();
    assert_eq!(rec.find_instance(a), None);
    assert_eq!(rec.find_instance(b), Some(0));
}

#[test]
#[should_panic(expected = "already has an instance record")]
fn duplicate_creation_is_a_contract_violation() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    let (node, _) = spawn(&mut rec, &mut g, "a");
    rec.on_create_render_asset_instance(&mut g, node, info("again"));
}

#[test]
#[should_panic(expected = "not alive")]
fn creation_on_dead_node_is_a_contract_violation() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    let node = g.create_node(None).unwrap();
    g.destroy_node(node).unwrap();
    rec.on_create_render_asset_instance(&mut g, node, info("a"));
}

#[test]
fn dropping_recorder_first_leaves_inert_hooks() {
    let mut g = SceneGraph::new();
    let node = g.create_node(None).unwrap();
    {
        let mut rec = Recorder::new();
        rec.on_create_render_asset_instance(&mut g, node, info("a"));
        assert_eq!(g.destruction_hook_count(node), 1);
    }
    // Must not touch the dropped recorder.
    g.destroy_node(node).unwrap();
    assert!(g.is_empty());
}

#[test]
fn empty_flush_is_a_no_op_with_a_well_formed_document() {
    let mut rec = Recorder::new();
    assert_eq!(rec.write_saved_keyframes_to_string().unwrap(), r#"{"keyframes":[]}"#);

    let dir = temp_dir("recorder_empty_flush");
    let stats = rec
        .write_saved_keyframes_to_file(&dir.join("empty.json"), false)
        .unwrap();
    assert_eq!(stats.keyframes_written, 0);
    assert!(rec.current_keyframe().is_empty());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn failed_file_write_keeps_saved_keyframes_for_retry() {
    let mut g = SceneGraph::new();
    let mut rec = Recorder::new();
    spawn(&mut rec, &mut g, "a");
    rec.save_keyframe(&g);

    let dir = temp_dir("recorder_retry");
    std::fs::create_dir_all(&dir).unwrap();
    let err = rec.write_saved_keyframes_to_file(&dir, true).unwrap_err();
    assert!(matches!(err, ReplayError::Io { .. }));
    assert_eq!(rec.saved_keyframe_count(), 1);
    assert!(rec.current_keyframe().is_empty());

    let path = dir.join("replay.json");
    let stats = rec.write_saved_keyframes_to_file(&path, true).unwrap();
    assert_eq!(stats.keyframes_written, 1);
    assert_eq!(stats.bytes_written, std::fs::read(&path).unwrap().len());
    assert_eq!(rec.saved_keyframe_count(), 0);
    assert_eq!(rec.current_keyframe().creations.len(), 1);

    std::fs::remove_dir_all(&dir).ok();
}

#[cfg(feature = "observations")]
#[test]
fn observation_is_written_once_and_not_consolidated() {
    use crate::replay::keyframe::SensorType;

    let g = SceneGraph::new();
    let mut rec = Recorder::new();
    rec.set_observation(Observation {
        camera_transform: Transform::from_translation(Vec3::Z),
        sensor_type: SensorType::Depth,
    });
    rec.save_keyframe(&g);
    rec.save_keyframe(&g);

    let v = serde_json::to_value(rec.keyframes_document()).unwrap();
    assert_eq!(
        v["keyframes"][0]["observation"],
        json!({
            "cameraTransform": {
                "translation": [0.0, 0.0, 1.0],
                "rotation": [1.0, 0.0, 0.0, 0.0],
            },
            "sensorType": 2,
        })
    );
    assert_eq!(v["keyframes"][1], json!({}));

    rec.write_saved_keyframes_to_bytes().unwrap();
    assert!(rec.current_keyframe().observation.is_none());
}

#[test]
fn empty_flush_warns_but_inspection_does_not() {
    let mut rec = Recorder::new();
    let inspected = captured_logs(|| assert!(rec.keyframes_document().is_empty()));
    assert!(!inspected.contains("no saved keyframes"));

    let flushed = captured_logs(|| {
        assert_eq!(rec.write_saved_keyframes_to_string().unwrap(), r#"{"keyframes":[]}"#);
    });
    assert!(flushed.contains("no saved keyframes to write"));
}
