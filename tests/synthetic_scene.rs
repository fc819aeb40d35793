use approx::assert_abs_diff_eq;
use dimscan::io::{save_point_set, ArchiveMeta, FrameSource, ReplaySource, SceneBuilder, SyntheticSource};
use dimscan::pipeline::{BBoxType, PlaneEstimator, PlaneTier};
use dimscan::{DimsConfig, Pipeline, Stage};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn config() -> DimsConfig {
    let mut cfg = DimsConfig {
        seed: Some(11),
        ..DimsConfig::default()
    };
    // A voxel grid caps the density, so fewer neighbors than the default.
    cfg.set_param("dbscan_min_points", "8").unwrap();
    cfg
}

#[test]
fn test_box_on_table_in_meters() {
    let mut source = SyntheticSource::new(SceneBuilder::default(), 1).with_limit(1);
    let frame = source.read().unwrap();
    let cfg = config();
    let tol = 2.0 * cfg.voxel_size;

    let (res, snaps) = Pipeline::with_config(cfg).process(&frame).unwrap();

    assert!(res.is_valid(), "{}", res);
    assert_abs_diff_eq!(res.length, 0.20, epsilon = tol);
    assert_abs_diff_eq!(res.width, 0.12, epsilon = tol);
    assert_abs_diff_eq!(res.height, 0.08, epsilon = tol);

    // Object snapshot is in sensor coordinates, between the sensor and the table.
    let object = snaps.get(Stage::Object).unwrap();
    assert!(!object.is_empty());
    assert!(object.iter().all(|p| p.z < 0.8 && p.z > 0.7));
}

#[test]
fn test_rotated_noisy_box() {
    let scene = SceneBuilder::default()
        .box_size(0.16, 0.10, 0.06)
        .box_center(0.05, -0.03)
        .yaw_deg(35.0)
        .noise_std(0.0005);
    let mut source = SyntheticSource::new(scene, 3).with_limit(1);
    let frame = source.read().unwrap();

    let (res, _) = Pipeline::with_config(config()).process(&frame).unwrap();

    assert!(res.length >= res.width);
    assert_abs_diff_eq!(res.length, 0.16, epsilon = 0.015);
    assert_abs_diff_eq!(res.width, 0.10, epsilon = 0.015);
    assert_abs_diff_eq!(res.height, 0.06, epsilon = 0.01);
}

#[test]
fn test_plane_is_the_table_not_the_box_top() {
    // A wide box top is a big plane too; the table behind it must win.
    let scene = SceneBuilder::default().box_size(0.30, 0.25, 0.05);
    let cloud = scene.build(&mut StdRng::seed_from_u64(0));
    let cfg = config();

    let estimate = PlaneEstimator::new(&cfg)
        .unwrap()
        .estimate(&cloud, &mut StdRng::seed_from_u64(1))
        .unwrap()
        .unwrap();

    assert_eq!(estimate.tier, PlaneTier::Strict);
    assert_abs_diff_eq!(estimate.plane.d, 0.8, epsilon = 1e-9);
    assert_abs_diff_eq!(estimate.plane.normal.z, -1.0, epsilon = 1e-9);
}

#[test]
fn test_aabb_on_rotated_box_is_wider() {
    let scene = SceneBuilder::default().yaw_deg(45.0);
    let frame = SyntheticSource::new(scene, 0).read().unwrap();

    let obb = Pipeline::with_config(config()).process(&frame).unwrap().0;
    let aabb_cfg = DimsConfig {
        bbox_type: BBoxType::Aabb,
        ..config()
    };
    let aabb = Pipeline::with_config(aabb_cfg).process(&frame).unwrap().0;

    assert_eq!(aabb.bbox_type, BBoxType::Aabb);
    assert!(aabb.width > obb.width + 0.02);
    assert_abs_diff_eq!(obb.width, 0.12, epsilon = 0.01);
}

#[test]
fn test_replayed_recording_measures_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let mut live = SyntheticSource::new(SceneBuilder::default(), 5).with_limit(2);
    let pipeline = Pipeline::with_config(config());

    let mut live_results = Vec::new();
    for i in 0..2 {
        let frame = live.read().unwrap();
        let (res, _) = pipeline.process(&frame).unwrap();
        let meta = ArchiveMeta {
            timestamp_ns: frame.timestamp_ns,
            dims: Some([res.length, res.width, res.height]),
            ..ArchiveMeta::default()
        };
        save_point_set(dir.path(), &format!("rec_{}", i), &frame.cloud, &meta).unwrap();
        live_results.push(res);
    }

    let mut replay = ReplaySource::open(dir.path(), false).unwrap();
    for expected in &live_results {
        let (res, _) = pipeline.process(&replay.read().unwrap()).unwrap();
        assert_eq!(&res, expected);
    }
}
