#![allow(clippy::unwrap_used)]

use std::fs::{self, File};
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};

use cranium::config::PipelineConfig;
use cranium::error::{RenderError, VolumeError};
use cranium::pipeline::Pipeline;
use cranium::scene::{Material, ObjectKind, SceneStore};
use cranium::CraniumError;

const SIDE: u32 = 12;

/// Writes a `SIDE`³ stack: bright everywhere except a dark block spanning
/// voxels 4..8 on every axis (or uniformly bright when `dark_block` is off).
fn write_scan(path: &Path, dark_block: bool) {
    let mut file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(&mut file).unwrap();
    for z in 0..SIDE {
        let page: Vec<u16> = (0..SIDE * SIDE)
            .map(|i| {
                let (y, x) = (i / SIDE, i % SIDE);
                let inside = [z, y, x].iter().all(|c| (4..8).contains(c));
                if dark_block && inside {
                    1_000
                } else {
                    60_000
                }
            })
            .collect();
        encoder
            .write_image::<colortype::Gray16>(SIDE, SIDE, &page)
            .unwrap();
    }
}

fn sharp_config(output_dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.extraction.downsample = 1;
    config.extraction.threshold = 0.5;
    config.extraction.smoothing_sigma = 0.0;
    config.extraction.closing_radius = 0;
    config.render.width = 24;
    config.render.height = 18;
    config.export.output_dir = output_dir.to_path_buf();
    config
}

fn small_scene() -> SceneStore {
    SceneStore::with_size(24, 18).unwrap()
}

#[test]
fn reconstructs_and_renders_every_view() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.tif");
    write_scan(&input, true);
    let out = dir.path().join("save");
    let mut config = sharp_config(&out);
    config.export.stl = Some(dir.path().join("skull.stl"));

    let mut scene = small_scene();
    let report = Pipeline::new(config).run(&input, &mut scene).unwrap();

    assert!(!report.used_fallback());
    assert_eq!(report.volume_shape, [12, 12, 12]);
    assert_eq!(report.stats.source_shape, [12, 12, 12]);
    assert!(report.face_count > 0);

    let names: Vec<_> = report
        .images
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        ["Sagittal_Cam.png", "Coronal_Cam.png", "Axial_Cam.png", "Perspective_Cam.png"]
    );
    for path in &report.images {
        let img = image::open(path).unwrap();
        assert_eq!((img.width(), img.height()), (24, 18));
    }

    let stl = report.stl.unwrap();
    let expected = 84 + 50 * report.face_count as u64;
    assert_eq!(fs::metadata(stl).unwrap().len(), expected);

    let object = scene.mesh_object(report.object).unwrap();
    assert_eq!(object.mesh.faces.len(), report.face_count);
    assert_eq!(object.modifiers.len(), 3);
}

#[test]
fn uniform_scan_falls_back_to_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("flat.tif");
    write_scan(&input, false);

    let mut scene = small_scene();
    let report = Pipeline::new(sharp_config(&dir.path().join("save")))
        .run(&input, &mut scene)
        .unwrap();

    assert!(report.used_fallback());
    assert!(report.stats.degenerate);
    assert_eq!((report.vertex_count, report.face_count), (8, 12));
    assert_eq!(report.images.len(), 4);

    let object = scene.mesh_object(report.object).unwrap();
    assert_eq!(object.material, Some(Material::default()));
    assert!(object.smooth_shading);
    assert_eq!(object.modifiers.len(), 3);
}

#[test]
fn stl_inside_fresh_output_dir_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.tif");
    write_scan(&input, true);
    let out = dir.path().join("fresh");
    let mut config = sharp_config(&out);
    config.export.stl = Some(out.join("meshes/skull.stl"));

    let mut scene = small_scene();
    let report = Pipeline::new(config).run(&input, &mut scene).unwrap();

    let stl = report.stl.unwrap();
    assert!(stl.starts_with(&out));
    assert_eq!(fs::metadata(&stl).unwrap().len(), 84 + 50 * report.face_count as u64);
    assert_eq!(report.images.len(), 4);
}

#[test]
fn missing_scan_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = small_scene();
    let err = Pipeline::new(sharp_config(dir.path()))
        .run(&dir.path().join("missing.tif"), &mut scene)
        .unwrap_err();
    assert!(matches!(err, CraniumError::Volume(VolumeError::NotFound(_))));
    assert!(scene.is_empty());
}

#[test]
fn unwritable_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.tif");
    write_scan(&input, true);
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"file").unwrap();

    let mut scene = small_scene();
    let err = Pipeline::new(sharp_config(&blocker.join("save")))
        .run(&input, &mut scene)
        .unwrap_err();
    assert!(matches!(err, CraniumError::Render(RenderError::OutputDir { .. })));
}

#[test]
fn invalid_threshold_is_rejected_before_loading() {
    let mut config = PipelineConfig::default();
    config.extraction.threshold = 1.5;
    let mut scene = small_scene();
    let err = Pipeline::new(config)
        .run(Path::new("missing.tif"), &mut scene)
        .unwrap_err();
    assert!(matches!(err, CraniumError::Extraction(_)));
}

#[test]
fn scene_holds_skull_lights_and_cameras() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.tif");
    write_scan(&input, true);

    let mut scene = small_scene();
    Pipeline::new(sharp_config(&dir.path().join("save")))
        .run(&input, &mut scene)
        .unwrap();

    let (mut meshes, mut lights, mut cameras) = (0, 0, 0);
    for (_, object) in scene.objects() {
        match object.kind {
            ObjectKind::Mesh(_) => meshes += 1,
            ObjectKind::Light(_) => lights += 1,
            ObjectKind::Camera(_) => cameras += 1,
        }
    }
    assert_eq!((meshes, lights, cameras), (1, 3, 4));
    let active = scene.active_camera().unwrap();
    assert_eq!(scene.object(active).unwrap().name, "Perspective_Cam");
}
