//! Frame loop behavior against the headless backend.

use std::cell::Cell;

use glam::{Quat, Vec3, Vec4};
use raymarch_engine::backend::{BackendError, HeadlessBackend, HeadlessLimits};
use raymarch_engine::contract::{KernelFlags, SlotSet, WorkgroupGrid, WorkgroupSize};
use raymarch_engine::coords::Resolution;
use raymarch_engine::logging::{init_logging, LoggingConfig};
use raymarch_engine::render::{FrameOutcome, RenderError, RenderErrorKind, SkipReason};
use raymarch_engine::scene::{Camera, Light, Scene, SceneQuery, Shape, ShapeKind};
use raymarch_engine::{RayMarcher, RenderConfig};

fn camera() -> Camera {
    Camera::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::Y, 60.0)
}

fn scene_with(count: usize) -> Scene {
    let mut scene = Scene::new(camera());
    for i in 0..count {
        scene = scene.with_shape(
            Shape::new(ShapeKind::Sphere).with_position(Vec3::new(i as f32 * 2.0, 0.0, 0.0)),
        );
    }
    scene
}

fn backend(lighting: bool) -> HeadlessBackend {
    init_logging(LoggingConfig::for_tests());
    HeadlessBackend::new().with_raymarch_kernel(lighting)
}

#[test]
fn grid_covers_800_by_600() {
    let mut backend = backend(false);
    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());

    let outcome = marcher.render_frame(&scene_with(1), Resolution::new(800, 600));
    assert_eq!(outcome.grid(), Some(WorkgroupGrid { x: 25, y: 38, z: 1 }));
}

#[test]
fn end_to_end_single_shape() {
    let mut backend = backend(false);
    let scene = Scene::new(camera()).with_shape(
        Shape::new(ShapeKind::Box).with_scale(Vec3::splat(2.0)),
    );

    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());
    let outcome = marcher.render_frame(&scene, Resolution::new(64, 64));
    drop(marcher);

    assert_eq!(outcome.grid().map(|g| g.to_array()), Some([2, 4, 1]));

    let record = backend.last_dispatch().unwrap();
    assert_eq!(record.params.shape_count, 1);
    assert_eq!(record.params.resolution, [64, 64]);
    assert_eq!(record.resolution, Resolution::new(64, 64));
    assert_eq!(record.camera.position, [0.0, 0.0, -5.0]);

    let shape = &record.shapes[0];
    assert_eq!(shape.size, [1.0, 1.0, 1.0]);
    let local_origin = shape.inverse_transform() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!(local_origin.abs_diff_eq(Vec4::W, 1e-6));
}

#[test]
fn uploaded_tangent_matches_field_of_view() {
    for fov in [30.0f32, 60.0, 90.0, 110.0] {
        let mut backend = backend(false);
        let mut scene = scene_with(1);
        scene.camera.fov_y_degrees = fov;

        let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());
        marcher.render_frame(&scene, Resolution::new(32, 32));
        drop(marcher);

        let expected = (fov * std::f32::consts::PI / 360.0).tan();
        let tangent = backend.last_dispatch().unwrap().params.tangent;
        assert!((tangent - expected).abs() < 1e-5, "fov {fov}: {tangent} != {expected}");
    }
}

#[test]
fn resizes_keep_exactly_one_live_set() {
    let mut backend = backend(false);
    let scene = scene_with(2);
    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());

    let sizes = [(640, 480), (800, 600), (800, 600), (1024, 768), (1, 1), (1920, 1080)];
    let mut last_generation = 0;
    for (w, h) in sizes {
        let outcome = marcher.render_frame(&scene, Resolution::new(w, h));
        let FrameOutcome::Dispatched { generation, recreated, .. } = outcome else {
            panic!("frame at {w}x{h} skipped: {outcome:?}");
        };
        assert_eq!(recreated, generation != last_generation);
        last_generation = generation;

        let ledger = marcher.backend().ledger();
        assert_eq!(ledger.live_images(), 1);
        assert_eq!(ledger.live_buffers(), 2);
        assert_eq!(ledger.invalid_releases, 0);
    }
    assert_eq!(last_generation, 5);
    drop(marcher);

    let ledger = backend.ledger();
    assert_eq!(ledger.images_created, 5);
    assert!(ledger.is_balanced());
}

#[test]
fn shape_count_change_resizes_shape_buffer() {
    let mut backend = backend(false);
    let res = Resolution::new(128, 128);
    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());

    for count in [1usize, 4, 4, 2, 7] {
        let outcome = marcher.render_frame(&scene_with(count), res);
        assert!(outcome.is_dispatched());

        let set = marcher.resources().buffer_set().unwrap();
        assert_eq!(set.shape_capacity as usize, count);
        assert_eq!(
            marcher.backend().buffer_size(set.shapes),
            Some(count as u64 * 176)
        );
        assert_eq!(marcher.resources().last_shape_count(), Some(count as u32));
    }
    drop(marcher);
    assert!(backend.ledger().is_balanced());
}

#[test]
fn zero_shapes_still_dispatch() {
    let mut backend = backend(false);
    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());

    let outcome = marcher.render_frame(&scene_with(0), Resolution::new(64, 64));
    assert!(matches!(outcome, FrameOutcome::Dispatched { shape_count: 0, .. }));

    let set = marcher.resources().buffer_set().unwrap();
    assert_eq!(marcher.backend().buffer_size(set.shapes), Some(176));
    drop(marcher);

    let record = backend.last_dispatch().unwrap();
    assert!(record.shapes.is_empty());
    assert_eq!(record.params.shape_count, 0);
}

#[test]
fn teardown_releases_everything_once() {
    let mut backend = backend(true);
    {
        let scene = scene_with(3).with_light(Light::point(Vec3::Y, 10.0));
        let mut marcher =
            RayMarcher::new(&mut backend, RenderConfig::default().with_lighting(true));
        for i in 1..=10u32 {
            marcher.render_frame(&scene, Resolution::new(100 + i, 50 + i));
        }
        marcher.release_resources();
        marcher.render_frame(&scene, Resolution::new(10, 10));
    }

    let ledger = backend.ledger();
    assert_eq!(ledger.images_created, 11);
    assert_eq!(ledger.buffers_created, 33);
    assert!(ledger.is_balanced(), "{ledger:?}");
}

#[test]
fn missing_kernel_disables_rendering() {
    init_logging(LoggingConfig::for_tests());
    let mut backend = HeadlessBackend::new();
    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());

    assert!(!marcher.is_enabled());
    let reason = marcher.disabled_reason().unwrap();
    assert_eq!(reason, &RenderError::KernelNotFound("RayMarch".to_string()));
    assert_eq!(reason.kind(), RenderErrorKind::Configuration);

    for _ in 0..3 {
        assert_eq!(
            marcher.render_frame(&scene_with(1), Resolution::new(64, 64)),
            FrameOutcome::Skipped(SkipReason::KernelUnavailable)
        );
    }
    assert!(marcher.output_image().is_none());
    drop(marcher);
    assert_eq!(backend.ledger().images_created, 0);
}

#[test]
fn kernel_without_light_slot_rejects_lighting() {
    let mut backend = backend(false);
    let marcher = RayMarcher::new(&mut backend, RenderConfig::default().with_lighting(true));

    assert!(!marcher.is_enabled());
    assert!(matches!(
        marcher.disabled_reason(),
        Some(RenderError::Contract { .. })
    ));
}

#[test]
fn kernel_declaring_extra_slots_is_rejected() {
    init_logging(LoggingConfig::for_tests());
    let mut backend = HeadlessBackend::new().with_kernel(
        "RayMarch",
        WorkgroupSize::RAYMARCH,
        SlotSet::required(true),
    );
    let marcher = RayMarcher::new(&mut backend, RenderConfig::default());
    assert!(!marcher.is_enabled());
}

#[test]
fn custom_workgroup_size_drives_grid() {
    init_logging(LoggingConfig::for_tests());
    let mut backend = HeadlessBackend::new().with_kernel(
        "Preview",
        WorkgroupSize { x: 8, y: 8, z: 1 },
        SlotSet::required(false),
    );
    let mut marcher = RayMarcher::new(
        &mut backend,
        RenderConfig::default().with_kernel_name("Preview"),
    );

    let outcome = marcher.render_frame(&scene_with(1), Resolution::new(100, 60));
    assert_eq!(outcome.grid().map(|g| g.to_array()), Some([13, 8, 1]));
}

#[test]
fn allocation_failure_skips_then_recovers() {
    let mut backend = backend(false);
    backend.fail_next_allocations(2);
    let scene = scene_with(1);
    let res = Resolution::new(64, 64);

    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());

    // both attempts fail on their first allocation
    for _ in 0..2 {
        assert_eq!(
            marcher.render_frame(&scene, res),
            FrameOutcome::Skipped(SkipReason::ResourceAllocation)
        );
        assert!(marcher.output_image().is_none());
        assert_eq!(marcher.backend().ledger().live_images(), 0);
        assert_eq!(marcher.backend().ledger().live_buffers(), 0);
    }

    let outcome = marcher.render_frame(&scene, res);
    assert!(matches!(
        outcome,
        FrameOutcome::Dispatched { generation: 1, recreated: true, .. }
    ));
    assert_eq!(marcher.output_image().map(|o| o.resolution), Some(res));
    drop(marcher);

    assert_eq!(backend.dispatches().len(), 1);
    assert!(backend.ledger().is_balanced());
}

#[test]
fn resolution_beyond_limits_is_retried() {
    init_logging(LoggingConfig::for_tests());
    let mut backend = HeadlessBackend::new()
        .with_limits(HeadlessLimits {
            max_image_dimension: 1024,
            ..HeadlessLimits::default()
        })
        .with_raymarch_kernel(false);
    let scene = scene_with(1);
    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());

    assert!(marcher.render_frame(&scene, Resolution::new(512, 512)).is_dispatched());
    assert_eq!(
        marcher.render_frame(&scene, Resolution::new(4096, 512)),
        FrameOutcome::Skipped(SkipReason::ResourceAllocation)
    );
    // the old set was released before the failed attempt
    assert!(marcher.output_image().is_none());

    let outcome = marcher.render_frame(&scene, Resolution::new(1024, 1024));
    assert!(matches!(outcome, FrameOutcome::Dispatched { generation: 2, .. }));
    drop(marcher);
    assert!(backend.ledger().is_balanced());
}

#[test]
fn empty_output_keeps_existing_set() {
    let mut backend = backend(false);
    let scene = scene_with(1);
    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());

    marcher.render_frame(&scene, Resolution::new(320, 240));
    let before = marcher.output_image().unwrap();

    for res in [Resolution::new(0, 240), Resolution::new(320, 0), Resolution::new(0, 0)] {
        assert_eq!(
            marcher.render_frame(&scene, res),
            FrameOutcome::Skipped(SkipReason::EmptyOutput)
        );
    }
    assert_eq!(marcher.output_image(), Some(before));

    let outcome = marcher.render_frame(&scene, Resolution::new(320, 240));
    assert!(matches!(outcome, FrameOutcome::Dispatched { recreated: false, .. }));
    drop(marcher);
    assert_eq!(backend.ledger().images_created, 1);
}

#[test]
fn output_image_generation_tracks_recreation() {
    let mut backend = backend(false);
    let scene = scene_with(1);
    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());
    assert!(marcher.output_image().is_none());

    marcher.render_frame(&scene, Resolution::new(64, 64));
    let first = marcher.output_image().unwrap();
    marcher.render_frame(&scene, Resolution::new(64, 64));
    assert_eq!(marcher.output_image(), Some(first));

    marcher.render_frame(&scene, Resolution::new(96, 64));
    let second = marcher.output_image().unwrap();
    assert_ne!(first.handle, second.handle);
    assert_eq!(second.generation, first.generation + 1);
    assert_eq!(
        marcher.backend().image_resolution(second.handle),
        Some(Resolution::new(96, 64))
    );
}

#[test]
fn lighting_uploads_light_or_zeroes() {
    let mut backend = backend(true);
    let spot = Light::spot(Vec3::new(0.0, 4.0, 0.0), Quat::IDENTITY, 25.0, 90.0);
    let lit = scene_with(1).with_light(spot);
    let dark = scene_with(1);

    let mut marcher =
        RayMarcher::new(&mut backend, RenderConfig::default().with_lighting(true));
    marcher.render_frame(&lit, Resolution::new(16, 16));
    marcher.render_frame(&dark, Resolution::new(16, 16));
    drop(marcher);

    let [lit_frame, dark_frame] = backend.dispatches() else {
        panic!("expected two dispatches");
    };

    let light = lit_frame.light.unwrap();
    assert_eq!(light.range, 25.0);
    assert!((light.cos_half_spot - 45f32.to_radians().cos()).abs() < 1e-6);
    assert!(lit_frame.params.flags().contains(KernelFlags::LIGHT_PRESENT));

    assert_eq!(dark_frame.light.map(|l| l.range), Some(0.0));
    assert!(!dark_frame.params.flags().contains(KernelFlags::LIGHT_PRESENT));
}

#[test]
fn light_is_ignored_without_lighting() {
    let mut backend = backend(false);
    let scene = scene_with(1).with_light(Light::point(Vec3::ONE, 3.0));
    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());
    marcher.render_frame(&scene, Resolution::new(16, 16));
    drop(marcher);

    let record = backend.last_dispatch().unwrap();
    assert_eq!(record.light, None);
    assert!(!record.params.flags().contains(KernelFlags::LIGHT_PRESENT));
    assert_eq!(backend.ledger().buffers_created, 2);
}

#[test]
fn dispatch_failure_drops_frame_then_recovers() {
    let mut backend = backend(false);
    backend.fail_next_dispatches(1);
    let scene = scene_with(1);
    let res = Resolution::new(64, 64);

    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());
    assert_eq!(
        marcher.render_frame(&scene, res),
        FrameOutcome::Skipped(SkipReason::DispatchFailed)
    );
    // the Buffer Set survives a failed dispatch
    assert_eq!(marcher.output_image().map(|o| o.generation), Some(1));

    let outcome = marcher.render_frame(&scene, res);
    assert!(matches!(
        outcome,
        FrameOutcome::Dispatched { generation: 1, recreated: false, .. }
    ));
    assert_eq!(outcome.grid().map(|g| g.to_array()), Some([2, 4, 1]));
    drop(marcher);

    assert_eq!(backend.dispatches().len(), 1);
    assert_eq!(backend.ledger().images_created, 1);
    assert!(backend.ledger().is_balanced());
}

struct CountingScene {
    scene: Scene,
    shapes: Cell<u32>,
    camera: Cell<u32>,
    light: Cell<u32>,
}

impl SceneQuery for CountingScene {
    fn shapes(&self) -> &[Shape] {
        self.shapes.set(self.shapes.get() + 1);
        &self.scene.shapes
    }

    fn camera(&self) -> &Camera {
        self.camera.set(self.camera.get() + 1);
        &self.scene.camera
    }

    fn light(&self) -> Option<&Light> {
        self.light.set(self.light.get() + 1);
        self.scene.light.as_ref()
    }
}

#[test]
fn each_frame_queries_the_scene_once() {
    let mut backend = backend(true);
    let scene = CountingScene {
        scene: scene_with(2).with_light(Light::point(Vec3::ONE, 3.0)),
        shapes: Cell::new(0),
        camera: Cell::new(0),
        light: Cell::new(0),
    };
    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default().with_lighting(true));
    for _ in 0..3 {
        assert!(matches!(
            marcher.render_frame(&scene, Resolution::new(32, 32)),
            FrameOutcome::Dispatched { shape_count: 2, .. }
        ));
    }
    drop(marcher);

    assert_eq!(scene.shapes.get(), 3);
    assert_eq!(scene.camera.get(), 3);
    assert_eq!(scene.light.get(), 3);
    assert!(backend.last_dispatch().unwrap().light.is_some());
}

#[test]
fn dispatch_errors_are_classified() {
    let err = BackendError::UnboundSlot("shapes");
    let wrapped = RenderError::Dispatch(err.clone());
    assert_eq!(wrapped.kind(), RenderErrorKind::Dispatch);
    assert_eq!(
        wrapped.to_string(),
        format!("dispatch failed: {err}")
    );
}

#[test]
fn shapes_reach_the_kernel_in_scene_order() {
    let mut backend = backend(false);
    let scene = Scene::new(camera())
        .with_shape(Shape::new(ShapeKind::Torus))
        .with_shape(Shape::new(ShapeKind::Sphere).with_reflective(true))
        .with_shape(Shape::new(ShapeKind::Cylinder));

    let mut marcher = RayMarcher::new(&mut backend, RenderConfig::default());
    marcher.render_frame(&scene, Resolution::new(32, 32));
    drop(marcher);

    let record = backend.last_dispatch().unwrap();
    let kinds: Vec<u32> = record.shapes.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        [ShapeKind::Torus.tag(), ShapeKind::Sphere.tag(), ShapeKind::Cylinder.tag()]
    );
    assert!(record.shapes[1].is_reflective());
}
