//! End-to-end shadow pass over a minimal scene
//!
//! Drives the full per-frame order - transform update, LOD selection,
//! shadow pipeline - against the recording GPU context and checks what a
//! lit pass would consume: a populated shadow map, a shadow matrix that
//! lands scene geometry inside texture space, and the scene deltas.

use approx::assert_relative_eq;
use umbra_engine::prelude::*;

fn frame(
    tree: &mut SceneTree,
    scene: &Scene,
    camera: NodeId,
    shadows: &mut ShadowPipeline,
    gpu: &mut RecordingContext,
) {
    tree.update_world_all();
    let position = tree.get(camera).unwrap().world_matrix().translation_part();
    tree.camera_mut(camera).unwrap().place(position);
    let view = tree.camera(camera).unwrap().view_matrix();
    tree.update_lods(&view);
    shadows.render(tree, scene, camera, gpu).unwrap();
}

#[test]
fn directional_light_populates_a_shadow_map() {
    let mut tree = SceneTree::new();
    let mut scene = Scene::new();
    let root = tree.root();

    let mut camera_data =
        CameraData::perspective(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 500.0);
    camera_data.target = Vec3::zeros();
    let camera = tree.spawn(root, NodeKind::Camera(camera_data)).unwrap();
    tree.get_mut(camera).unwrap().transform = Transform::from_position(Vec3::new(0.0, 2.0, 15.0));

    let mesh = tree
        .spawn(root, NodeKind::Mesh(MeshData::buffer(GeometryHandle(0), 36, 1.5)))
        .unwrap();
    tree.get_mut(mesh).unwrap().transform = Transform::from_position(Vec3::new(0.0, 1.0, 0.0));
    scene.add_object(&mut tree, mesh);

    let mut sun = Light::directional(Vec3::new(1.0, 1.0, 0.95), 1.2);
    sun.cast_shadow = true;
    let sun = tree.spawn(root, NodeKind::Light(sun)).unwrap();
    tree.get_mut(sun).unwrap().transform =
        Transform::from_position(Vec3::new(60.0, 120.0, 40.0));
    scene.add_object(&mut tree, sun);

    let mut gpu = RecordingContext::new();
    let mut shadows = ShadowPipeline::new(PipelineConfig::enabled(), &mut gpu);

    frame(&mut tree, &scene, camera, &mut shadows, &mut gpu);

    // One depth target, populated by exactly the one caster
    let map = tree
        .light(sun)
        .unwrap()
        .shadow_map()
        .expect("first pass acquires shadow resources");
    assert_eq!(gpu.targets.len(), 1);
    assert_eq!(gpu.draws_to(map), 1);

    // The shadow matrix lands the mesh's world-space bounding center in
    // [0, 1] texture space
    let world_center = tree.get(mesh).unwrap().world_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    let projected = tree.light(sun).unwrap().shadow_matrix() * world_center;
    let texel = projected / projected.w;
    for component in [texel.x, texel.y, texel.z] {
        assert!(
            (0.0..=1.0).contains(&component),
            "shadow-space coordinate {component} outside [0, 1]"
        );
    }

    // Deltas are consumed by the renderer, once
    let (added, removed) = scene.take_deltas();
    assert_eq!(added, vec![mesh]);
    assert!(removed.is_empty());
    let (added, removed) = scene.take_deltas();
    assert!(added.is_empty() && removed.is_empty());
}

#[test]
fn cascaded_scene_is_stable_across_frames() {
    let mut tree = SceneTree::new();
    let mut scene = Scene::new();
    let root = tree.root();

    let mut camera_data = CameraData::perspective(1.0, 1.0, 0.1, 1000.0);
    camera_data.target = Vec3::zeros();
    let camera = tree.spawn(root, NodeKind::Camera(camera_data)).unwrap();
    tree.get_mut(camera).unwrap().transform = Transform::from_position(Vec3::new(0.0, 10.0, 40.0));

    // A two-level LOD around the origin
    let lod = tree.spawn(root, NodeKind::Lod(LodData::new())).unwrap();
    let near_level = tree.insert(NodeKind::Mesh(MeshData::buffer(GeometryHandle(1), 36, 2.0)));
    let far_level = tree.insert(NodeKind::Mesh(MeshData::buffer(GeometryHandle(2), 12, 2.0)));
    tree.add_lod_level(lod, near_level, 0.0).unwrap();
    tree.add_lod_level(lod, far_level, 200.0).unwrap();
    scene.add_object(&mut tree, lod);

    let mut sun = Light::directional(Vec3::new(1.0, 1.0, 1.0), 1.0);
    sun.cast_shadow = true;
    sun.shadow_cascade = true;
    let sun = tree.spawn(root, NodeKind::Light(sun)).unwrap();
    tree.get_mut(sun).unwrap().transform = Transform::from_position(Vec3::new(0.0, 200.0, 100.0));
    scene.add_object(&mut tree, sun);

    let mut gpu = RecordingContext::new();
    let mut shadows = ShadowPipeline::new(PipelineConfig::enabled(), &mut gpu);

    for _ in 0..3 {
        frame(&mut tree, &scene, camera, &mut shadows, &mut gpu);
    }

    // Cascade expansion happened exactly once
    let virtuals = tree.light(sun).unwrap().virtual_lights().to_vec();
    assert_eq!(virtuals.len(), 2);
    assert_eq!(gpu.targets.len(), 2);

    // The camera at 41-ish units selects the near level only
    assert!(tree.get(near_level).unwrap().visible);
    assert!(!tree.get(far_level).unwrap().visible);

    // Each virtual light carries its own matrix
    let matrix_a = tree.light(virtuals[0]).unwrap().shadow_matrix();
    let matrix_b = tree.light(virtuals[1]).unwrap().shadow_matrix();
    assert_ne!(matrix_a, matrix_b);
    assert_relative_eq!(matrix_a[(3, 3)], matrix_b[(3, 3)], epsilon = 1e-6);
}
