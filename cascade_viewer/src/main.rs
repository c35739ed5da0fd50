//! Cascade viewer demo
//!
//! Builds a small scene - a cascaded sun, a spot light, a skinned mesh, a
//! two-level LOD - and runs a few frames through the shadow pipeline
//! against the recording GPU context, logging what each frame submitted.
//! Run with `RUST_LOG=debug` to watch the pipeline acquire its resources
//! on the first frame and reuse them afterwards.

use umbra_engine::prelude::*;

fn build_scene(tree: &mut SceneTree, scene: &mut Scene) -> (NodeId, NodeId, NodeId) {
    let root = tree.root();

    // Viewing camera
    let mut camera_data =
        CameraData::perspective(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 600.0);
    camera_data.target = Vec3::zeros();
    let camera = tree
        .spawn(root, NodeKind::Camera(camera_data))
        .expect("attach camera");
    tree.get_mut(camera).expect("camera node").transform =
        Transform::from_position(Vec3::new(0.0, 6.0, 30.0));

    // Ground plane and a pillar
    let ground = tree
        .spawn(root, NodeKind::Mesh(MeshData::buffer(GeometryHandle(0), 6, 60.0)))
        .expect("attach ground");
    tree.get_mut(ground).expect("ground node").transform =
        Transform::from_position(Vec3::new(0.0, -1.0, 0.0));

    let pillar = tree
        .spawn(root, NodeKind::Mesh(MeshData::buffer(GeometryHandle(1), 36, 2.0)))
        .expect("attach pillar");
    tree.get_mut(pillar).expect("pillar node").transform =
        Transform::from_position(Vec3::new(4.0, 2.0, 0.0));

    // A two-bone skinned figure
    let skin = SkinData::new(MeshData::buffer(GeometryHandle(2), 96, 3.0));
    let figure = tree
        .spawn(root, NodeKind::SkinnedMesh(skin))
        .expect("attach figure");
    tree.get_mut(figure).expect("figure node").transform =
        Transform::from_position(Vec3::new(-3.0, 0.0, 2.0));
    let hip = tree
        .add_bone(figure, figure, Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))
        .expect("add hip bone");
    tree.add_bone(figure, hip, Transform::from_position(Vec3::new(0.0, 1.2, 0.0)))
        .expect("add chest bone");

    // LOD with a detailed and a coarse level
    let lod = tree
        .spawn(root, NodeKind::Lod(LodData::new()))
        .expect("attach lod");
    tree.get_mut(lod).expect("lod node").transform =
        Transform::from_position(Vec3::new(0.0, 0.0, -40.0));
    let detailed = tree.insert(NodeKind::Mesh(MeshData::buffer(GeometryHandle(3), 288, 2.5)));
    let coarse = tree.insert(NodeKind::Mesh(MeshData::buffer(GeometryHandle(4), 24, 2.5)));
    tree.add_lod_level(lod, detailed, 0.0).expect("near level");
    tree.add_lod_level(lod, coarse, 120.0).expect("far level");

    scene.add_object(tree, ground);
    scene.add_object(tree, pillar);
    scene.add_object(tree, figure);
    scene.add_object(tree, lod);

    // Cascaded sun
    let mut sun = Light::directional(Vec3::new(1.0, 0.98, 0.92), 1.4);
    sun.cast_shadow = true;
    sun.shadow_cascade = true;
    let sun = tree
        .spawn(root, NodeKind::Light(sun))
        .expect("attach sun");
    tree.get_mut(sun).expect("sun node").transform =
        Transform::from_position(Vec3::new(80.0, 150.0, 60.0));
    scene.add_object(tree, sun);

    // Spot light over the pillar
    let spot_target = tree.insert(NodeKind::Group);
    tree.get_mut(spot_target).expect("spot target").transform =
        Transform::from_position(Vec3::new(4.0, 0.0, 0.0));
    let mut spot = Light::spot(Vec3::new(0.9, 0.6, 0.3), 2.0);
    spot.cast_shadow = true;
    spot.target = Some(spot_target);
    let spot = tree
        .spawn(root, NodeKind::Light(spot))
        .expect("attach spot");
    tree.get_mut(spot).expect("spot node").transform =
        Transform::from_position(Vec3::new(4.0, 12.0, 6.0));
    scene.add_object(tree, spot);

    (camera, sun, spot)
}

fn main() {
    logging::init();
    log::info!("Building demo scene...");

    let mut tree = SceneTree::new();
    let mut scene = Scene::new();
    let (camera, sun, spot) = build_scene(&mut tree, &mut scene);

    let mut gpu = RecordingContext::new();
    let mut shadows = ShadowPipeline::new(PipelineConfig::enabled(), &mut gpu);

    log::info!(
        "Scene ready: {} nodes, {} renderables, {} lights",
        tree.len(),
        scene.renderables().len(),
        scene.lights().len()
    );

    for frame in 0..4 {
        // Orbit the camera a little each frame
        let angle = frame as f32 * 0.2;
        tree.get_mut(camera).expect("camera node").transform.position =
            Vec3::new(30.0 * angle.sin(), 6.0, 30.0 * angle.cos());

        let draws_before = gpu.draws.len();

        tree.update_world_all();
        let position = tree
            .get(camera)
            .expect("camera node")
            .world_matrix()
            .translation_part();
        tree.camera_mut(camera).expect("camera data").place(position);
        let view = tree.camera(camera).expect("camera data").view_matrix();
        tree.update_lods(&view);
        shadows
            .render(&mut tree, &scene, camera, &mut gpu)
            .expect("shadow pass");

        let (added, removed) = scene.take_deltas();
        log::info!(
            "frame {frame}: {} shadow draws, {} targets alive, +{}/-{} scene deltas",
            gpu.draws.len() - draws_before,
            gpu.targets.len(),
            added.len(),
            removed.len()
        );
    }

    let virtuals = tree
        .light(sun)
        .expect("sun light")
        .virtual_lights()
        .len();
    log::info!("sun expanded into {virtuals} cascade lights");
    log::info!(
        "spot shadow map: {:?}",
        tree.light(spot).expect("spot light").shadow_map()
    );
    log::info!("total draws recorded: {}", gpu.draws.len());
}
