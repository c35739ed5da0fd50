//! Shadow-map rendering pipeline
//!
//! Runs once per frame, after the transform hierarchy has fully settled.
//! For every shadow-casting light the pipeline lazily acquires a depth
//! render target and a shadow camera, places the camera at the light,
//! culls the scene's renderables against the camera's frustum, and draws
//! the survivors with a depth-only material. Cascaded directional lights
//! are expanded into per-cascade virtual lights first; each virtual light
//! then flows through the same per-light path.
//!
//! Per-light ordering is fixed: re-targeting precedes camera placement,
//! placement precedes shadow-matrix computation and culling. Global render
//! state is restored once after the last light.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::config::PipelineConfig;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::camera::{CameraData, Projection};
use crate::render::depth_material::{DepthFeatures, DepthMaterialSet};
use crate::render::frustum::{slice_corners, Frustum};
use crate::render::gpu::{GpuContext, TargetFormat};
use crate::scene::graph::Scene;
use crate::scene::light::{Light, LightKind, ShadowResources, VirtualSource};
use crate::scene::mesh::{Geometry, MeshData};
use crate::scene::node::{CameraHelperData, NodeId, NodeKind, SceneError, SceneTree};

/// Errors raised by the shadow pipeline
#[derive(Error, Debug)]
pub enum ShadowError {
    /// A scene-tree operation failed
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// A light reached the render stage without its lazy resources
    #[error("light {0:?} reached rendering without shadow resources")]
    MissingResources(NodeId),
}

/// Per-frame shadow-map renderer
///
/// Owns the four depth-material variants and the per-light caster lists.
/// Shadow cameras, render targets, and virtual lights live on their lights
/// and are reused across frames; steady-state frames allocate nothing new.
pub struct ShadowPipeline {
    config: PipelineConfig,
    materials: DepthMaterialSet,
    casters: HashMap<NodeId, Vec<NodeId>>,
    process_list: Vec<NodeId>,
    unsupported_warned: HashSet<NodeId>,
}

impl ShadowPipeline {
    /// Create a pipeline, compiling the depth-material variants up front
    pub fn new(config: PipelineConfig, gpu: &mut dyn GpuContext) -> Self {
        Self {
            config,
            materials: DepthMaterialSet::compile(gpu),
            casters: HashMap::new(),
            process_list: Vec::new(),
            unsupported_warned: HashSet::new(),
        }
    }

    /// The pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Objects included in a light's most recent shadow pass
    ///
    /// Lists are rebuilt from scratch every frame, so an object that left
    /// a light's pass never lingers with stale inclusion state.
    pub fn casters(&self, light: NodeId) -> &[NodeId] {
        self.casters.get(&light).map_or(&[], Vec::as_slice)
    }

    /// Render every shadow map for the frame
    ///
    /// `camera` is the viewing camera whose frustum drives the cascade
    /// slices. The transform hierarchy must have been updated for the
    /// whole tree before this runs.
    pub fn render(
        &mut self,
        tree: &mut SceneTree,
        scene: &Scene,
        camera: NodeId,
        gpu: &mut dyn GpuContext,
    ) -> Result<(), ShadowError> {
        if !self.config.enabled {
            return Ok(());
        }

        // Refresh the viewing camera's view matrix from its settled world
        // position; cascade fitting unprojects through it below.
        let camera_position = tree[camera].world_matrix().translation_part();
        tree.camera_mut(camera)?.place(camera_position);

        // Stage 1: expand cascaded lights into virtual lights
        let mut process = std::mem::take(&mut self.process_list);
        process.clear();
        for index in 0..scene.lights().len() {
            let light_id = scene.lights()[index];
            let (cast, kind, cascading) = match tree.light(light_id) {
                Ok(light) => (light.cast_shadow, light.kind, light.shadow_cascade),
                Err(_) => continue,
            };
            if !cast {
                continue;
            }
            match kind {
                LightKind::Point => {
                    if self.unsupported_warned.insert(light_id) {
                        log::warn!("light {light_id:?}: point lights cannot cast shadows, skipping");
                    }
                }
                LightKind::Directional if cascading => {
                    self.expand_cascades(tree, light_id, camera)?;
                    process.extend_from_slice(&tree.light(light_id)?.virtual_lights);
                }
                LightKind::Directional | LightKind::Spot => process.push(light_id),
            }
        }

        // Virtual lights hang under the viewing camera; settle their world
        // matrices before placement reads them.
        tree.update_world(camera, true);

        // Explicit reset: every caster list starts the frame empty
        for list in self.casters.values_mut() {
            list.clear();
        }

        // Stages 2-6, per light
        for index in 0..process.len() {
            self.render_light(tree, scene, camera, process[index], gpu)?;
        }
        self.process_list = process;

        // Stage 7: restore ambient render state
        gpu.set_render_target(None);
        gpu.set_clear_color(self.config.restore.clear_color);
        gpu.set_front_face(self.config.restore.front_face);
        gpu.set_cull_mode(self.config.restore.cull_mode);
        gpu.set_blending(self.config.restore.blending);

        Ok(())
    }

    /// Realize missing virtual lights and re-target the existing ones
    ///
    /// A (light, cascade) pair gets exactly one virtual light for the
    /// light's lifetime; later frames only copy position, target, bias,
    /// and the slice bounds from the real light.
    fn expand_cascades(
        &mut self,
        tree: &mut SceneTree,
        light_id: NodeId,
        camera: NodeId,
    ) -> Result<(), ShadowError> {
        let count = tree.light(light_id)?.cascade.count;

        for cascade in tree.light(light_id)?.virtual_lights.len()..count {
            self.create_virtual_light(tree, light_id, cascade, camera)?;
        }

        let position = tree[light_id].transform.position;
        for cascade in 0..count {
            let (virtual_id, target, near_z, far_z, bias) = {
                let source = tree.light(light_id)?;
                (
                    source.virtual_lights[cascade],
                    source.target,
                    source.cascade.near_z.get(cascade).copied().unwrap_or(0.0),
                    source.cascade.far_z.get(cascade).copied().unwrap_or(1.0),
                    source.cascade.bias.get(cascade).copied().unwrap_or(0.0),
                )
            };

            tree[virtual_id].transform.position = position;
            let virtual_light = tree.light_mut(virtual_id)?;
            virtual_light.target = target;
            virtual_light.cascade_slice = Some((near_z, far_z));
            virtual_light.shadow.bias = bias;
        }
        Ok(())
    }

    fn create_virtual_light(
        &mut self,
        tree: &mut SceneTree,
        light_id: NodeId,
        cascade: usize,
        camera: NodeId,
    ) -> Result<NodeId, ShadowError> {
        let source = tree.light(light_id)?.clone();

        // Small offset transform riding along with the viewing camera
        let anchor = tree.spawn(camera, NodeKind::Group)?;
        tree[anchor].transform.position = source.cascade.offset;

        let mut virtual_light = Light::directional(source.color, source.intensity);
        virtual_light.cast_shadow = true;
        virtual_light.target = source.target;
        virtual_light.shadow = source.shadow.clone();
        virtual_light.shadow.map_width = source
            .cascade
            .width
            .get(cascade)
            .copied()
            .unwrap_or(source.shadow.map_width);
        virtual_light.shadow.map_height = source
            .cascade
            .height
            .get(cascade)
            .copied()
            .unwrap_or(source.shadow.map_height);
        virtual_light.virtual_of = Some(VirtualSource {
            light: light_id,
            cascade,
        });

        let virtual_id = tree.spawn(anchor, NodeKind::Light(virtual_light))?;
        tree.light_mut(light_id)?.virtual_lights.push(virtual_id);
        log::debug!("realized cascade {cascade} of light {light_id:?} as {virtual_id:?}");
        Ok(virtual_id)
    }

    /// Stages 2-6 for one (possibly virtual) light
    fn render_light(
        &mut self,
        tree: &mut SceneTree,
        scene: &Scene,
        camera: NodeId,
        light_id: NodeId,
        gpu: &mut dyn GpuContext,
    ) -> Result<(), ShadowError> {
        // Stage 2: lazy resource acquisition
        self.ensure_resources(tree, light_id, gpu)?;
        let resources = tree
            .light(light_id)?
            .resources
            .ok_or(ShadowError::MissingResources(light_id))?;
        let shadow_camera = resources.camera;

        // Stage 3: placement
        let light_position = tree[light_id].world_matrix().translation_part();
        let target_position = match tree.light(light_id)?.target {
            Some(target) => tree
                .get(target)
                .map_or_else(Vec3::zeros, |node| node.world_matrix().translation_part()),
            None => Vec3::zeros(),
        };

        tree[shadow_camera].transform.position = light_position;
        tree.update_world(shadow_camera, true);
        {
            let camera_data = tree.camera_mut(shadow_camera)?;
            camera_data.target = target_position;
            camera_data.place(light_position);
        }

        if let Some((near_z, far_z)) = tree.light(light_id)?.cascade_slice {
            Self::fit_cascade(tree, camera, shadow_camera, near_z, far_z)?;
        }

        if let Some(helper) = resources.helper {
            Self::update_helper(tree, shadow_camera, helper)?;
        }

        // Stage 4: shadow matrix
        let camera_data = tree.camera(shadow_camera)?;
        let view = camera_data.view_matrix();
        let projection =
            camera_data.projection_matrix() * Mat4::clip_coordinate_transform();
        let view_projection = projection * view;
        tree.light_mut(light_id)?.shadow_matrix = bias_matrix() * view_projection;

        // Stage 5: frustum culling
        let frustum = Frustum::from_matrix(&view_projection);
        let mut included = self.casters.remove(&light_id).unwrap_or_default();
        included.clear();
        for &object in scene.renderables() {
            let Some(node) = tree.get(object) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let Some(mesh) = renderable_mesh(node.kind()) else {
                continue;
            };
            if !mesh.cast_shadow {
                continue;
            }

            let world = node.world_matrix();
            let center = world.translation_part();
            let radius = mesh.bounding_radius * world.max_scale();
            if frustum.intersects_sphere(center, radius) {
                included.push(object);
            }
        }
        log::trace!(
            "light {light_id:?}: {} of {} renderables in shadow frustum",
            included.len(),
            scene.renderables().len()
        );

        // Stage 6: depth-material dispatch
        gpu.set_render_target(Some(resources.target));
        gpu.clear();
        for &object in &included {
            let node = &tree[object];
            let Some(mesh) = renderable_mesh(node.kind()) else {
                continue;
            };
            let skinned = matches!(node.kind(), NodeKind::SkinnedMesh(_));

            let material = mesh.custom_depth_material.unwrap_or_else(|| {
                let mut features = DepthFeatures::empty();
                if mesh.morph_targets {
                    features |= DepthFeatures::MORPH_TARGETS;
                }
                if skinned {
                    features |= DepthFeatures::SKINNING;
                }
                self.materials.select(features)
            });
            gpu.bind_material(material);

            // Model-view is recomputed against the shadow camera right
            // before the draw; the world matrix may have settled after
            // culling read it for other lights.
            let model_view = view * node.world_matrix();
            gpu.set_matrices(&model_view, &projection);

            if let NodeKind::SkinnedMesh(skin) = node.kind() {
                gpu.upload_joint_matrices(bytemuck::cast_slice(skin.joint_matrices()));
            }

            match &mesh.geometry {
                Geometry::Buffer {
                    handle,
                    index_count,
                } => gpu.draw_indexed(*handle, *index_count),
                Geometry::Legacy { handle, primitives } => {
                    for primitive in primitives {
                        gpu.draw_arrays(*handle, primitive.first, primitive.count);
                    }
                }
            }
        }
        self.casters.insert(light_id, included);

        Ok(())
    }

    /// Allocate the render target and shadow camera on first touch
    fn ensure_resources(
        &mut self,
        tree: &mut SceneTree,
        light_id: NodeId,
        gpu: &mut dyn GpuContext,
    ) -> Result<(), ShadowError> {
        if tree.light(light_id)?.resources.is_some() {
            return Ok(());
        }

        let (kind, shadow) = {
            let light = tree.light(light_id)?;
            (light.kind, light.shadow.clone())
        };

        let target =
            gpu.create_render_target(shadow.map_width, shadow.map_height, TargetFormat::Depth);

        let camera_data = match kind {
            LightKind::Spot => {
                let aspect = shadow.map_width as f32 / shadow.map_height.max(1) as f32;
                CameraData::perspective(
                    shadow.camera_fov,
                    aspect,
                    shadow.camera_near,
                    shadow.camera_far,
                )
            }
            LightKind::Directional => CameraData::orthographic(
                -shadow.camera_extent,
                shadow.camera_extent,
                shadow.camera_extent,
                -shadow.camera_extent,
                shadow.camera_near,
                shadow.camera_far,
            ),
            LightKind::Point => return Err(ShadowError::MissingResources(light_id)),
        };

        let root = tree.root();
        let camera = tree.spawn(root, NodeKind::Camera(camera_data))?;
        let helper = if self.config.debug_camera_helpers {
            Some(tree.spawn(
                camera,
                NodeKind::CameraHelper(CameraHelperData {
                    corners: [Vec3::zeros(); 8],
                }),
            )?)
        } else {
            None
        };

        tree.light_mut(light_id)?.resources = Some(ShadowResources {
            camera,
            target,
            helper,
        });
        log::debug!(
            "light {light_id:?}: allocated {}x{} shadow map",
            shadow.map_width,
            shadow.map_height
        );
        Ok(())
    }

    /// Tighten an orthographic shadow camera around one cascade slice
    ///
    /// Projects the 8 corners of the viewing camera's frustum slice into
    /// the shadow camera's local space and sets the orthographic bounds to
    /// their axis-aligned box.
    fn fit_cascade(
        tree: &mut SceneTree,
        camera: NodeId,
        shadow_camera: NodeId,
        near_z: f32,
        far_z: f32,
    ) -> Result<(), ShadowError> {
        let Some(inverse) = tree.camera(camera)?.view_projection().try_inverse() else {
            log::warn!("viewing camera projection is singular, cascade fit skipped");
            return Ok(());
        };
        let corners = slice_corners(&inverse, near_z, far_z);

        let shadow_view = tree.camera(shadow_camera)?.view_matrix();
        let mut min = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
        let mut max = -min;
        for corner in corners {
            let local = shadow_view.transform_point(&corner.into());
            min.x = min.x.min(local.x);
            min.y = min.y.min(local.y);
            min.z = min.z.min(local.z);
            max.x = max.x.max(local.x);
            max.y = max.y.max(local.y);
            max.z = max.z.max(local.z);
        }

        if let Projection::Orthographic {
            left,
            right,
            top,
            bottom,
            ..
        } = &mut tree.camera_mut(shadow_camera)?.projection
        {
            *left = min.x;
            *right = max.x;
            *bottom = min.y;
            *top = max.y;
        }
        Ok(())
    }

    /// Refresh a debug helper with its camera's current frustum corners
    fn update_helper(
        tree: &mut SceneTree,
        shadow_camera: NodeId,
        helper: NodeId,
    ) -> Result<(), ShadowError> {
        let Some(inverse) = tree.camera(shadow_camera)?.view_projection().try_inverse() else {
            return Ok(());
        };
        let corners = slice_corners(&inverse, 0.0, 1.0);
        if let NodeKind::CameraHelper(data) = tree[helper].kind_mut() {
            data.corners = corners;
        }
        Ok(())
    }
}

/// Clip space to [0, 1] texture space
///
/// X and Y are rescaled from [-1, 1]; depth already lands in [0, 1] under
/// the engine's projections and passes through.
fn bias_matrix() -> Mat4 {
    Mat4::new(
        0.5, 0.0, 0.0, 0.5,
        0.0, 0.5, 0.0, 0.5,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

fn renderable_mesh(kind: &NodeKind) -> Option<&MeshData> {
    match kind {
        NodeKind::Mesh(mesh) => Some(mesh),
        NodeKind::SkinnedMesh(skin) => Some(&skin.mesh),
        _ => None,
    }
}
