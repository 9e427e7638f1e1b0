use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::{
    assets::{
        loader::LoadedAsset,
        mesh::{Material, Mesh},
    },
    foundation::{
        error::{TurntableError, TurntableResult},
        math::Pose,
    },
    scene::{camera::CameraDescriptor, lights::LightDescriptor},
};

/// Integer handle into [`Scene`]'s node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub usize);

/// How per-frame rotation reaches the geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseStrategy {
    /// Update each node's pose; mesh data is never copied.
    #[default]
    Node,
    /// Copy the cached baseline mesh and bake the rotation into its vertices.
    Rebake,
}

/// Immutable, shareable part of a scene: normalized geometry plus materials.
#[derive(Debug)]
pub struct SceneAssets {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub mesh: usize,
    pub pose: Pose,
    /// Geometry rebaked for the current frame; replaces `meshes[mesh]` when set.
    pub rebaked: Option<Mesh>,
}

/// Render-ready scene: shared geometry, fixed lights and camera, per-node pose state.
///
/// Cloning is cheap for the geometry (shared through an `Arc`) and gives the
/// clone its own independent pose state.
#[derive(Clone, Debug)]
pub struct Scene {
    assets: Arc<SceneAssets>,
    nodes: Vec<SceneNode>,
    pub lights: [LightDescriptor; 3],
    pub camera: CameraDescriptor,
    /// Ambient term, linear RGB.
    pub ambient: Vec3,
    pub background: [u8; 3],
    /// Use interpolated vertex normals; `false` shades each triangle flat.
    pub smooth: bool,
}

/// Geometry as the renderer should see it for one node.
pub struct NodeView<'a> {
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    pub pose: &'a Pose,
}

impl Scene {
    pub fn new(
        asset: LoadedAsset,
        lights: [LightDescriptor; 3],
        camera: CameraDescriptor,
    ) -> Self {
        let nodes = (0..asset.meshes.len())
            .map(|mesh| SceneNode {
                mesh,
                pose: Pose::IDENTITY,
                rebaked: None,
            })
            .collect();
        Self {
            assets: Arc::new(SceneAssets {
                meshes: asset.meshes,
                materials: asset.materials,
            }),
            nodes,
            lights,
            camera,
            ambient: Vec3::splat(0.4),
            background: [255, 255, 255],
            smooth: true,
        }
    }

    pub fn assets(&self) -> &SceneAssets {
        &self.assets
    }

    pub fn node_handles(&self) -> impl Iterator<Item = NodeHandle> + use<> {
        (0..self.nodes.len()).map(NodeHandle)
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(handle.0)
    }

    pub fn set_pose(&mut self, handle: NodeHandle, pose: Mat4) -> TurntableResult<()> {
        let node = self
            .nodes
            .get_mut(handle.0)
            .ok_or_else(|| TurntableError::validation(format!("no scene node {}", handle.0)))?;
        node.pose = Pose::new(pose);
        node.rebaked = None;
        Ok(())
    }

    /// Re-pose every node with `transform` using the requested strategy.
    ///
    /// Both strategies yield bit-identical world-space geometry.
    pub fn apply_pose(&mut self, transform: Mat4, strategy: PoseStrategy) {
        let pose = Pose::new(transform);
        for node in &mut self.nodes {
            match strategy {
                PoseStrategy::Node => {
                    node.pose = pose;
                    node.rebaked = None;
                }
                PoseStrategy::Rebake => {
                    let baseline = &self.assets.meshes[node.mesh];
                    node.rebaked = Some(if pose.is_identity() {
                        baseline.clone()
                    } else {
                        baseline.posed(&pose)
                    });
                    node.pose = Pose::IDENTITY;
                }
            }
        }
    }

    pub fn views(&self) -> impl Iterator<Item = NodeView<'_>> {
        let fallback = self.assets.materials.last();
        self.nodes.iter().filter_map(move |node| {
            let mesh = node
                .rebaked
                .as_ref()
                .or_else(|| self.assets.meshes.get(node.mesh))?;
            let material = self.assets.materials.get(mesh.material.0).or(fallback)?;
            Some(NodeView {
                mesh,
                material,
                pose: &node.pose,
            })
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.assets.meshes.iter().map(Mesh::triangle_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{
        assets::mesh::{MaterialId, Vertex},
        foundation::math::Axis,
        scene::{camera::place_front_camera, lights::{DEFAULT_RIG, build_raymond_rig}},
    };

    fn scene() -> Scene {
        let v = |x: f32, y: f32| Vertex {
            position: Vec3::new(x, y, 0.1),
            normal: Vec3::Z,
            ..Default::default()
        };
        let mesh = Mesh {
            name: None,
            vertices: vec![v(0.0, 0.0), v(0.5, 0.0), v(0.0, 0.5)],
            indices: vec![0, 1, 2],
            material: MaterialId(0),
        };
        let asset = LoadedAsset {
            source: PathBuf::from("t.gltf"),
            meshes: vec![mesh.clone(), mesh],
            materials: vec![Material::default()],
        };
        Scene::new(
            asset,
            build_raymond_rig(Vec3::ZERO, 1.0, &DEFAULT_RIG).unwrap(),
            place_front_camera(Vec3::ZERO, 2.2, 45.0, 0.05).unwrap(),
        )
    }

    fn world_positions(scene: &Scene) -> Vec<Vec3> {
        scene
            .views()
            .flat_map(|view| {
                view.mesh.vertices.iter().map(move |v| {
                    if view.pose.is_identity() {
                        v.position
                    } else {
                        view.pose.point(v.position)
                    }
                })
            })
            .collect()
    }

    #[test]
    fn node_and_rebake_strategies_match_bitwise() {
        let mut a = scene();
        let mut b = a.clone();
        let rot = Axis::Y.rotation(37.0);
        a.apply_pose(rot, PoseStrategy::Node);
        b.apply_pose(rot, PoseStrategy::Rebake);
        assert_eq!(world_positions(&a), world_positions(&b));
    }

    #[test]
    fn clones_have_independent_poses() {
        let mut a = scene();
        let b = a.clone();
        a.apply_pose(Axis::X.rotation(90.0), PoseStrategy::Node);
        assert!(b.views().all(|v| v.pose.is_identity()));
        assert!(a.views().all(|v| !v.pose.is_identity()));
    }

    #[test]
    fn set_pose_rejects_unknown_handle() {
        let mut s = scene();
        assert_eq!(s.node_handles().count(), 2);
        assert!(s.set_pose(NodeHandle(0), Mat4::IDENTITY).is_ok());
        assert!(s.set_pose(NodeHandle(9), Mat4::IDENTITY).is_err());
    }
}
