use std::sync::Arc;

use glam::{EulerRot, Mat4, Vec3};

use crate::geometry::{LineData, MeshData};
use crate::loaders::texture::TextureHandle;

/// Mutable placement of a scene node. Geometry and materials never change
/// after construction; transforms do, every frame.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians, applied X, then Y, then Z.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
            * Mat4::from_scale(self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Surface appearance. `Standard` reacts to the lights; `Basic` is unlit.
#[derive(Debug, Clone)]
pub enum Material {
    Standard {
        color: [f32; 3],
        map: Option<TextureHandle>,
        normal_map: Option<TextureHandle>,
    },
    Basic {
        color: [f32; 3],
        map: Option<TextureHandle>,
    },
}

impl Material {
    pub fn is_unlit(&self) -> bool {
        matches!(self, Material::Basic { .. })
    }

    pub fn color(&self) -> [f32; 3] {
        match self {
            Material::Standard { color, .. } | Material::Basic { color, .. } => *color,
        }
    }

    pub fn map(&self) -> Option<&TextureHandle> {
        match self {
            Material::Standard { map, .. } | Material::Basic { map, .. } => map.as_ref(),
        }
    }

    pub fn normal_map(&self) -> Option<&TextureHandle> {
        match self {
            Material::Standard { normal_map, .. } => normal_map.as_ref(),
            Material::Basic { .. } => None,
        }
    }
}

/// A renderable mesh: shared immutable geometry plus a material.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Arc<MeshData>,
    pub material: Material,
}

#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Mesh(Mesh),
    Lines(Arc<LineData>),
    PointLight(PointLight),
    AmbientLight(AmbientLight),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            kind,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }
}

/// Index of a node within its scene. Stable for the scene's lifetime since
/// nodes are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// Scene background: a texture dimmed to a fixed intensity.
#[derive(Debug, Clone)]
pub struct Background {
    pub texture: TextureHandle,
    pub intensity: f32,
}

/// Flat container for everything rendered in one pass: meshes, helper lines,
/// and lights. Exactly one exists for the process lifetime; nodes are added
/// once during construction and never removed.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    pub background: Option<Background>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter()
    }

    /// First point light in the scene, with its placement.
    pub fn point_light(&self) -> Option<(&Transform, &PointLight)> {
        self.nodes.iter().find_map(|node| match &node.kind {
            NodeKind::PointLight(light) => Some((&node.transform, light)),
            _ => None,
        })
    }

    pub fn ambient_light(&self) -> Option<&AmbientLight> {
        self.nodes.iter().find_map(|node| match &node.kind {
            NodeKind::AmbientLight(light) => Some(light),
            _ => None,
        })
    }
}

/// 0xRRGGBB to [0,1] rgb channels.
pub fn color_hex(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry;

    fn test_mesh() -> Mesh {
        Mesh {
            geometry: Arc::new(geometry::cuboid(1.0, 1.0, 1.0)),
            material: Material::Basic {
                color: [1.0, 1.0, 1.0],
                map: None,
            },
        }
    }

    #[test]
    fn add_returns_sequential_ids() {
        let mut scene = Scene::new();
        let a = scene.add(SceneNode::new("a", NodeKind::Mesh(test_mesh())));
        let b = scene.add(SceneNode::new("b", NodeKind::Mesh(test_mesh())));
        assert_ne!(a, b);
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.node(a).name, "a");
        assert_eq!(scene.node(b).name, "b");
    }

    #[test]
    fn node_mut_updates_transform() {
        let mut scene = Scene::new();
        let id = scene.add(SceneNode::new("a", NodeKind::Mesh(test_mesh())));
        scene.node_mut(id).transform.rotation.y += 0.5;
        assert_eq!(scene.node(id).transform.rotation.y, 0.5);
    }

    #[test]
    fn default_transform_is_identity() {
        let transform = Transform::default();
        assert_eq!(transform.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn transform_matrix_applies_translation() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            ..Default::default()
        };
        let moved = transform.matrix().transform_point3(Vec3::ZERO);
        assert_eq!(moved, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn lights_are_discoverable() {
        let mut scene = Scene::new();
        scene.add(
            SceneNode::new(
                "point light",
                NodeKind::PointLight(PointLight {
                    color: [1.0, 1.0, 1.0],
                    intensity: 1.0,
                }),
            )
            .with_position(Vec3::new(20.0, 20.0, 20.0)),
        );
        scene.add(SceneNode::new(
            "ambient light",
            NodeKind::AmbientLight(AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: 1.0,
            }),
        ));

        let (transform, _) = scene.point_light().expect("point light");
        assert_eq!(transform.position, Vec3::new(20.0, 20.0, 20.0));
        assert!(scene.ambient_light().is_some());
    }

    #[test]
    fn color_hex_decodes_channels() {
        assert_eq!(color_hex(0xffffff), [1.0, 1.0, 1.0]);
        assert_eq!(color_hex(0x000000), [0.0, 0.0, 0.0]);
        let tomato = color_hex(0xff6347);
        assert!((tomato[0] - 1.0).abs() < 1e-6);
        assert!((tomato[1] - 0x63 as f32 / 255.0).abs() < 1e-6);
        assert!((tomato[2] - 0x47 as f32 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn basic_material_is_unlit() {
        let basic = Material::Basic {
            color: [1.0, 0.0, 0.0],
            map: None,
        };
        let standard = Material::Standard {
            color: [1.0, 0.0, 0.0],
            map: None,
            normal_map: None,
        };
        assert!(basic.is_unlit());
        assert!(!standard.is_unlit());
        assert!(standard.normal_map().is_none());
    }
}
