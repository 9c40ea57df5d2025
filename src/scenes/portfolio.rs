use std::path::Path;
use std::sync::Arc;

use glam::Vec3;

use crate::geometry;
use crate::loaders::texture::TextureHandle;
use crate::scene::{
    color_hex, AmbientLight, Background, Material, Mesh, NodeId, NodeKind, PointLight, Scene,
    SceneNode,
};
use crate::stars;

pub const BACKGROUND_INTENSITY: f32 = 0.2;

const TORUS_COLOR: u32 = 0xff6347;
const GRID_CENTER_COLOR: u32 = 0x444444;
const GRID_COLOR: u32 = 0x888888;

/// Ids of the nodes the controllers animate after construction.
#[derive(Debug, Clone, Copy)]
pub struct SceneHandles {
    pub torus: NodeId,
    pub cube: NodeId,
    pub moon: NodeId,
}

/// Build the whole scene: torus, lights and their helpers, star field,
/// background, profile cube, and moon. Texture decodes are kicked off here
/// and resolve on their own; everything else is synchronous.
pub fn create_portfolio_scene(assets: &Path) -> (Scene, SceneHandles) {
    let mut scene = Scene::new();
    let white = [1.0, 1.0, 1.0];

    let torus = scene.add(SceneNode::new(
        "torus",
        NodeKind::Mesh(Mesh {
            geometry: Arc::new(geometry::torus(10.0, 3.0, 16, 100)),
            material: Material::Standard {
                color: color_hex(TORUS_COLOR),
                map: None,
                normal_map: None,
            },
        }),
    ));

    let light_position = Vec3::new(20.0, 20.0, 20.0);
    scene.add(
        SceneNode::new(
            "point light",
            NodeKind::PointLight(PointLight {
                color: white,
                intensity: 1.0,
            }),
        )
        .with_position(light_position),
    );
    scene.add(SceneNode::new(
        "ambient light",
        NodeKind::AmbientLight(AmbientLight {
            color: white,
            intensity: 1.0,
        }),
    ));

    scene.add(
        SceneNode::new(
            "point light helper",
            NodeKind::Lines(Arc::new(geometry::wire_sphere(1.0, 16, white))),
        )
        .with_position(light_position),
    );
    scene.add(SceneNode::new(
        "grid helper",
        NodeKind::Lines(Arc::new(geometry::grid(
            200.0,
            50,
            color_hex(GRID_CENTER_COLOR),
            color_hex(GRID_COLOR),
        ))),
    ));

    stars::add_stars(&mut scene, &mut rand::rng());

    scene.background = Some(Background {
        texture: TextureHandle::load(assets.join("space.jpg")),
        intensity: BACKGROUND_INTENSITY,
    });

    let cube = scene.add(SceneNode::new(
        "profile cube",
        NodeKind::Mesh(Mesh {
            geometry: Arc::new(geometry::cuboid(3.0, 3.0, 3.0)),
            material: Material::Basic {
                color: white,
                map: Some(TextureHandle::load(assets.join("profile.jpg"))),
            },
        }),
    ));

    let moon = scene.add(
        SceneNode::new(
            "moon",
            NodeKind::Mesh(Mesh {
                geometry: Arc::new(geometry::uv_sphere(3.0, 32, 32)),
                material: Material::Standard {
                    color: white,
                    map: Some(TextureHandle::load(assets.join("moon.jpg"))),
                    normal_map: Some(TextureHandle::load(assets.join("normal.jpg"))),
                },
            }),
        )
        .with_position(Vec3::new(-10.0, 0.0, 30.0)),
    );

    (scene, SceneHandles { torus, cube, moon })
}
