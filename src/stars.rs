use std::sync::Arc;

use glam::Vec3;
use rand::Rng;

use crate::geometry;
use crate::scene::{Material, Mesh, NodeKind, Scene, SceneNode};

pub const STAR_COUNT: usize = 200;
/// Width of the centered cube the stars are scattered in; each axis is
/// sampled independently from [-spread/2, spread/2].
pub const STAR_SPREAD: f32 = 100.0;

const STAR_RADIUS: f32 = 0.25;
const STAR_SEGMENTS: u32 = 24;

/// Scatter `STAR_COUNT` stars into the scene. All stars share one geometry
/// and one white lit material; only their positions differ.
pub fn add_stars(scene: &mut Scene, rng: &mut impl Rng) {
    let geometry = Arc::new(geometry::uv_sphere(
        STAR_RADIUS,
        STAR_SEGMENTS,
        STAR_SEGMENTS,
    ));
    let material = Material::Standard {
        color: [1.0, 1.0, 1.0],
        map: None,
        normal_map: None,
    };
    let half = STAR_SPREAD * 0.5;

    for index in 0..STAR_COUNT {
        let position = Vec3::new(
            rng.random_range(-half..=half),
            rng.random_range(-half..=half),
            rng.random_range(-half..=half),
        );
        scene.add(
            SceneNode::new(
                format!("star {index}"),
                NodeKind::Mesh(Mesh {
                    geometry: Arc::clone(&geometry),
                    material: material.clone(),
                }),
            )
            .with_position(position),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn adds_exactly_star_count_nodes() {
        let mut scene = Scene::new();
        add_stars(&mut scene, &mut StdRng::seed_from_u64(7));
        assert_eq!(scene.len(), STAR_COUNT);
    }

    #[test]
    fn positions_stay_within_spread() {
        let mut scene = Scene::new();
        add_stars(&mut scene, &mut StdRng::seed_from_u64(42));

        let half = STAR_SPREAD * 0.5;
        for node in scene.iter() {
            for axis in node.transform.position.to_array() {
                assert!(axis >= -half && axis <= half, "star axis {axis} out of range");
            }
        }
    }

    #[test]
    fn stars_share_one_geometry() {
        let mut scene = Scene::new();
        add_stars(&mut scene, &mut StdRng::seed_from_u64(1));

        let geometries: Vec<_> = scene
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::Mesh(mesh) => Some(Arc::clone(&mesh.geometry)),
                _ => None,
            })
            .collect();
        assert_eq!(geometries.len(), STAR_COUNT);
        assert!(geometries
            .iter()
            .all(|g| Arc::ptr_eq(g, &geometries[0])));
    }

    #[test]
    fn different_seeds_give_different_fields() {
        let mut a = Scene::new();
        let mut b = Scene::new();
        add_stars(&mut a, &mut StdRng::seed_from_u64(1));
        add_stars(&mut b, &mut StdRng::seed_from_u64(2));

        let differs = a
            .iter()
            .zip(b.iter())
            .any(|(x, y)| x.transform.position != y.transform.position);
        assert!(differs);
    }
}
