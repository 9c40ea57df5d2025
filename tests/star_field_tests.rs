use std::path::Path;

use space_scene::scene::{NodeKind, Scene};
use space_scene::scenes::create_portfolio_scene;
use space_scene::stars::{STAR_COUNT, STAR_SPREAD};

#[cfg(test)]
mod star_field_tests {
    use super::*;

    fn stars(scene: &Scene) -> Vec<&space_scene::scene::SceneNode> {
        scene
            .iter()
            .filter(|node| node.name.starts_with("star "))
            .collect()
    }

    #[test]
    fn test_scene_contains_exactly_200_stars() {
        let (scene, _) = create_portfolio_scene(Path::new("missing-assets"));
        assert_eq!(stars(&scene).len(), STAR_COUNT);
    }

    #[test]
    fn test_star_positions_are_bounded() {
        let (scene, _) = create_portfolio_scene(Path::new("missing-assets"));
        let half = STAR_SPREAD * 0.5;

        for node in stars(&scene) {
            for axis in node.transform.position.to_array() {
                assert!(
                    (-half..=half).contains(&axis),
                    "star '{}' axis {axis} outside [-{half}, {half}]",
                    node.name
                );
            }
        }
    }

    #[test]
    fn test_stars_are_lit_meshes() {
        let (scene, _) = create_portfolio_scene(Path::new("missing-assets"));
        for node in stars(&scene) {
            let NodeKind::Mesh(mesh) = &node.kind else {
                panic!("star '{}' should be a mesh", node.name);
            };
            assert!(!mesh.material.is_unlit());
            assert_eq!(mesh.material.color(), [1.0, 1.0, 1.0]);
        }
    }

    #[test]
    fn test_two_scenes_differ_somewhere() {
        // The default RNG gives a fresh field every run; collision of all
        // 600 coordinates would mean the generator is broken.
        let (a, _) = create_portfolio_scene(Path::new("missing-assets"));
        let (b, _) = create_portfolio_scene(Path::new("missing-assets"));

        let differs = stars(&a)
            .iter()
            .zip(stars(&b).iter())
            .any(|(x, y)| x.transform.position != y.transform.position);
        assert!(differs);
    }
}
