//! Algebraic laws of the blend over randomly populated grids.

use std::collections::BTreeSet;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smoke_blend_core::{blend_grids, Coord, Grid, Vec3};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Random sparse scalar grid spread over a few leaves, including negative coordinates
fn random_grid(rng: &mut StdRng, background: f32, voxels: usize) -> Grid<f32> {
    let mut grid = Grid::new("density", background);
    for _ in 0..voxels {
        let c = Coord::new(
            rng.random_range(-12..12),
            rng.random_range(-12..12),
            rng.random_range(-4..4),
        );
        grid.tree_mut().set_value_on(c, rng.random_range(-5.0..5.0));
    }
    grid
}

fn active_set(grid: &Grid<f32>) -> BTreeSet<Coord> {
    grid.tree().iter_voxels_on().map(|e| e.coord).collect()
}

fn probe_coords() -> impl Iterator<Item = Coord> {
    (-14..14).flat_map(|x| (-14..14).flat_map(move |y| (-6..6).map(move |z| Coord::new(x, y, z))))
}

#[test]
fn test_activation_set_is_union() {
    let mut rng = StdRng::seed_from_u64(11);
    for coeff in [0.0, 0.3, 1.0, -0.5, 2.0] {
        let g1 = random_grid(&mut rng, 0.0, 200);
        let g2 = random_grid(&mut rng, 1.0, 200);
        let mut out = g1.clone();
        blend_grids(&mut out, &g2, coeff);

        for c in probe_coords() {
            assert_eq!(
                out.tree().is_active(c),
                g1.tree().is_active(c) || g2.tree().is_active(c),
                "activity at {c} with coefficient {coeff}"
            );
        }
    }
}

#[test]
fn test_half_blend_is_mean_where_both_active() {
    let mut rng = StdRng::seed_from_u64(23);
    let g1 = random_grid(&mut rng, 0.0, 300);
    let g2 = random_grid(&mut rng, 0.0, 300);
    let mut out = g1.clone();
    blend_grids(&mut out, &g2, 0.5);

    let both: Vec<Coord> = active_set(&g1).intersection(&active_set(&g2)).copied().collect();
    assert!(!both.is_empty());
    for c in both {
        let expected = 0.5 * g1.tree().value(c) + 0.5 * g2.tree().value(c);
        assert_relative_eq!(out.tree().value(c), expected, epsilon = 1e-5);
    }
}

#[test]
fn test_unit_coefficient_reproduces_second() {
    let mut rng = StdRng::seed_from_u64(5);
    let g1 = random_grid(&mut rng, 0.0, 250);
    let g2 = random_grid(&mut rng, 0.0, 250);
    let mut out = g1.clone();
    blend_grids(&mut out, &g2, 1.0);

    for c in active_set(&g1).union(&active_set(&g2)) {
        assert_relative_eq!(out.tree().value(*c), g2.tree().value(*c), epsilon = 1e-6);
    }
}

#[test]
fn test_second_only_voxels_scale_by_coefficient_regardless_of_first_background() {
    let mut rng = StdRng::seed_from_u64(41);
    for background1 in [0.0, 7.5, -3.0] {
        let g1 = random_grid(&mut rng, background1, 100);
        let g2 = random_grid(&mut rng, 0.0, 100);
        let mut out = g1.clone();
        blend_grids(&mut out, &g2, 0.4);

        let only2: Vec<Coord> = active_set(&g2).difference(&active_set(&g1)).copied().collect();
        assert!(!only2.is_empty());
        for c in only2 {
            assert_relative_eq!(out.tree().value(c), g2.tree().value(c) * 0.4, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_first_only_voxels_blend_toward_second_background() {
    let mut rng = StdRng::seed_from_u64(3);
    let g1 = random_grid(&mut rng, 0.0, 100);
    let g2 = random_grid(&mut rng, 2.0, 100);
    let mut out = g1.clone();
    blend_grids(&mut out, &g2, 0.25);

    for c in active_set(&g1).difference(&active_set(&g2)) {
        let expected = g1.tree().value(*c) * 0.75 + 2.0 * 0.25;
        assert_relative_eq!(out.tree().value(*c), expected, epsilon = 1e-6);
    }
}

#[test]
fn test_identical_inputs_are_a_fixed_point() {
    let mut rng = StdRng::seed_from_u64(99);
    let g = random_grid(&mut rng, 0.0, 300);
    for coeff in [0.0, 0.2, 0.5, 0.9, 1.0] {
        let mut out = g.clone();
        blend_grids(&mut out, &g, coeff);
        assert_eq!(active_set(&out), active_set(&g));
        for c in active_set(&g) {
            assert_relative_eq!(out.tree().value(c), g.tree().value(c), epsilon = 1e-5);
        }
    }
}

#[test]
fn test_documented_scenario() {
    let mut g1 = Grid::new("density", 0.0_f32);
    g1.tree_mut().set_value_on(Coord::new(0, 0, 0), 1.0);
    let mut g2 = Grid::new("density", 0.0_f32);
    g2.tree_mut().set_value_on(Coord::new(1, 0, 0), 2.0);

    blend_grids(&mut g1, &g2, 0.25);

    let out: Vec<(Coord, f32)> = g1.tree().iter_voxels_on().map(|e| (e.coord, e.value)).collect();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].0, Coord::new(0, 0, 0));
    assert_relative_eq!(out[0].1, 0.75);
    assert_eq!(out[1].0, Coord::new(1, 0, 0));
    assert_relative_eq!(out[1].1, 0.5);
}

#[test]
fn test_second_input_is_not_mutated() {
    let mut rng = StdRng::seed_from_u64(17);
    let mut g1 = random_grid(&mut rng, 0.0, 150);
    let g2 = random_grid(&mut rng, 0.0, 150);
    let before = g2.clone();
    blend_grids(&mut g1, &g2, 0.6);
    assert_eq!(g2, before);
}

#[test]
fn test_vector_grid_union_and_interpolation() {
    let mut g1 = Grid::new("velocity", Vec3::zeros());
    let mut g2 = Grid::new("velocity", Vec3::new(0.0, 0.0, 1.0));
    g1.tree_mut().set_value_on(Coord::new(0, 0, 0), Vec3::new(2.0, 0.0, 0.0));
    g1.tree_mut().set_value_on(Coord::new(-9, 0, 0), Vec3::new(0.0, 4.0, 0.0));
    g2.tree_mut().set_value_on(Coord::new(0, 0, 0), Vec3::new(0.0, 2.0, 0.0));
    g2.tree_mut().set_value_on(Coord::new(0, 20, 0), Vec3::new(1.0, 1.0, 1.0));

    blend_grids(&mut g1, &g2, 0.5);
    let tree = g1.tree();
    assert_eq!(tree.active_voxel_count(), 3);

    let both = tree.value(Coord::new(0, 0, 0));
    assert_relative_eq!(both.x, 1.0);
    assert_relative_eq!(both.y, 1.0);

    // first only: blends toward the second grid's background (0, 0, 1)
    let first_only = tree.value(Coord::new(-9, 0, 0));
    assert_relative_eq!(first_only.y, 2.0);
    assert_relative_eq!(first_only.z, 0.5);

    let second_only = tree.value(Coord::new(0, 20, 0));
    assert_relative_eq!(second_only.x, 0.5);
    assert_relative_eq!(second_only.z, 0.5);
}
