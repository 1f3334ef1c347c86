//! Linear blending of two sparse grids.
//!
//! For a coefficient `c`, every voxel active in the first grid becomes
//! `a * (1 - c) + b * c`, where `b` is the second grid's value at the same
//! coordinate (its background when inactive there). Voxels active only in the
//! second grid are then activated in the first with value `b * c`, i.e. the
//! first grid contributes zero rather than its own background.
//!
//! The coefficient is not clamped: values outside `[0, 1]` extrapolate.
//! Only point samples take part; tiles in either grid are left as they are.

pub mod config;

use std::fmt;

use tracing::debug;

use crate::core_types::{Blendable, Coord};
use crate::grid::{AnyGrid, ConstAccessor, FieldRead, FieldWrite, Grid, GridType};

pub use config::BlendConfig;

/// Per-pass counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlendStats {
    /// Voxels active in the first grid whose value was interpolated
    pub interpolated: u64,
    /// Voxels newly activated from the second grid
    pub activated: u64,
    /// Tile entries in either grid that were not blended
    pub tiles_skipped: u64,
}

/// Blend `src` into `dst` in place. `dst` only gains activations.
pub fn blend_fields<T, D, S>(dst: &mut D, src: &S, coeff: f32) -> BlendStats
where
    T: Blendable,
    D: FieldWrite<T> + ?Sized,
    S: FieldRead<T> + ?Sized,
{
    let mut stats = BlendStats {
        tiles_skipped: (dst.coarse_entry_count() + src.coarse_entry_count()) as u64,
        ..BlendStats::default()
    };

    dst.for_each_voxel_on_mut(&mut |c: Coord, a: &mut T| {
        *a = T::interpolate(*a, src.value(c), coeff);
        stats.interpolated += 1;
    });

    // Interpolation above never changes activation, so `dst.is_active` still
    // reflects the pre-blend first-grid activation here.
    for entry in src.iter_value_on() {
        if !entry.is_voxel() || dst.is_active(entry.coord) {
            continue;
        }
        dst.set_value_on(entry.coord, entry.value * coeff);
        stats.activated += 1;
    }

    stats
}

/// Blend `grid2` into `grid1` and refresh `grid1`'s statistics metadata.
pub fn blend_grids<T: Blendable>(grid1: &mut Grid<T>, grid2: &Grid<T>, coeff: f32) -> BlendStats {
    let acc2 = ConstAccessor::new(grid2.tree());
    let stats = blend_fields(grid1.tree_mut(), &acc2, coeff);
    grid1.add_stats_metadata();

    debug!(
        "Blended grid '{}' ({}): {} interpolated, {} activated, {} tiles skipped",
        grid1.name(),
        T::TYPE_NAME,
        stats.interpolated,
        stats.activated,
        stats.tiles_skipped
    );
    stats
}

/// Why a pair of grids was not blended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The two grids hold different element types
    TypeMismatch { first: GridType, second: GridType },
    /// The element type has no interpolation
    Unsupported(GridType),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TypeMismatch { first, second } => {
                write!(f, "element types differ ({first} vs {second})")
            }
            SkipReason::Unsupported(ty) => write!(f, "{ty} grids cannot be blended"),
        }
    }
}

/// Result of blending one pair of runtime-typed grids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOutcome {
    Blended(BlendStats),
    Skipped(SkipReason),
}

/// Blend two grids of matching, blendable type; otherwise leave `grid1`
/// untouched and report why.
pub fn blend_any(grid1: &mut AnyGrid, grid2: &AnyGrid, coeff: f32) -> BlendOutcome {
    match (grid1, grid2) {
        (AnyGrid::Float(a), AnyGrid::Float(b)) => BlendOutcome::Blended(blend_grids(a, b, coeff)),
        (AnyGrid::Vec3(a), AnyGrid::Vec3(b)) => BlendOutcome::Blended(blend_grids(a, b, coeff)),
        (a, b) if a.grid_type() != b.grid_type() => BlendOutcome::Skipped(SkipReason::TypeMismatch {
            first: a.grid_type(),
            second: b.grid_type(),
        }),
        (a, _) => BlendOutcome::Skipped(SkipReason::Unsupported(a.grid_type())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Vec3;
    use crate::grid::{Tree, LEAF_SIZE};
    use crate::metadata::keys;
    use approx::assert_relative_eq;

    fn c(x: i32, y: i32, z: i32) -> Coord {
        Coord::new(x, y, z)
    }

    fn scalar_grid(name: &str, background: f32, voxels: &[((i32, i32, i32), f32)]) -> Grid<f32> {
        let mut grid = Grid::new(name, background);
        for &(p, v) in voxels {
            grid.tree_mut().set_value_on(p.into(), v);
        }
        grid
    }

    #[test]
    fn test_disjoint_scenario() {
        let mut g1 = scalar_grid("density", 0.0, &[((0, 0, 0), 1.0)]);
        let g2 = scalar_grid("density", 0.0, &[((1, 0, 0), 2.0)]);
        let stats = blend_grids(&mut g1, &g2, 0.25);

        assert_eq!(stats.interpolated, 1);
        assert_eq!(stats.activated, 1);
        assert_relative_eq!(g1.tree().value(c(0, 0, 0)), 0.75);
        assert_relative_eq!(g1.tree().value(c(1, 0, 0)), 0.5);
        assert_eq!(g1.tree().active_voxel_count(), 2);
    }

    #[test]
    fn test_first_only_uses_second_background() {
        let mut g1 = scalar_grid("density", 0.0, &[((3, 3, 3), 2.0)]);
        let g2 = scalar_grid("density", 10.0, &[]);
        blend_grids(&mut g1, &g2, 0.5);
        assert_relative_eq!(g1.tree().value(c(3, 3, 3)), 6.0);
    }

    #[test]
    fn test_second_only_ignores_first_background() {
        let mut g1 = scalar_grid("density", 100.0, &[]);
        let g2 = scalar_grid("density", 0.0, &[((5, 0, 0), 4.0)]);
        blend_grids(&mut g1, &g2, 0.25);
        assert_relative_eq!(g1.tree().value(c(5, 0, 0)), 1.0);
        assert!(g1.tree().is_active(c(5, 0, 0)));
        assert_eq!(g1.background(), 100.0);
    }

    #[test]
    fn test_zero_coefficient_activates_second_only_at_zero() {
        let mut g1 = scalar_grid("density", 0.0, &[((0, 0, 0), 1.5)]);
        let g2 = scalar_grid("density", 0.0, &[((0, 0, 0), 9.0), ((9, 9, 9), 3.0)]);
        blend_grids(&mut g1, &g2, 0.0);
        assert_eq!(g1.tree().value(c(0, 0, 0)), 1.5);
        assert!(g1.tree().is_active(c(9, 9, 9)));
        assert_eq!(g1.tree().value(c(9, 9, 9)), 0.0);
    }

    #[test]
    fn test_coefficient_is_not_clamped() {
        let mut g1 = scalar_grid("density", 0.0, &[((0, 0, 0), 1.0)]);
        let g2 = scalar_grid("density", 0.0, &[((0, 0, 0), 3.0)]);
        blend_grids(&mut g1, &g2, 1.5);
        assert_relative_eq!(g1.tree().value(c(0, 0, 0)), 4.0);

        let mut g1 = scalar_grid("density", 0.0, &[((0, 0, 0), 1.0)]);
        blend_grids(&mut g1, &g2, -1.0);
        assert_relative_eq!(g1.tree().value(c(0, 0, 0)), -1.0);
    }

    #[test]
    fn test_vector_blend() {
        let mut g1 = Grid::new("velocity", Vec3::zeros());
        g1.tree_mut().set_value_on(c(0, 0, 0), Vec3::new(1.0, 0.0, 0.0));
        let mut g2 = Grid::new("velocity", Vec3::zeros());
        g2.tree_mut().set_value_on(c(0, 0, 0), Vec3::new(0.0, 1.0, 0.0));
        g2.tree_mut().set_value_on(c(0, 0, 1), Vec3::new(0.0, 0.0, 2.0));

        blend_grids(&mut g1, &g2, 0.5);
        let v = g1.tree().value(c(0, 0, 0));
        assert_relative_eq!(v.x, 0.5);
        assert_relative_eq!(v.y, 0.5);
        let w = g1.tree().value(c(0, 0, 1));
        assert_relative_eq!(w.z, 1.0);
    }

    #[test]
    fn test_tiles_are_not_blended() {
        let mut g1 = Grid::new("density", 0.0_f32);
        g1.tree_mut().fill_tile(c(0, 0, 0), 1.0);
        let mut g2 = Grid::new("density", 0.0_f32);
        g2.tree_mut().fill_tile(c(8, 0, 0), 5.0);
        g2.tree_mut().set_value_on(c(1, 1, 1), 7.0);

        let stats = blend_grids(&mut g1, &g2, 0.5);
        assert_eq!(stats.tiles_skipped, 2);
        assert_eq!(stats.activated, 0);
        assert_eq!(g1.tree().value(c(1, 1, 1)), 1.0);
        assert!(!g1.tree().is_active(c(8, 0, 0)));
    }

    #[test]
    fn test_voxelized_tiles_are_blended() {
        let mut t1 = Tree::new(0.0_f32);
        t1.fill_tile(c(0, 0, 0), 1.0);
        t1.voxelize_active_tiles();
        let mut t2 = Tree::new(0.0_f32);
        t2.fill_tile(c(0, 0, 0), 3.0);
        t2.voxelize_active_tiles();

        let stats = blend_fields(&mut t1, &t2, 0.5);
        assert_eq!(stats.interpolated, LEAF_SIZE as u64);
        assert_relative_eq!(t1.value(c(4, 4, 4)), 2.0);
    }

    #[test]
    fn test_stats_metadata_refreshed() {
        let mut g1 = scalar_grid("density", 0.0, &[((0, 0, 0), 1.0)]);
        let g2 = scalar_grid("density", 0.0, &[((2, 0, 0), 4.0)]);
        blend_grids(&mut g1, &g2, 0.5);
        assert_eq!(g1.metadata().meta_value::<i64>(keys::FILE_VOXEL_COUNT), Ok(2));
        assert_eq!(g1.metadata().meta_value::<f32>(keys::VALUE_MAX), Ok(2.0));
    }

    #[test]
    fn test_blend_any_skips_mismatched_and_unsupported() {
        let mut float = AnyGrid::from(scalar_grid("a", 0.0, &[((0, 0, 0), 1.0)]));
        let vector = AnyGrid::from(Grid::new("a", Vec3::zeros()));
        assert_eq!(
            blend_any(&mut float, &vector, 0.5),
            BlendOutcome::Skipped(SkipReason::TypeMismatch {
                first: GridType::Float,
                second: GridType::Vec3s,
            })
        );

        let mut ints = AnyGrid::from(Grid::new("b", 0_i32));
        let ints2 = AnyGrid::from(Grid::new("b", 0_i32));
        assert_eq!(
            blend_any(&mut ints, &ints2, 0.5),
            BlendOutcome::Skipped(SkipReason::Unsupported(GridType::Int32))
        );
    }
}
