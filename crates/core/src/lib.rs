//! Smoke Blend Core Library
//!
//! Blends two sparse volumetric simulation snapshots (for example smoke
//! density and velocity caches) into one, interpolating every active voxel by
//! a single coefficient after checking that both snapshots describe the same
//! simulation domain.
//!
//! ## Layout
//!
//! - [`grid`]: sparse trees of 8³ leaves and tiles, named grids, statistics
//! - [`metadata`]: typed metadata maps and compatibility checks
//! - [`blend`]: the interpolation engine
//! - [`store`]: the on-disk grid file format
//! - [`pipeline`]: open, verify, blend, write

// Core types and utilities
pub mod core_types;

pub mod blend;
pub mod error;
pub mod grid;
pub mod metadata;
pub mod pipeline;
pub mod store;

// Re-export core types
pub use core_types::{Blendable, Coord, CoordBBox, GridValue, Vec3, Vec3i};

pub use blend::{blend_any, blend_fields, blend_grids, BlendConfig, BlendOutcome, BlendStats, SkipReason};
pub use error::{BlendError, ConfigError};
pub use grid::{AnyGrid, ConstAccessor, FieldRead, FieldWrite, Grid, GridType, Tree};
pub use metadata::{BlendRequirements, MetaKind, MetaMap, MetaValue, MetadataError, RequiredKey};
pub use pipeline::{blend_sources, run_blend, BlendJob, BlendReport};
pub use store::{GridFile, GridSource, StoreError};
