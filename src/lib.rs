#![warn(missing_docs)]
//! Hexagonal tile-map engine.
//!
//! A chunked hex grid with terrain editing, rivers, roads, walls and
//! features; procedural map generation; pathfinding and fog of war;
//! binary save files; and a triangulator that turns each chunk into mesh
//! layers. The [`view`] plugin puts it all on screen with Bevy.

pub mod cell;
pub mod coordinates;
pub mod generator;
pub mod grid;
pub mod math;
pub mod mesh_builder;
pub mod metrics;
pub mod priority_queue;
pub mod triangulator;
pub mod view;

use bevy::prelude::*;

/// Application-wide game state, used for system scheduling.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
pub enum GameState {
    /// Map on screen; debug keys active.
    #[default]
    Running,
    /// Debug overlay active (Tab to toggle).
    Debugging,
}
