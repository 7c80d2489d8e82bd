//! World container

pub mod world;

pub use world::World;
