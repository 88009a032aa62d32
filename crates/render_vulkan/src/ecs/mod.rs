//! Scene layer: game objects composed of components
//!
//! Each [`GameObject`] owns a [`Transform`] and at most one component of each
//! type. [`GameObjectManager`] keeps objects by name and drives their update
//! and render calls in registration order.

pub mod component;
pub mod game_object;
pub mod manager;
pub mod transform;

pub use component::Component;
pub use game_object::GameObject;
pub use manager::GameObjectManager;
pub use transform::Transform;
