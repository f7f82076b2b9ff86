//! Scene management
//!
//! The scene is a forest of [`SceneObject`]s held in a [`Scene`] arena.
//! Each object carries a [`Transform`] relative to its parent; the
//! [`ModelView`] stack composes those into cumulative matrices while the
//! renderer walks the tree.

pub mod graph;
pub mod model_view;
pub mod object;
pub mod transform;

pub use graph::{ObjectId, Scene, SceneError};
pub use model_view::ModelView;
pub use object::SceneObject;
pub use transform::Transform;
