//! Scene objects
//!
//! A [`SceneObject`] is a transform plus optional references into the render
//! resource library. Parent and child links are ids into the owning
//! [`Scene`](super::Scene), which keeps them consistent.

use crate::animation::AnimationId;
use crate::render::resources::{MaterialId, MeshId};
use crate::scene::transform::Transform;
use crate::scene::ObjectId;

/// Node of the scene tree
#[derive(Debug, Clone, Default)]
pub struct SceneObject {
    /// Display name
    pub name: String,
    /// Transform relative to the parent
    pub transform: Transform,
    /// Geometry to draw
    pub mesh: Option<MeshId>,
    /// Surface to draw the geometry with
    pub material: Option<MaterialId>,
    pub(crate) animation: Option<AnimationId>,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: Vec<ObjectId>,
}

impl SceneObject {
    /// Create an object with an identity transform and nothing to draw
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder pattern: Set transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Builder pattern: Set mesh
    #[must_use]
    pub fn with_mesh(mut self, mesh: MeshId) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Builder pattern: Set material
    #[must_use]
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    /// Animation driving this object
    pub fn animation(&self) -> Option<AnimationId> {
        self.animation
    }

    /// Parent, `None` for roots
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// Whether the object references anything to draw
    pub fn is_drawable(&self) -> bool {
        self.mesh.is_some() && self.material.is_some()
    }
}
