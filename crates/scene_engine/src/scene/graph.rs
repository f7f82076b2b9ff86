//! Scene arena
//!
//! [`Scene`] owns every [`SceneObject`] and [`Animation`] in slot maps and
//! keeps the parent/child links consistent. Roots are kept in insertion
//! order, which is the order the renderer walks them in. The tree is always
//! acyclic: [`Scene::add_child`] refuses to parent an object under itself or
//! one of its descendants.

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::animation::{Animation, AnimationId};
use crate::foundation::math::Matrix4;
use crate::render::resources::Resources;
use crate::scene::model_view::ModelView;
use crate::scene::object::SceneObject;

new_key_type! {
    /// Id of a [`SceneObject`] in a [`Scene`]
    pub struct ObjectId;
}

/// Errors raised by scene tree edits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The id does not refer to a live object
    #[error("Object not found: {0:?}")]
    ObjectNotFound(ObjectId),

    /// The new parent is a descendant of the child
    #[error("Parenting {child:?} under {parent:?} would create a cycle")]
    CycleDetected {
        /// Requested parent
        parent: ObjectId,
        /// Requested child
        child: ObjectId,
    },

    /// An object was made its own parent
    #[error("Object cannot be its own parent: {0:?}")]
    SelfParent(ObjectId),
}

/// Object tree plus the animations driving it
#[derive(Debug, Default)]
pub struct Scene {
    objects: SlotMap<ObjectId, SceneObject>,
    roots: Vec<ObjectId>,
    animations: SlotMap<AnimationId, Animation>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object as a new root
    ///
    /// Any links the object carried are dropped.
    pub fn add(&mut self, mut object: SceneObject) -> ObjectId {
        object.parent = None;
        object.children.clear();
        object.animation = None;
        let id = self.objects.insert(object);
        self.roots.push(id);
        log::trace!("Added object {id:?}");
        id
    }

    /// Add an object directly under `parent`
    pub fn add_under(&mut self, parent: ObjectId, object: SceneObject) -> Result<ObjectId, SceneError> {
        if !self.objects.contains_key(parent) {
            return Err(SceneError::ObjectNotFound(parent));
        }
        let id = self.add(object);
        self.add_child(parent, id)?;
        Ok(id)
    }

    /// Move `child` (with its subtree) under `parent`
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), SceneError> {
        if parent == child {
            return Err(SceneError::SelfParent(child));
        }
        for id in [parent, child] {
            if !self.objects.contains_key(id) {
                return Err(SceneError::ObjectNotFound(id));
            }
        }
        if self.ancestors(parent).any(|ancestor| ancestor == child) {
            return Err(SceneError::CycleDetected { parent, child });
        }

        self.unlink(child);
        if let Some(object) = self.objects.get_mut(parent) {
            object.children.push(child);
        }
        if let Some(object) = self.objects.get_mut(child) {
            object.parent = Some(parent);
        }
        Ok(())
    }

    /// Make `id` a root again
    pub fn detach(&mut self, id: ObjectId) -> Result<(), SceneError> {
        if !self.objects.contains_key(id) {
            return Err(SceneError::ObjectNotFound(id));
        }
        self.unlink(id);
        self.roots.push(id);
        Ok(())
    }

    /// Remove an object with its whole subtree
    ///
    /// Animations targeting any removed object are removed too. Returns the
    /// object `id` referred to.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        if !self.objects.contains_key(id) {
            return None;
        }
        self.unlink(id);

        let mut pending = vec![id];
        let mut removed = Vec::new();
        while let Some(next) = pending.pop() {
            if let Some(object) = self.objects.get(next) {
                pending.extend_from_slice(&object.children);
            }
            removed.push(next);
        }

        let before = self.animations.len();
        self.animations.retain(|_, animation| !removed.contains(&animation.target()));
        log::debug!(
            "Removed {} objects and {} animations",
            removed.len(),
            before - self.animations.len()
        );

        let mut root = None;
        for object_id in removed {
            let object = self.objects.remove(object_id);
            if object_id == id {
                root = object;
            }
        }
        root
    }

    /// Remove every object and animation
    pub fn clear(&mut self) {
        self.objects.clear();
        self.roots.clear();
        self.animations.clear();
    }

    /// Look up an object
    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    /// Look up an object mutably
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id)
    }

    /// First object with the given name
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().find(|(_, object)| object.name == name).map(|(id, _)| id)
    }

    /// Whether `id` refers to a live object
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Root objects in insertion order
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    /// All objects, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter()
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the scene has no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Cumulative matrix of `id`, composed from the root down
    pub fn world_matrix(&self, id: ObjectId) -> Option<Matrix4> {
        let object = self.objects.get(id)?;
        let mut chain: Vec<&SceneObject> = vec![object];
        chain.extend(self.ancestors(id).filter_map(|ancestor| self.objects.get(ancestor)));

        let mut stack = ModelView::with_capacity(chain.len());
        for object in chain.iter().rev() {
            stack.push(&object.transform);
        }
        Some(stack.peek())
    }

    /// Attach an animation to its target object
    ///
    /// An animation the target already had is removed.
    pub fn add_animation(&mut self, animation: Animation) -> Result<AnimationId, SceneError> {
        let target = animation.target();
        let previous = self
            .objects
            .get(target)
            .ok_or(SceneError::ObjectNotFound(target))?
            .animation;
        if let Some(previous) = previous {
            log::debug!("Replacing animation {previous:?} on {target:?}");
            self.animations.remove(previous);
        }

        let id = self.animations.insert(animation);
        if let Some(object) = self.objects.get_mut(target) {
            object.animation = Some(id);
        }
        Ok(id)
    }

    /// Look up an animation
    pub fn animation(&self, id: AnimationId) -> Option<&Animation> {
        self.animations.get(id)
    }

    /// Look up an animation mutably
    pub fn animation_mut(&mut self, id: AnimationId) -> Option<&mut Animation> {
        self.animations.get_mut(id)
    }

    /// Detach and drop an animation
    pub fn remove_animation(&mut self, id: AnimationId) -> Option<Animation> {
        let animation = self.animations.remove(id)?;
        if let Some(object) = self.objects.get_mut(animation.target()) {
            object.animation = None;
        }
        Some(animation)
    }

    /// Number of animations
    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    /// Tick every animation by `elapsed_ms`
    ///
    /// Colour deltas go to the diffuse colour of the target's material.
    pub fn advance_animations(&mut self, elapsed_ms: f32, resources: &mut Resources) {
        for (_, animation) in &mut self.animations {
            let Some(object) = self.objects.get_mut(animation.target()) else {
                log::warn!("Animation '{}' has no target", animation.name());
                continue;
            };
            let colour = object
                .material
                .and_then(|material| resources.material_mut(material))
                .map(|material| &mut material.diffuse);
            animation.advance(elapsed_ms, &mut object.transform, colour);
        }
    }

    /// Parent chain of `id`, nearest first
    fn ancestors(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        std::iter::successors(self.objects.get(id).and_then(|object| object.parent), move |&current| {
            self.objects.get(current).and_then(|object| object.parent)
        })
    }

    /// Remove `id` from its parent's children or from the roots
    fn unlink(&mut self, id: ObjectId) {
        let parent = self.objects.get_mut(id).and_then(|object| object.parent.take());
        match parent.and_then(|parent| self.objects.get_mut(parent)) {
            Some(parent) => parent.children.retain(|&child| child != id),
            None => self.roots.retain(|&root| root != id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Keyframe;
    use crate::foundation::math::{Vector3, Vector4};
    use crate::render::colour::Colour4;
    use crate::render::material::Material;
    use crate::scene::Transform;

    fn at(name: &str, x: f32) -> SceneObject {
        SceneObject::new(name).with_transform(Transform::from_position(Vector3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_add_child_reparents() {
        let mut scene = Scene::new();
        let a = scene.add(at("a", 0.0));
        let b = scene.add(at("b", 0.0));
        let c = scene.add_under(a, at("c", 0.0)).unwrap();
        assert_eq!(scene.roots(), &[a, b]);

        scene.add_child(b, c).unwrap();
        assert!(scene.object(a).unwrap().children().is_empty());
        assert_eq!(scene.object(b).unwrap().children(), &[c]);
        assert_eq!(scene.object(c).unwrap().parent(), Some(b));

        scene.add_child(a, b).unwrap();
        assert_eq!(scene.roots(), &[a]);
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut scene = Scene::new();
        let a = scene.add(at("a", 0.0));
        let b = scene.add_under(a, at("b", 0.0)).unwrap();
        let c = scene.add_under(b, at("c", 0.0)).unwrap();

        assert_eq!(scene.add_child(c, a), Err(SceneError::CycleDetected { parent: c, child: a }));
        assert_eq!(scene.add_child(b, b), Err(SceneError::SelfParent(b)));
        assert_eq!(scene.object(c).unwrap().parent(), Some(b));
    }

    #[test]
    fn test_remove_drops_subtree_and_animations() {
        let mut scene = Scene::new();
        let a = scene.add(at("a", 0.0));
        let b = scene.add_under(a, at("b", 0.0)).unwrap();
        let keep = scene.add(at("keep", 0.0));
        let keyframes = [Keyframe::new(1.0)];
        scene.add_animation(Animation::new("spin", b, &keyframes, true).unwrap()).unwrap();
        scene.add_animation(Animation::new("idle", keep, &keyframes, true).unwrap()).unwrap();

        let removed = scene.remove(a).unwrap();
        assert_eq!(removed.name, "a");
        assert!(!scene.contains(b));
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.roots(), &[keep]);
        assert_eq!(scene.animation_count(), 1);
    }

    #[test]
    fn test_world_matrix_composes_ancestors() {
        let mut scene = Scene::new();
        let parent = scene.add(
            SceneObject::new("parent").with_transform(
                Transform::from_position(Vector3::new(1.0, 0.0, 0.0)).with_scale(Vector3::splat(2.0)),
            ),
        );
        let child = scene.add_under(parent, at("child", 1.0)).unwrap();

        let world = scene.world_matrix(child).unwrap();
        assert_eq!(world.translation(), Vector4::new(3.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_advance_animations_moves_target_and_tints_material() {
        let mut resources = Resources::new();
        let material = resources.add_material(Material::new("m").with_diffuse(Colour4::BLACK));
        let mut scene = Scene::new();
        let id = scene.add(SceneObject::new("box").with_material(material));
        let keyframes = [
            Keyframe::new(1.0).with_colour(Colour4::BLACK),
            Keyframe::new(1.0)
                .with_colour(Colour4::WHITE)
                .with_position(Vector3::new(0.0, 4.0, 0.0)),
        ];
        let animation = scene.add_animation(Animation::new("rise", id, &keyframes, false).unwrap()).unwrap();
        assert_eq!(scene.object(id).unwrap().animation(), Some(animation));

        scene.advance_animations(250.0, &mut resources);
        assert_eq!(scene.object(id).unwrap().transform.position.y(), 1.0);
        assert_eq!(resources.material(material).unwrap().diffuse.g(), 0.25);
    }
}
