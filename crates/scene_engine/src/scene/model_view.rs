//! Hierarchical transform stack
//!
//! [`ModelView`] accumulates transforms during a depth-first walk of the
//! scene: entering an object pushes its transform composed onto the parent's
//! cumulative matrix, leaving the object pops it again. The top of the stack
//! is always the matrix of the object currently being visited.
//!
//! The stack is frame-local and owned by one traversal at a time.

use crate::foundation::math::Matrix4;
use crate::scene::transform::Transform;

/// Stack of cumulative model-view matrices
#[derive(Debug, Clone, Default)]
pub struct ModelView {
    stack: Vec<Matrix4>,
}

impl ModelView {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty stack with room for `depth` nested transforms
    pub fn with_capacity(depth: usize) -> Self {
        Self { stack: Vec::with_capacity(depth) }
    }

    /// Compose `transform` onto `parent`
    ///
    /// The result is `parent · T · (Rz · Ry · Rx) · S · H`. The order is not
    /// commutative: the object is sheared, scaled, rotated and translated in
    /// its parent's space, and only then carried along by the parent.
    pub fn compose(parent: &Matrix4, transform: &Transform) -> Matrix4 {
        let mut matrix = *parent;
        matrix
            .mult(&transform.translation_matrix())
            .mult(&transform.rotation_matrix())
            .mult(&transform.scale_matrix())
            .mult(&transform.shear_matrix());
        matrix
    }

    /// Push `transform` composed onto the current top
    pub fn push(&mut self, transform: &Transform) -> Matrix4 {
        let matrix = Self::compose(&self.peek(), transform);
        self.stack.push(matrix);
        matrix
    }

    /// Push a precomposed matrix
    pub fn push_matrix(&mut self, matrix: Matrix4) {
        self.stack.push(matrix);
    }

    /// Current top, or the identity when the stack is empty
    pub fn peek(&self) -> Matrix4 {
        self.stack.last().copied().unwrap_or(Matrix4::IDENTITY)
    }

    /// Remove and return the top
    ///
    /// Popping an empty stack returns the identity and leaves the stack
    /// empty.
    pub fn pop(&mut self) -> Matrix4 {
        self.stack.pop().unwrap_or_else(|| {
            log::debug!("ModelView pop on empty stack");
            Matrix4::IDENTITY
        })
    }

    /// Number of matrices on the stack
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether the stack is empty
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Drop every matrix
    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Vector3, Vector4};

    #[test]
    fn test_translation_lands_in_last_column() {
        let mut model_view = ModelView::new();
        let top = model_view.push(&Transform::from_position(Vector3::new(1.0, 0.0, 0.0)));
        assert_eq!(top.translation(), Vector4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(model_view.peek(), top);
    }

    #[test]
    fn test_push_pop_balance() {
        let mut model_view = ModelView::new();
        let before = model_view.peek();
        model_view.push(&Transform::from_position(Vector3::new(1.0, 2.0, 3.0)));
        model_view.push(&Transform::new().with_scale(Vector3::splat(2.0)));
        model_view.pop();
        model_view.pop();
        assert_eq!(model_view.peek(), before);
        assert_eq!(before, Matrix4::IDENTITY);
    }

    #[test]
    fn test_pop_empty_is_identity() {
        let mut model_view = ModelView::new();
        assert_eq!(model_view.pop(), Matrix4::IDENTITY);
        assert!(model_view.is_empty());
    }

    #[test]
    fn test_child_inherits_parent_rotation() {
        let mut model_view = ModelView::new();
        model_view.push(&Transform::new().with_rotation(Vector3::new(0.0, 0.0, 90.0)));
        let child = model_view.push(&Transform::from_position(Vector3::new(1.0, 0.0, 0.0)));
        assert_eq!(child.transform_point(Vector3::ZERO), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(model_view.depth(), 2);
    }

    #[test]
    fn test_scale_applies_before_translation() {
        let transform = Transform::from_position(Vector3::new(5.0, 0.0, 0.0)).with_scale(Vector3::splat(2.0));
        let matrix = ModelView::compose(&Matrix4::IDENTITY, &transform);
        assert_eq!(matrix.transform_point(Vector3::new(1.0, 0.0, 0.0)), Vector3::new(7.0, 0.0, 0.0));
    }
}
