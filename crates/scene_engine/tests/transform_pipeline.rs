//! Integration tests for the numeric core: composition order, stack
//! discipline, light slots, projection and animation playback.

use approx::assert_relative_eq;
use scene_engine::animation::AnimationState;
use scene_engine::foundation::math::{Matrix3, Matrix4, Vector3, Vector4};
use scene_engine::prelude::*;
use scene_engine::render::lighting::{LightKind, LightRegistry};
use scene_engine::render::projection;
use scene_engine::scene::ModelView;

#[test]
fn test_compose_matches_literal_matrix() {
    let transform = Transform::from_position(Vector3::new(1.0, 2.0, 3.0))
        .with_rotation(Vector3::new(0.0, 0.0, 90.0))
        .with_scale(Vector3::splat(2.0));

    let composed = ModelView::compose(&Matrix4::IDENTITY, &transform);

    #[rustfmt::skip]
    let expected = Matrix4::new(
        0.0, -2.0, 0.0, 1.0,
        2.0,  0.0, 0.0, 2.0,
        0.0,  0.0, 2.0, 3.0,
        0.0,  0.0, 0.0, 1.0,
    );
    assert_eq!(composed, expected);
}

#[test]
fn test_translation_column_of_pushed_transform() {
    let mut stack = ModelView::new();
    let top = stack.push(&Transform::from_position(Vector3::new(1.0, 0.0, 0.0)));
    assert_eq!(top.column(3), Vector4::new(1.0, 0.0, 0.0, 1.0));
}

#[test]
fn test_child_is_placed_in_parent_space() {
    let mut stack = ModelView::new();
    stack.push(
        &Transform::from_position(Vector3::new(0.0, 0.0, -5.0)).with_rotation(Vector3::new(0.0, 90.0, 0.0)),
    );
    let child = stack.push(&Transform::from_position(Vector3::new(1.0, 0.0, 0.0)));

    assert_eq!(child.translation(), Vector4::new(0.0, 0.0, -6.0, 1.0));
}

#[test]
fn test_stack_balance_returns_to_identity() {
    let mut stack = ModelView::new();
    stack.push(&Transform::from_position(Vector3::ONE));
    stack.push(&Transform::new().with_rotation(Vector3::new(30.0, 0.0, 0.0)));
    stack.pop();
    stack.pop();

    assert_eq!(stack.peek(), Matrix4::IDENTITY);
    assert_eq!(stack.pop(), Matrix4::IDENTITY);
}

#[test]
fn test_light_capacity_and_slot_reuse() {
    let mut lights = LightRegistry::new();

    assert!(lights.add(AmbientLight::default()).is_some());
    assert!(lights.add(AmbientLight::default()).is_none());
    assert_eq!(lights.count(LightKind::Ambient), 1);

    let handles: Vec<_> = (0..8)
        .map(|i| lights.add(PointLight::default().with_radius(i as f32 + 1.0)).unwrap())
        .collect();
    assert!(lights.add(PointLight::default()).is_none());

    lights.remove(handles[3]).unwrap();
    let reused = lights.add(PointLight::default().with_radius(42.0)).unwrap();
    assert_eq!(reused.slot(), 3);
    assert_eq!(lights.count(LightKind::Point), 8);

    let radii: Vec<f32> = lights.point_lights().map(|light| light.radius).collect();
    assert_eq!(radii, vec![1.0, 2.0, 3.0, 42.0, 5.0, 6.0, 7.0, 8.0]);
}

#[test]
fn test_perspective_edge_case() {
    let bounds = projection::perspective_bounds(1.0, 90.0, 1.0);
    assert_eq!(bounds.top, 1.0);

    let matrix = projection::perspective(1.0, 100.0, 90.0, 1.0);
    assert_eq!(matrix.get(1, 1), 2.0 * 1.0 / bounds.height());
    assert_relative_eq!(matrix.get(2, 2), -101.0 / 99.0, epsilon = 1e-4);
    assert_relative_eq!(matrix.get(2, 3), -200.0 / 99.0, epsilon = 1e-4);
    assert_eq!(matrix.get(3, 2), -1.0);
}

#[test]
fn test_zero_scale_inverse_is_unchanged() {
    let degenerate = Transform::new().with_scale(Vector3::new(0.0, 1.0, 1.0)).local_matrix();
    assert_eq!(degenerate.determinant(), 0.0);
    assert_eq!(degenerate.inverse(), degenerate);
    assert!(degenerate.inverse().to_cols_array().iter().all(|value| value.is_finite()));
}

#[test]
fn test_inverse_round_trip() {
    let matrix = Transform::from_position(Vector3::new(3.0, -1.0, 2.0))
        .with_rotation(Vector3::new(10.0, 20.0, 30.0))
        .with_scale(Vector3::new(1.0, 2.0, 0.5))
        .local_matrix();

    assert_relative_eq!(matrix.inverse().inverse(), matrix, epsilon = 1e-3);
    assert_relative_eq!(matrix * matrix.inverse(), Matrix4::IDENTITY, epsilon = 1e-3);
}

#[test]
fn test_small_scale_transform_inverts() {
    for scale in [0.05, 0.01] {
        let matrix = Transform::from_position(Vector3::new(2.0, 0.0, -1.0))
            .with_scale(Vector3::splat(scale))
            .local_matrix();

        assert_relative_eq!(matrix.inverse().get(0, 0), 1.0 / scale, epsilon = 1e-3);
        assert_relative_eq!(matrix * matrix.inverse(), Matrix4::IDENTITY, epsilon = 1e-4);
    }
}

#[test]
fn test_normal_matrix_of_scaled_down_object() {
    let mut stack = ModelView::new();
    let model_view = stack.push(&Transform::new().with_scale(Vector3::new(0.01, 0.05, 1.0)));

    let normal = Matrix3::from(model_view).inverse().transposed();
    assert_relative_eq!(normal.get(0, 0), 100.0, epsilon = 1e-2);
    assert_relative_eq!(normal.get(1, 1), 20.0, epsilon = 1e-3);
    assert_relative_eq!(normal.get(2, 2), 1.0, epsilon = 1e-4);
}

fn engine_with_animation(looping: bool) -> (Engine, ObjectId) {
    let mut engine = Engine::new(ApplicationConfig::default()).unwrap();
    let id = engine.scene.add(SceneObject::new("mover"));
    let keyframes = [
        Keyframe::new(1.0),
        Keyframe::new(1.0).with_position(Vector3::new(0.0, 0.0, 10.0)),
    ];
    engine.animate("move", id, &keyframes, looping).unwrap();
    (engine, id)
}

#[test]
fn test_animation_loops_after_full_cycle() {
    let (mut engine, id) = engine_with_animation(true);
    for _ in 0..25 {
        engine.advance_animations(100.0);
    }

    let animation_id = engine.scene.object(id).unwrap().animation().unwrap();
    let animation = engine.scene.animation(animation_id).unwrap();
    assert_eq!(animation.current_frame(), 0);
    assert_relative_eq!(animation.frame_time(), 500.0, epsilon = 1e-2);
    assert_relative_eq!(engine.scene.object(id).unwrap().transform.position.z(), 5.0, epsilon = 1e-3);
}

#[test]
fn test_non_looping_animation_stops() {
    let (mut engine, id) = engine_with_animation(false);
    engine.advance_animations(2500.0);

    let animation_id = engine.scene.object(id).unwrap().animation().unwrap();
    let frame_time = engine.scene.animation(animation_id).unwrap().frame_time();
    assert_eq!(engine.scene.animation(animation_id).unwrap().state(), AnimationState::Stopped);

    engine.advance_animations(300.0);
    assert_eq!(engine.scene.animation(animation_id).unwrap().frame_time(), frame_time);
    assert_eq!(engine.scene.object(id).unwrap().transform.position, Vector3::ZERO);
}
