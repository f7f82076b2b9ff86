//! Keyframe animation
//!
//! An [`Animation`] is built from a list of [`Keyframe`]s. Each keyframe holds
//! for `time` seconds and then blends linearly into the next one; the list is
//! cyclic, so the last keyframe blends back into the first. At construction
//! every keyframe pair becomes an [`AnimationFrame`] carrying per-millisecond
//! deltas, and each tick adds `delta * elapsed` onto the target's transform
//! and diffuse colour.
//!
//! The accumulation is additive rather than an absolute interpolation, so
//! long runs with uneven frame times can drift slightly from the keyframe
//! values.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use thiserror::Error;

use crate::foundation::math::Vector3;
use crate::render::colour::Colour4;
use crate::scene::{ObjectId, Transform};

new_key_type! {
    /// Id of an [`Animation`] registered with a scene
    pub struct AnimationId;
}

/// Errors raised while building an animation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// The keyframe list was empty
    #[error("Animation needs at least one keyframe")]
    NoKeyframes,

    /// A keyframe lasts zero or negative time
    #[error("Keyframe {index} has non-positive duration {time}s")]
    NonPositiveDuration {
        /// Index of the offending keyframe
        index: usize,
        /// Its duration in seconds
        time: f32,
    },
}

/// Target state at one point of an animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keyframe {
    /// Seconds spent moving from this keyframe to the next
    pub time: f32,
    /// Diffuse colour
    pub colour: Colour4,
    /// Position
    pub position: Vector3,
    /// Rotation in degrees
    pub rotation: Vector3,
    /// Scale
    pub scale: Vector3,
}

impl Keyframe {
    /// Keyframe at the identity pose, white, lasting `time` seconds
    pub fn new(time: f32) -> Self {
        Self {
            time,
            colour: Colour4::WHITE,
            position: Vector3::ZERO,
            rotation: Vector3::ZERO,
            scale: Vector3::ONE,
        }
    }

    /// Set the colour
    #[must_use]
    pub fn with_colour(mut self, colour: Colour4) -> Self {
        self.colour = colour;
        self
    }

    /// Set the position
    #[must_use]
    pub fn with_position(mut self, position: Vector3) -> Self {
        self.position = position;
        self
    }

    /// Set the rotation
    #[must_use]
    pub fn with_rotation(mut self, rotation: Vector3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the scale
    #[must_use]
    pub fn with_scale(mut self, scale: Vector3) -> Self {
        self.scale = scale;
        self
    }
}

impl Default for Keyframe {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// One segment between consecutive keyframes
///
/// Deltas are per millisecond and kept unrounded; slopes this small would
/// lose most of their precision to component cleaning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    /// Segment start in milliseconds
    pub start: f32,
    /// Segment end in milliseconds
    pub end: f32,
    /// Colour change per millisecond
    pub colour: [f32; 4],
    /// Position change per millisecond
    pub position: [f32; 3],
    /// Rotation change per millisecond
    pub rotation: [f32; 3],
    /// Scale change per millisecond
    pub scale: [f32; 3],
}

fn slope<const N: usize>(from: [f32; N], to: [f32; N], millis: f32) -> [f32; N] {
    std::array::from_fn(|i| (to[i] - from[i]) / millis)
}

fn scaled(delta: [f32; 3], factor: f32) -> Vector3 {
    Vector3::from_array(delta.map(|d| d * factor))
}

impl AnimationFrame {
    fn between(start: f32, current: &Keyframe, next: &Keyframe) -> Self {
        let millis = current.time * 1000.0;
        Self {
            start,
            end: start + millis,
            colour: slope(current.colour.to_array(), next.colour.to_array(), millis),
            position: slope(current.position.to_array(), next.position.to_array(), millis),
            rotation: slope(current.rotation.to_array(), next.rotation.to_array(), millis),
            scale: slope(current.scale.to_array(), next.scale.to_array(), millis),
        }
    }

    /// Segment length in milliseconds
    pub fn duration(&self) -> f32 {
        self.end - self.start
    }

    fn apply(&self, elapsed: f32, transform: &mut Transform, colour: Option<&mut Colour4>) {
        transform.position.sum(scaled(self.position, elapsed));
        transform.rotation.sum(scaled(self.rotation, elapsed));
        transform.scale.sum(scaled(self.scale, elapsed));
        if let Some(colour) = colour {
            colour.offset(self.colour, elapsed);
        }
    }
}

/// Playback state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnimationState {
    /// Advancing on every tick
    #[default]
    Playing,
    /// Reached the end without looping; ticks are ignored
    Stopped,
}

/// Keyframe animation of one scene object
#[derive(Debug, Clone)]
pub struct Animation {
    name: String,
    target: ObjectId,
    frames: Vec<AnimationFrame>,
    length: f32,
    looping: bool,
    frame_time: f32,
    max_frame_time: f32,
    current_frame: usize,
    state: AnimationState,
}

impl Animation {
    /// Build an animation of `target` from its keyframes
    pub fn new(
        name: impl Into<String>,
        target: ObjectId,
        keyframes: &[Keyframe],
        looping: bool,
    ) -> Result<Self, AnimationError> {
        if keyframes.is_empty() {
            return Err(AnimationError::NoKeyframes);
        }
        if let Some((index, keyframe)) = keyframes.iter().enumerate().find(|(_, k)| k.time <= 0.0 || !k.time.is_finite()) {
            return Err(AnimationError::NonPositiveDuration { index, time: keyframe.time });
        }

        let mut frames = Vec::with_capacity(keyframes.len());
        let mut start = 0.0;
        for (index, current) in keyframes.iter().enumerate() {
            let next = &keyframes[(index + 1) % keyframes.len()];
            let frame = AnimationFrame::between(start, current, next);
            start = frame.end;
            frames.push(frame);
        }

        let length = keyframes.iter().map(|k| k.time).sum();
        let name = name.into();
        log::debug!("Animation '{name}': {} segments, {length}s, looping {looping}", frames.len());

        Ok(Self {
            name,
            target,
            frames,
            length,
            looping,
            frame_time: 0.0,
            max_frame_time: start,
            current_frame: 0,
            state: AnimationState::Playing,
        })
    }

    /// Name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object this animation moves
    pub fn target(&self) -> ObjectId {
        self.target
    }

    /// Segments
    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    /// Total length in seconds
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Whether playback wraps at the end
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Set whether playback wraps at the end
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Milliseconds into the animation
    pub fn frame_time(&self) -> f32 {
        self.frame_time
    }

    /// Total length in milliseconds
    pub fn max_frame_time(&self) -> f32 {
        self.max_frame_time
    }

    /// Index of the segment being played
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Playback state
    pub fn state(&self) -> AnimationState {
        self.state
    }

    /// Rewind to the start and resume playing
    ///
    /// The target keeps its current pose.
    pub fn reset(&mut self) {
        self.frame_time = 0.0;
        self.current_frame = 0;
        self.state = AnimationState::Playing;
    }

    /// Advance by `elapsed_ms`, applying the deltas to `transform` and
    /// `colour`
    ///
    /// Time left over after a segment ends carries into the following
    /// segments within the same call.
    pub fn advance(&mut self, elapsed_ms: f32, transform: &mut Transform, mut colour: Option<&mut Colour4>) {
        if self.state == AnimationState::Stopped {
            return;
        }
        if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            log::debug!("Animation '{}' ignoring tick of {elapsed_ms}ms", self.name);
            return;
        }

        let mut remaining = elapsed_ms;
        if self.looping && remaining >= self.max_frame_time {
            // whole cycles return the target to where it started
            remaining %= self.max_frame_time;
            if remaining <= 0.0 {
                return;
            }
        }
        loop {
            let frame = self.frames[self.current_frame];
            let room = frame.end - self.frame_time;

            if remaining < room {
                frame.apply(remaining, transform, colour.as_deref_mut());
                self.frame_time += remaining;
                return;
            }

            frame.apply(room, transform, colour.as_deref_mut());
            self.frame_time = frame.end;
            remaining -= room;

            if self.current_frame + 1 < self.frames.len() {
                self.current_frame += 1;
            } else if self.looping {
                self.current_frame = 0;
                self.frame_time = 0.0;
            } else {
                log::debug!("Animation '{}' finished", self.name);
                self.state = AnimationState::Stopped;
                return;
            }

            if remaining <= 0.0 {
                return;
            }
        }
    }
}
