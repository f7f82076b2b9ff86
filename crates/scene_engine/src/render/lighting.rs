//! Lighting system
//!
//! Lights are a tagged union of [`AmbientLight`], [`DirectionalLight`] and
//! [`PointLight`], registered in a [`LightRegistry`] with a fixed number of
//! slots per kind. Shaders declare uniform arrays of exactly these sizes, so a
//! light that does not fit is rejected rather than silently dropped at draw
//! time.

use crate::foundation::math::{clamp, Vector3};
use crate::render::colour::Colour4;

/// Maximum number of ambient lights
pub const MAX_AMBIENT: usize = 1;
/// Maximum number of directional lights
pub const MAX_DIRECTIONAL: usize = 3;
/// Maximum number of point lights
pub const MAX_POINT: usize = 8;
/// Maximum number of lights of all kinds
pub const MAX_LIGHTS: usize = MAX_AMBIENT + MAX_DIRECTIONAL + MAX_POINT;

/// Uniform light applied to every surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    /// Light colour
    pub colour: Colour4,
    /// Light intensity
    pub intensity: f32,
}

impl AmbientLight {
    /// Create an ambient light
    pub fn new(colour: Colour4, intensity: f32) -> Self {
        Self { colour, intensity }
    }
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self::new(Colour4::WHITE, 1.0)
    }
}

/// Light arriving from a direction (like sunlight)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Light colour
    pub colour: Colour4,
    /// Light intensity
    pub intensity: f32,
    /// Direction the light travels in
    pub direction: Vector3,
}

impl DirectionalLight {
    /// Create a directional light
    pub fn new(colour: Colour4, intensity: f32, direction: Vector3) -> Self {
        Self { colour, intensity, direction }
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Colour4::WHITE, 1.0, Vector3::UNIT_Z)
    }
}

/// Light emitted from a point within a radius (like a lightbulb)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Light colour
    pub colour: Colour4,
    /// Light intensity
    pub intensity: f32,
    /// Position in world space
    pub position: Vector3,
    /// Range the light reaches
    pub radius: f32,
    /// Specular exponent
    pub shininess: f32,
    angle: f32,
}

impl PointLight {
    /// Create a point light with the default radius, angle and shininess
    pub fn new(colour: Colour4, intensity: f32, position: Vector3) -> Self {
        Self {
            colour,
            intensity,
            position,
            radius: 5.0,
            shininess: 32.0,
            angle: 180.0,
        }
    }

    /// Set the radius
    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Set the cone angle
    #[must_use]
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.set_angle(angle);
        self
    }

    /// Set the shininess
    #[must_use]
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    /// Cone angle in degrees: 180 lights a full sphere, smaller values a spot
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Set the cone angle, clamped to `0..=180` degrees
    pub fn set_angle(&mut self, angle: f32) {
        self.angle = clamp(angle, 0.0, 180.0);
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self::new(Colour4::WHITE, 1.0, Vector3::ZERO)
    }
}

/// Any light the registry can hold
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Ambient light
    Ambient(AmbientLight),
    /// Directional light
    Directional(DirectionalLight),
    /// Point light
    Point(PointLight),
}

impl Light {
    /// Kind of this light
    pub fn kind(&self) -> LightKind {
        match self {
            Self::Ambient(_) => LightKind::Ambient,
            Self::Directional(_) => LightKind::Directional,
            Self::Point(_) => LightKind::Point,
        }
    }

    /// Light colour
    pub fn colour(&self) -> Colour4 {
        match self {
            Self::Ambient(light) => light.colour,
            Self::Directional(light) => light.colour,
            Self::Point(light) => light.colour,
        }
    }

    /// Light intensity
    pub fn intensity(&self) -> f32 {
        match self {
            Self::Ambient(light) => light.intensity,
            Self::Directional(light) => light.intensity,
            Self::Point(light) => light.intensity,
        }
    }
}

impl From<AmbientLight> for Light {
    fn from(light: AmbientLight) -> Self {
        Self::Ambient(light)
    }
}

impl From<DirectionalLight> for Light {
    fn from(light: DirectionalLight) -> Self {
        Self::Directional(light)
    }
}

impl From<PointLight> for Light {
    fn from(light: PointLight) -> Self {
        Self::Point(light)
    }
}

/// Light categories, each with its own slot capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Ambient lights
    Ambient,
    /// Directional lights
    Directional,
    /// Point lights
    Point,
}

impl LightKind {
    /// Number of slots for this kind
    pub const fn capacity(self) -> usize {
        match self {
            Self::Ambient => MAX_AMBIENT,
            Self::Directional => MAX_DIRECTIONAL,
            Self::Point => MAX_POINT,
        }
    }
}

/// Reference to a registered light
///
/// The generation makes a handle stale once its light is removed, even if a
/// later light reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightHandle {
    kind: LightKind,
    slot: usize,
    generation: u32,
}

impl LightHandle {
    /// Kind of the referenced light
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// Slot the light occupies within its kind
    pub fn slot(&self) -> usize {
        self.slot
    }
}

#[derive(Debug, Clone)]
struct SlotTable<T, const N: usize> {
    slots: [Option<T>; N],
    generations: [u32; N],
    count: usize,
}

impl<T, const N: usize> SlotTable<T, N> {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            generations: [0; N],
            count: 0,
        }
    }

    /// First-fit insert; returns the slot and its generation
    fn insert(&mut self, value: T) -> Option<(usize, u32)> {
        let slot = self.slots.iter().position(Option::is_none)?;
        self.slots[slot] = Some(value);
        self.count += 1;
        Some((slot, self.generations[slot]))
    }

    fn remove(&mut self, slot: usize, generation: u32) -> Option<T> {
        if self.generations.get(slot) != Some(&generation) {
            return None;
        }

        let value = self.slots[slot].take()?;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.count -= 1;
        Some(value)
    }

    fn get(&self, slot: usize, generation: u32) -> Option<&T> {
        if self.generations.get(slot) != Some(&generation) {
            return None;
        }
        self.slots[slot].as_ref()
    }

    fn get_mut(&mut self, slot: usize, generation: u32) -> Option<&mut T> {
        if self.generations.get(slot) != Some(&generation) {
            return None;
        }
        self.slots[slot].as_mut()
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    fn clear(&mut self) {
        for (slot, generation) in self.slots.iter_mut().zip(self.generations.iter_mut()) {
            if slot.take().is_some() {
                *generation = generation.wrapping_add(1);
            }
        }
        self.count = 0;
    }
}

/// Bounded registry of scene lights
///
/// Slots are reused first-fit: after a removal the lowest free slot of that
/// kind is filled next. Enumeration is in slot order, which is the order the
/// renderer assigns uniform array indices in.
#[derive(Debug, Clone)]
pub struct LightRegistry {
    ambient: SlotTable<AmbientLight, MAX_AMBIENT>,
    directional: SlotTable<DirectionalLight, MAX_DIRECTIONAL>,
    point: SlotTable<PointLight, MAX_POINT>,
}

impl LightRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            ambient: SlotTable::new(),
            directional: SlotTable::new(),
            point: SlotTable::new(),
        }
    }

    /// Register a light
    ///
    /// Returns `None` and leaves the registry unchanged when every slot of
    /// the light's kind is taken.
    pub fn add(&mut self, light: impl Into<Light>) -> Option<LightHandle> {
        let light = light.into();
        let kind = light.kind();
        let inserted = match light {
            Light::Ambient(light) => self.ambient.insert(light),
            Light::Directional(light) => self.directional.insert(light),
            Light::Point(light) => self.point.insert(light),
        };

        match inserted {
            Some((slot, generation)) => {
                log::debug!("Registered {kind:?} light in slot {slot}");
                Some(LightHandle { kind, slot, generation })
            }
            None => {
                log::warn!("Rejected {kind:?} light: all {} slots in use", kind.capacity());
                None
            }
        }
    }

    /// Unregister a light, returning it
    ///
    /// Removing a light that is not registered (a stale handle) does nothing.
    pub fn remove(&mut self, handle: LightHandle) -> Option<Light> {
        let LightHandle { kind, slot, generation } = handle;
        let removed = match kind {
            LightKind::Ambient => self.ambient.remove(slot, generation).map(Light::Ambient),
            LightKind::Directional => self.directional.remove(slot, generation).map(Light::Directional),
            LightKind::Point => self.point.remove(slot, generation).map(Light::Point),
        };

        if removed.is_some() {
            log::debug!("Removed {kind:?} light from slot {slot}");
        }
        removed
    }

    /// Copy of a registered light
    pub fn get(&self, handle: LightHandle) -> Option<Light> {
        let LightHandle { kind, slot, generation } = handle;
        match kind {
            LightKind::Ambient => self.ambient.get(slot, generation).copied().map(Light::Ambient),
            LightKind::Directional => self.directional.get(slot, generation).copied().map(Light::Directional),
            LightKind::Point => self.point.get(slot, generation).copied().map(Light::Point),
        }
    }

    /// Mutable access to a registered ambient light
    pub fn ambient_mut(&mut self, handle: LightHandle) -> Option<&mut AmbientLight> {
        match handle.kind {
            LightKind::Ambient => self.ambient.get_mut(handle.slot, handle.generation),
            _ => None,
        }
    }

    /// Mutable access to a registered directional light
    pub fn directional_mut(&mut self, handle: LightHandle) -> Option<&mut DirectionalLight> {
        match handle.kind {
            LightKind::Directional => self.directional.get_mut(handle.slot, handle.generation),
            _ => None,
        }
    }

    /// Mutable access to a registered point light
    pub fn point_mut(&mut self, handle: LightHandle) -> Option<&mut PointLight> {
        match handle.kind {
            LightKind::Point => self.point.get_mut(handle.slot, handle.generation),
            _ => None,
        }
    }

    /// Whether the handle refers to a registered light
    pub fn contains(&self, handle: LightHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of registered lights of a kind
    pub fn count(&self, kind: LightKind) -> usize {
        match kind {
            LightKind::Ambient => self.ambient.count,
            LightKind::Directional => self.directional.count,
            LightKind::Point => self.point.count,
        }
    }

    /// Total number of registered lights
    pub fn len(&self) -> usize {
        self.ambient.count + self.directional.count + self.point.count
    }

    /// Whether no light is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ambient light, if registered
    pub fn ambient(&self) -> Option<&AmbientLight> {
        self.ambient.iter().next()
    }

    /// Registered directional lights in slot order
    pub fn directional_lights(&self) -> impl Iterator<Item = &DirectionalLight> {
        self.directional.iter()
    }

    /// Registered point lights in slot order
    pub fn point_lights(&self) -> impl Iterator<Item = &PointLight> {
        self.point.iter()
    }

    /// Remove every light, invalidating all handles
    pub fn clear(&mut self) {
        self.ambient.clear();
        self.directional.clear();
        self.point.clear();
    }
}

impl Default for LightRegistry {
    fn default() -> Self {
        Self::new()
    }
}
