//! ECS components for the simulation.
//!
//! Every simulated entity carries a `Position`, a `Size` and a `Kind`
//! tag plus exactly one variant component: `Player`, `Unit` or
//! `Structure`. The grid only ever stores `Occupant` handles.

use crate::geometry::{Aabb, Direction};
use crate::presets::{self, Rgba};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// Center of an entity in world coordinates (origin top-left).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = f32::from(other.x) - f32::from(self.x);
        let dy = f32::from(other.y) - f32::from(self.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Heading from this point towards `other`.
    pub fn angle_to(&self, other: &Position) -> f32 {
        crate::geometry::angle_between(
            f32::from(self.x),
            f32::from(self.y),
            f32::from(other.x),
            f32::from(other.y),
        )
    }
}

/// Footprint width and height.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub w: u16,
    pub h: u16,
}

impl Size {
    pub fn new(w: u16, h: u16) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> u32 {
        u32::from(self.w) * u32::from(self.h)
    }

    /// Footprint reduced by `by` on each axis.
    pub fn shrunk(&self, by: u16) -> Self {
        Self {
            w: self.w.saturating_sub(by),
            h: self.h.saturating_sub(by),
        }
    }
}

/// Bounding box of a footprint centered on `pos`.
pub fn bounds(pos: Position, size: Size) -> Aabb {
    Aabb::centered(i32::from(pos.x), i32::from(pos.y), size.w, size.h)
}

// ============================================================================
// IDENTITY
// ============================================================================

/// Which variant component an entity carries.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Player,
    Unit,
    Structure,
}

impl Kind {
    /// Stable small integer per kind, used for cellsign flag bits.
    pub const fn discriminant(self) -> u8 {
        match self {
            Kind::Player => 0,
            Kind::Unit => 1,
            Kind::Structure => 2,
        }
    }
}

/// Tagged handle stored in grid cells and sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occupant {
    pub entity: Entity,
    pub kind: Kind,
}

impl Occupant {
    pub fn new(entity: Entity, kind: Kind) -> Self {
        Self { entity, kind }
    }

    pub fn is_unit(&self) -> bool {
        self.kind == Kind::Unit
    }
}

// ============================================================================
// VARIANT COMPONENTS
// ============================================================================

/// Who drives a player entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    /// Driven by the local input bitmask.
    Local,
    /// Placeholder for network/AI control; receives no input here.
    Remote,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub control: Control,
    pub facing: Direction,
    /// Structure class selected for placement, awaiting confirmation.
    pub build_guide: Option<u8>,
}

impl Player {
    pub fn new(control: Control) -> Self {
        Self {
            control,
            facing: Direction::default(),
            build_guide: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.control == Control::Local
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub class: u8,
    /// Remaining ticks before despawn; 0 means the unit never expires.
    pub life: u32,
    /// Point the unit currently steers towards.
    pub target: Position,
    /// Position before the last movement step, for render interpolation.
    pub last_step: Position,
    /// Set while the unit is absorbing a push, cleared before it returns.
    pub being_pushed: bool,
}

impl Unit {
    pub fn new(class: u8, life: u32, at: Position) -> Self {
        Self {
            class,
            life,
            target: at,
            last_step: at,
            being_pushed: false,
        }
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub class: u8,
    /// Ticks until the next spawn attempt.
    pub pulse: u32,
}

/// Per-variant accessors used by the renderer-facing snapshot.
pub trait Body: Component {
    const KIND: Kind;

    fn class(&self) -> u8;

    fn color(&self) -> Rgba;
}

impl Body for Player {
    const KIND: Kind = Kind::Player;

    fn class(&self) -> u8 {
        0
    }

    fn color(&self) -> Rgba {
        presets::player_preset(self.control).color
    }
}

impl Body for Unit {
    const KIND: Kind = Kind::Unit;

    fn class(&self) -> u8 {
        self.class
    }

    fn color(&self) -> Rgba {
        presets::unit_preset(self.class)
            .map(|p| p.color)
            .unwrap_or([0xff, 0x00, 0xff, 0xff])
    }
}

impl Body for Structure {
    const KIND: Kind = Kind::Structure;

    fn class(&self) -> u8 {
        self.class
    }

    fn color(&self) -> Rgba {
        presets::structure_preset(self.class)
            .map(|p| p.color)
            .unwrap_or([0xff, 0x00, 0xff, 0xff])
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

#[derive(Bundle)]
pub struct PlayerBundle {
    pub position: Position,
    pub size: Size,
    pub kind: Kind,
    pub player: Player,
}

impl PlayerBundle {
    pub fn new(control: Control, position: Position) -> Self {
        Self {
            position,
            size: presets::player_preset(control).size,
            kind: Kind::Player,
            player: Player::new(control),
        }
    }
}

#[derive(Bundle)]
pub struct UnitBundle {
    pub position: Position,
    pub size: Size,
    pub kind: Kind,
    pub unit: Unit,
}

impl UnitBundle {
    /// `None` for an unknown class.
    pub fn new(class: u8, position: Position) -> Option<Self> {
        let preset = presets::unit_preset(class)?;
        Some(Self {
            position,
            size: preset.size,
            kind: Kind::Unit,
            unit: Unit::new(class, preset.life, position),
        })
    }
}

#[derive(Bundle)]
pub struct StructureBundle {
    pub position: Position,
    pub size: Size,
    pub kind: Kind,
    pub structure: Structure,
}

impl StructureBundle {
    /// `None` for an unknown class.
    pub fn new(class: u8, position: Position) -> Option<Self> {
        let preset = presets::structure_preset(class)?;
        Some(Self {
            position,
            size: preset.size,
            kind: Kind::Structure,
            structure: Structure {
                class,
                pulse: preset.pulse_ticks,
            },
        })
    }
}
