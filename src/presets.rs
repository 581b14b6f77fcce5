//! Static property templates selected by a small class index.

use crate::components::{Control, Size};

/// RGBA color handed to the renderer.
pub type Rgba = [u8; 4];

/// Template for an autonomous unit class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPreset {
    pub name: &'static str,
    /// World units per second.
    pub speed: f32,
    pub size: Size,
    /// Ticks before despawn. 0 = never.
    pub life: u32,
    pub color: Rgba,
}

/// Template for a structure class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructurePreset {
    pub name: &'static str,
    pub size: Size,
    /// Ticks between spawn attempts.
    pub pulse_ticks: u32,
    /// Unit class produced on each pulse, if any.
    pub spawns: Option<u8>,
    pub color: Rgba,
}

/// Template for players.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPreset {
    pub speed: f32,
    pub size: Size,
    pub color: Rgba,
}

pub const UNIT_PRESETS: [UnitPreset; 3] = [
    UnitPreset {
        name: "scout",
        speed: 90.0,
        size: Size { w: 16, h: 16 },
        life: 0,
        color: [0x4c, 0xaf, 0x50, 0xff],
    },
    UnitPreset {
        name: "trooper",
        speed: 60.0,
        size: Size { w: 20, h: 20 },
        life: 1800,
        color: [0x21, 0x96, 0xf3, 0xff],
    },
    UnitPreset {
        name: "hauler",
        speed: 60.0,
        size: Size { w: 28, h: 24 },
        life: 3600,
        color: [0xff, 0x98, 0x00, 0xff],
    },
];

pub const STRUCTURE_PRESETS: [StructurePreset; 3] = [
    StructurePreset {
        name: "barracks",
        size: Size { w: 48, h: 48 },
        pulse_ticks: 90,
        spawns: Some(1),
        color: [0x79, 0x55, 0x48, 0xff],
    },
    StructurePreset {
        name: "outpost",
        size: Size { w: 32, h: 32 },
        pulse_ticks: 150,
        spawns: Some(0),
        color: [0x60, 0x7d, 0x8b, 0xff],
    },
    StructurePreset {
        name: "wall",
        size: Size { w: 32, h: 32 },
        pulse_ticks: 0,
        spawns: None,
        color: [0x9e, 0x9e, 0x9e, 0xff],
    },
];

pub const LOCAL_PLAYER: PlayerPreset = PlayerPreset {
    speed: 120.0,
    size: Size { w: 16, h: 16 },
    color: [0xff, 0xeb, 0x3b, 0xff],
};

pub const REMOTE_PLAYER: PlayerPreset = PlayerPreset {
    speed: 120.0,
    size: Size { w: 16, h: 16 },
    color: [0xe9, 0x1e, 0x63, 0xff],
};

pub fn unit_preset(class: u8) -> Option<&'static UnitPreset> {
    UNIT_PRESETS.get(usize::from(class))
}

pub fn structure_preset(class: u8) -> Option<&'static StructurePreset> {
    STRUCTURE_PRESETS.get(usize::from(class))
}

pub fn player_preset(control: Control) -> &'static PlayerPreset {
    match control {
        Control::Local => &LOCAL_PLAYER,
        Control::Remote => &REMOTE_PLAYER,
    }
}

/// Largest footprint dimension of any preset. The grid cell must be at
/// least this large for 3x3 section queries to see every overlap.
pub fn largest_footprint() -> u16 {
    let units = UNIT_PRESETS.iter().map(|p| p.size.w.max(p.size.h));
    let structures = STRUCTURE_PRESETS.iter().map(|p| p.size.w.max(p.size.h));
    units
        .chain(structures)
        .chain([LOCAL_PLAYER.size.w.max(LOCAL_PLAYER.size.h)])
        .chain([REMOTE_PLAYER.size.w.max(REMOTE_PLAYER.size.h)])
        .max()
        .unwrap_or(0)
}
