//! Per-tick input bitmask for the local player.
//!
//! Key polling and bindings live with the driver; the simulation only
//! sees which intents are held this tick.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Bitmask of local player intents, latched by the driver before a tick.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct InputState(pub u32);

impl InputState {
    pub const UP: u32 = 1 << 0;
    pub const DOWN: u32 = 1 << 1;
    pub const LEFT: u32 = 1 << 2;
    pub const RIGHT: u32 = 1 << 3;
    pub const BUILD_CONFIRM: u32 = 1 << 4;
    pub const BUILD_CANCEL: u32 = 1 << 5;
    /// Bit of `BUILD_SELECT` for class 0; class `n` is this shifted by `n`.
    pub const BUILD_SELECT_BASE: u32 = 8;
    pub const BUILD_SELECT_COUNT: u32 = 8;

    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Flag that selects structure `class` for placement.
    pub fn build_select(class: u8) -> u32 {
        if u32::from(class) < Self::BUILD_SELECT_COUNT {
            1 << (Self::BUILD_SELECT_BASE + u32::from(class))
        } else {
            0
        }
    }

    #[inline]
    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    /// Horizontal and vertical intent in `-1..=1`. Opposite keys cancel.
    pub fn axes(&self) -> (i32, i32) {
        let dx = i32::from(self.contains(Self::RIGHT)) - i32::from(self.contains(Self::LEFT));
        let dy = i32::from(self.contains(Self::DOWN)) - i32::from(self.contains(Self::UP));
        (dx, dy)
    }

    /// Lowest structure class whose select flag is held.
    pub fn selected_class(&self) -> Option<u8> {
        let field = (self.0 >> Self::BUILD_SELECT_BASE) & ((1 << Self::BUILD_SELECT_COUNT) - 1);
        (field != 0).then(|| field.trailing_zeros() as u8)
    }
}
