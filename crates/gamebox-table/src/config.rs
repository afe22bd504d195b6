//! Table configuration.

use serde::{Deserialize, Serialize};

/// Settings for a [`Table`](crate::Table) and the service driving it.
///
/// Deserialized from the `[table]` section of the configuration file.
/// Every field has a default, so a partial section is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Move the whole stack above a piece along with it.
    pub carry_stack: bool,

    /// Snap a piece dropped on another onto `base.location + base.stack_delta`.
    pub snap_to_stack: bool,

    /// Frame rate while anything is animating. 0 makes every move instant.
    pub animation_rate_hz: u32,

    /// Most dice a single ROLL may throw.
    pub max_roll_dice: u8,

    /// Footprint given to pieces created over the wire, `[w, h]`.
    pub piece_size: [f32; 2],

    /// Grid a piece snaps to when not dropped on a stack. `[0, 0]` is off.
    pub grid_size: [f32; 2],

    /// Offset of a piece stacked on a newly created piece.
    pub stack_delta: [f32; 2],
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            carry_stack: true,
            snap_to_stack: true,
            animation_rate_hz: 60,
            max_roll_dice: 20,
            piece_size: [64.0, 89.0],
            grid_size: [0.0, 0.0],
            stack_delta: [0.0, -2.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_config_default() {
        let config = TableConfig::default();
        assert!(config.carry_stack);
        assert!(config.snap_to_stack);
        assert_eq!(config.animation_rate_hz, 60);
        assert_eq!(config.max_roll_dice, 20);
    }

    #[test]
    fn test_table_config_partial_toml_keeps_defaults() {
        let config: TableConfig = toml::from_str("carry_stack = false\n").unwrap();
        assert!(!config.carry_stack);
        assert!(config.snap_to_stack);
        assert_eq!(config.piece_size, [64.0, 89.0]);
    }
}
