pub mod directory;
pub mod exclusions;
pub mod player;
pub mod registry;
pub mod unit;
pub mod validate;
