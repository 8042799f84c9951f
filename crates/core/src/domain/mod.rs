pub mod group;
pub mod reaction;
