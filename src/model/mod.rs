pub mod item;
pub mod resource;
