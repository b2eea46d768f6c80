pub mod duration_table;
pub mod editor;
pub mod entities;
pub mod events;
pub mod resolver;
pub mod store;
pub mod trial;
