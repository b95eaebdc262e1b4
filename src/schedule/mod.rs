pub mod list;
pub mod model;
pub mod time;
