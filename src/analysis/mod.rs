pub mod model;
pub mod team;
