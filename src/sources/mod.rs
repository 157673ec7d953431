pub mod common;
pub mod forecast;
pub mod icons;
pub mod types;
