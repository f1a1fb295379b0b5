pub mod analyses;
pub mod health;
pub mod modes;
