pub mod health;
pub mod private;
pub mod sessions;
