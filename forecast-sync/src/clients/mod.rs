pub mod neon;
pub mod postgres;
