//! Bundled source adapters.

pub mod insertunit;
pub mod wecima;

pub use insertunit::Insertunit;
pub use wecima::Wecima;
