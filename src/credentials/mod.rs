mod error;
pub mod memory;
pub mod password;
pub mod postgres;
mod registry;
mod service;

pub use error::*;
pub use memory::InMemoryUserRegistry;
pub use postgres::PgUserRegistry;
pub use registry::*;
pub use service::*;
