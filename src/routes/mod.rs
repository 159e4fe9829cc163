pub mod activation;
pub mod health_check;
pub mod password_reset;

pub use activation::*;
pub use health_check::*;
pub use password_reset::*;
