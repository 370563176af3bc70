pub mod config;
pub mod error;
pub mod retry;
pub mod traits;

pub use config::*;
pub use error::*;
pub use retry::*;
pub use traits::*;
