pub mod adapters;
pub mod clipboard;
pub mod contracts;
pub mod error;
pub mod executor;

pub use adapters::*;
pub use clipboard::*;
pub use contracts::*;
pub use error::*;
pub use executor::*;
