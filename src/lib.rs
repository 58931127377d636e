pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod session;

pub use engine::{DisplayTuple, FilterContext, WindowResolver, WindowSpec};
pub use error::ResolveError;
