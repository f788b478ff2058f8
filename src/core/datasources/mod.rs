pub mod api;
pub mod cache;
pub mod session;

pub use api::*;
pub use cache::*;
pub use session::*;
