pub mod data_source;
pub mod session;
pub mod table;

pub use data_source::*;
pub use session::*;
pub use table::*;
