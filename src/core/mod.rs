pub mod datasources;
pub mod transport;
