pub mod analysis;
pub mod csv;
pub mod session_store;
pub mod transforms;
pub mod upload;
