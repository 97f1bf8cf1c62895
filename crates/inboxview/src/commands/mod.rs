pub mod replay;
pub mod sessions;
pub mod version;
