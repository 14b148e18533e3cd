pub mod data;
pub mod init;
pub mod session;
pub mod sheets;
pub mod sync;
