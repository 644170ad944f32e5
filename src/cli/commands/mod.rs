mod emit;
mod init;
mod serve;

pub use emit::execute_emit;
pub use init::execute_init;
pub use serve::execute_serve;
