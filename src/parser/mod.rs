pub mod cursor;
pub mod module;
pub mod opcode;
pub mod pool;
pub mod streaming;
pub mod types;
