pub mod analysis;
pub mod config;
pub mod decoder;
pub mod descriptor;
pub mod filter;
pub mod insn;
pub mod opcode;

pub use opcode::Opcode;
