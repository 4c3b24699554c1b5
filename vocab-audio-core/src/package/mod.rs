pub mod assembler;
pub mod documents;
