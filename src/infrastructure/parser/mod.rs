mod parser;

pub use parser::detect_transfer;
