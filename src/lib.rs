pub mod config;
pub mod diagnostic;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod render;
pub mod source;
pub mod value;
