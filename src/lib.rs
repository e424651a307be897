pub mod bridge;
pub mod commands;
pub mod completion;
pub mod config;
pub mod enums;
pub mod errors;
pub mod formatter;
pub mod helpers;
pub mod hover;
pub mod index;
pub mod lexer;
pub mod loader;
pub mod navigation;
pub mod semantic_tokens;
pub mod service;
pub mod word_range;
