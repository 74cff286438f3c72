pub mod anonymizer;
pub mod assembler;
pub mod collaborators;
pub mod line_parser;
pub mod matching;
pub mod pipeline;
pub mod scorer;
pub mod signal;
pub mod tables;
