pub mod config;
pub mod output;
pub mod parser;
pub mod report;
pub mod sql;
pub mod stats;
