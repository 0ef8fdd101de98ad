pub mod cli;
pub mod config;
pub mod embed;
pub mod engine;
pub mod layout;
pub mod outline;
pub mod pipeline;
pub mod rank;
pub mod report;
pub mod segment;
pub mod text;
pub mod util;
