pub mod cli;
pub mod config;
pub mod data;
pub mod remote;
pub mod report;
pub mod roster;
pub mod tables;
