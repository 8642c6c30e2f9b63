pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod model;
pub mod search;
pub mod storage;
pub mod theme;
pub mod tutorial;
pub mod ui;
