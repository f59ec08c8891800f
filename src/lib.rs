pub mod app_config;
pub mod cache;
pub mod circles;
pub mod config;
pub mod db;
pub mod identity;
pub mod middleware;
pub mod notes;
pub mod orm;
pub mod relation;
pub mod token;
pub mod topics;
pub mod user;
pub mod web;
