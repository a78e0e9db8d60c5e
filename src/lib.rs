pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod moderation;
pub mod response;
pub mod routes;
