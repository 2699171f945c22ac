// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod blog;
pub mod contact;
pub mod health;
pub mod interaction;
