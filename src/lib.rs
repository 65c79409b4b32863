//! Library crate for padel-slots-back: slot registration and reminder
//! scheduling for padel games, exposed to the server binary and tools.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
