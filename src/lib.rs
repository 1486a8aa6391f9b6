//! Membership, billing and scheduling for a sports club.
//!
//! The [`club`] module holds the domain rules and is usable on its own with
//! any sea-orm connection. [`router`] wires it into an axum application with
//! session login and server-rendered pages.

pub mod auth;
pub mod club;
pub mod config;
pub mod database;
pub mod entities;
pub mod router;
pub mod routes;
pub mod util;
