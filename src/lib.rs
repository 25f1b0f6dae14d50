pub(crate) mod alerts;
pub(crate) mod auth;
pub(crate) mod blob;
pub(crate) mod cmds;
pub mod conductors;
pub mod config;
mod constructors;
pub(crate) mod countdown;
pub mod entities;
pub(crate) mod feed;
pub(crate) mod handlers;
pub(crate) mod handoff;
pub(crate) mod interaction;
pub(crate) mod interactors;
pub(crate) mod repositories;
pub(crate) mod routes;
pub(crate) mod usecases;
pub(crate) mod utils;

pub use constructors::*;
