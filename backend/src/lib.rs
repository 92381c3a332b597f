//! LensForge: quality gate, NSFW gate and domain classifier behind one HTTP service.

pub mod checkers;
pub mod config;
pub mod inference;
pub mod ingest;
pub mod pipeline;
pub mod routes;
pub mod service;
pub mod state;
