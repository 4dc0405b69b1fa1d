//! ITROPA: grow trees of speculative future industries from human needs.
//!
//! The expression tree, its operations and the undo/redo journal live in
//! `itropa-core`. This crate adds the lifecycle coordinator
//! ([`service::IdeationService`]), persistence, the content generator client
//! and the HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod generator;
pub mod render;
pub mod repository;
pub mod service;
