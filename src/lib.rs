//! Aegis — emergency response backend.
//!
//! Free-text emergency reports flow through an AI classification and
//! guidance pipeline with a confidence gate, become persisted emergency
//! records with instruction checklists, and fan out as SMS/push alerts to
//! the reporter's trusted contacts with delivery tracking and bounded retry.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod notify;
pub mod pipeline;
