//! Core library for the healthcare-professional registration platform:
//! the field schema shared by client and server, the multi-step form
//! controller, the server-side ingestion pipeline, document intake, and
//! the admin status-review workflow.

pub mod config;
pub mod error;
pub mod registration;
pub mod telemetry;
