//! mapsurvey - questionnaire and geotagged record backend
//!
//! Owners define questionnaires, the public submits answer records with
//! optional coordinates, and owners list, favorite and reconcile their
//! records.
//!
//! ## Core
//!
//! - **Nearby matching**: owned records within a radius of a source record,
//!   by haversine distance
//! - **Merge**: two or more owned records combined into one new record
//!   (numeric mean, text join, first value otherwise)
//!
//! Everything else is authenticated CRUD over a [`db::SurveyStore`].

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{dispatch, run, AppState};
pub use types::{Result, SurveyError};
