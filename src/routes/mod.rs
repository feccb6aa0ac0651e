//! HTTP routes for mapsurvey
//!
//! Each resource module claims its paths and returns `None` for anything
//! else, leaving the 404 to the dispatcher.

pub mod auth_routes;
pub mod data;
pub mod health;
pub mod helpers;
pub mod questionnaires;
pub mod users;

pub use auth_routes::handle_auth_request;
pub use data::handle_data_request;
pub use health::{health_check, ping};
pub use helpers::{
    cors_preflight, error_response, json_response, not_found_response, ApiRequest, BoxBody,
};
pub use questionnaires::handle_questionnaire_request;
pub use users::handle_users_request;
