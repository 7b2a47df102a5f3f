//! HTTP handlers for the gateway's own pages

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

pub mod pages;

pub use pages::{health, home, login, logout, profile};

/// `302 Found` to `location`
#[must_use]
pub fn redirect_found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
