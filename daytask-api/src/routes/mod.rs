/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, logout, and session probing
/// - `tasks`: Owner-scoped task CRUD

pub mod auth;
pub mod health;
pub mod tasks;
