//! A session-aware personal task tracker.
//!
//! Sign in, keep a private list of tasks with optional due dates, and see
//! which of them are overdue. Every page goes through a route guard that
//! sends anonymous visitors to the login page.

#[macro_use]
extern crate prettytable;

pub mod auth;
pub mod config;
pub mod cookies;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod listeners;
pub mod modal;
pub mod model;
pub mod nav;
pub mod session;
pub mod tasks;
pub mod theme;
pub mod view;
