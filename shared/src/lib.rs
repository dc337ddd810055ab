//! Shared library for Genba Board Lambda functions.
//!
//! This crate provides the calendar core, data models, and clients used
//! across the Lambda functions behind the dashboard.

pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod http;
pub mod kintone;
pub mod models;

pub use calendar::{render, DayCell, EventEntry, MonthGrid};
pub use config::{Config, KintoneConfig};
pub use db::{create_pool, get_secret, DatabaseCredentials};
pub use error::{Error, Result};
pub use events::collect;
pub use http::{error_response, json_response, ApiResponse};
pub use kintone::{KintoneClient, ProxyAction};
pub use models::{
    CalendarEvent, EventTag, Milestones, Project, RoleAssignees, StandaloneTask, TaskCategory,
    TaskDefinition, TaskProgress, VisibilityFilter,
};
