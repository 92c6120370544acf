//! # Route Forge - A Module Specification Compiler
//!
//! `route_forge` turns a declarative description of a tool module (a
//! dashboard, one primary and two secondary resources, analytics, settings
//! and utilities) into its canonical, collision-free route table, checks
//! hand-written modules against that table, and binds the table to handlers.
//!
//! ## Core Features:
//!
//! - **[`compile`]**: normalizes a [`ModuleDefinition`], runs the section
//!   generators in slot order and returns a deterministic [`RouteTable`] of
//!   exactly [`MODULE_ROUTE_COUNT`] routes, or a [`Error::Compile`] naming the
//!   module and the offending section.
//!
//! - **[`conformance::check`]**: diffs an existing module's routes (a JSON
//!   dump or an Express router file, see [`extract`]) against the canonical
//!   table and reports missing, extra and path-mismatched endpoints.
//!
//! - **[`emit`]**: binds every route to a handler from a [`HandlerMap`],
//!   atomically. Handlers can be registered at compile time with
//!   `#[handler("module/kind/resource/action")]`.
//!
//! - **Adapters**: [`RestRouterBuilder`] mounts emitted modules on an `axum`
//!   router and [`openapi_utils::build_openapi`] renders tables as OpenAPI.

pub mod batch;
pub mod compiler;
pub mod config;
pub mod conformance;
pub mod emitter;
pub mod error;
pub mod extract;
pub mod handler;
pub mod naming;
pub mod openapi_utils;
pub mod rest_router_builder;
pub mod route;
pub mod schema;
pub mod sections;

pub use compiler::{compile, Compiler};
pub use conformance::{check, ConformanceReport, DriftClass, MismatchHint};
pub use emitter::{emit, EmittedModule};
pub use error::{Error, Result};
pub use handler::{Handler, HandlerError, HandlerMap, HandlerResult};
pub use rest_router_builder::RestRouterBuilder;
pub use route::{HandlerKey, RouteDescriptor, RouteTable};
pub use schema::{
    ActionSpec, HttpMethod, IdStyle, ModuleDefinition, NounStyle, SectionKind, SectionSlot,
    SectionSpec, MODULE_ROUTE_COUNT,
};

#[cfg(feature = "macros")]
pub use route_forge_macros::handler;

pub use inventory;
pub use serde_json;
