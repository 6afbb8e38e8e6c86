//! HTTP surface (spec §6). Routing/middleware is explicitly out of scope
//! for the core itself, but a thin axum binding is carried here the way the
//! teacher binds its own services, so the core is runnable end to end.

pub mod dto;
pub mod routes;

pub use routes::router;
