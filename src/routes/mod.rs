//! Routing, split by who may call what.
//!
//! Access control is layered: the admin gate middleware guards the `/api/admin`
//! prefix before routing, and every admin handler additionally takes the
//! `AdminUser` extractor.

/// Anonymous routes. Some adapt their output to an optional session.
pub mod public;

/// Routes that need any valid session.
pub mod authenticated;

/// Routes restricted to the admin role, nested under `/api/admin`.
pub mod admin;
