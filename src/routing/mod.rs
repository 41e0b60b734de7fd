//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (filter by method, pick best route)
//!     → matcher.rs (fits / score / extract params)
//!     → Return: matched Route or NoMatch
//!
//! Route Registration (at startup):
//!     (method, template, handler)[]
//!     → pattern.rs (parse templates)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes parsed at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod pattern;
pub mod router;

pub use matcher::Params;
pub use pattern::{Pattern, Segment};
pub use router::{Route, RouteTable};
