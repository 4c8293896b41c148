//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, query)
//!     → router.rs (ordered scan, method filter)
//!     → matcher.rs (template match, capture params)
//!     → Return: RouteMatch {spec, upstream path} or no match
//!
//! Route Compilation (at startup):
//!     table.rs (static RouteSpec list) → RouteTable
//! ```

pub mod matcher;
pub mod router;
pub mod table;

pub use matcher::{PathParams, PathTemplate};
pub use router::{CompiledRoute, RouteMatch, RouteTable};
pub use table::{RouteSpec, ROUTES};
