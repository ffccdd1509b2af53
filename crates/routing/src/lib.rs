//! `milla-routing`: groups reconciled invoices into vehicle routes.
//!
//! - [`pending_invoices`]: routing input derived from accepted loads
//! - [`plan_routes`]: pure first-fit-decreasing proposal
//! - [`commit_routes`]: persists an accepted plan as despatches

pub mod commit;
pub mod pending;
pub mod planner;

pub use commit::commit_routes;
pub use pending::{pending_invoices, UNKNOWN_ADDRESS};
pub use planner::{cluster_key, plan_routes, SAFETY_MARGIN};
