//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `milla` exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | core             | Core error taxonomy                      |
//! | 10-19   | reception        | Reconciliation outcomes                  |
//! | 20-29   | routes           | Route planning outcomes                  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use milla_core::CoreError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed, reception accepted, plan fully assigned.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure (config, I/O, serialization).
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Core (3-9)
// =============================================================================

/// Referenced load, article or vehicle does not exist.
pub const EXIT_NOT_FOUND: u8 = 3;

/// Input rejected (bad quantity, closed reception, invalid plan).
pub const EXIT_VALIDATION: u8 = 4;

/// Database failure; the transaction was rolled back.
pub const EXIT_PERSISTENCE: u8 = 5;

// =============================================================================
// Reception (10-19)
// =============================================================================

/// Counts differ from the manifest; recount and validate again.
pub const EXIT_RECEPTION_RETRY: u8 = 10;

/// Reception closed with a novelty after repeated differences.
pub const EXIT_RECEPTION_NOVELTY: u8 = 11;

// =============================================================================
// Routes (20-29)
// =============================================================================

/// Plan produced, but some invoices fit no vehicle.
pub const EXIT_ROUTES_UNASSIGNED: u8 = 20;

/// Map a core error to its exit code.
pub fn core_exit_code(err: &CoreError) -> u8 {
    match err {
        CoreError::NotFound { .. } => EXIT_NOT_FOUND,
        CoreError::Validation(_) => EXIT_VALIDATION,
        CoreError::Persistence(_) => EXIT_PERSISTENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_distinct_codes() {
        assert_eq!(core_exit_code(&CoreError::not_found("load", 7)), EXIT_NOT_FOUND);
        assert_eq!(core_exit_code(&CoreError::validation("x")), EXIT_VALIDATION);
        assert_eq!(core_exit_code(&CoreError::persistence("x")), EXIT_PERSISTENCE);
    }
}
