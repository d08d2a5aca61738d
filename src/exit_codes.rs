//! Exit code constants for the sweepguard CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state, I/O)
//! - 2: Policy violation (protected path, invalid operation)
//! - 3: Unconfirmed risk (denied, timed out, or cancelled confirmation)
//! - 4: Lock acquisition failure (overlapping operation)
//! - 5: Backup failure (nothing destructive was attempted)
//! - 6: Execution or post-validation failure (operation rolled back)
//! - 7: Rollback failure (manual intervention required)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid state, or I/O failure outside the pipeline.
pub const USER_ERROR: i32 = 1;

/// Policy violation: the operation targets a protected path or is malformed.
pub const POLICY_VIOLATION: i32 = 2;

/// The required confirmation was denied, timed out, or cancelled.
pub const UNCONFIRMED_RISK: i32 = 3;

/// A path or operation lock could not be acquired.
pub const LOCK_FAILURE: i32 = 4;

/// The backup could not be created; targets are untouched.
pub const BACKUP_FAILURE: i32 = 5;

/// A destructive step or post-validation failed and the operation was rolled back.
pub const ROLLED_BACK: i32 = 6;

/// Restoring from backup failed for at least one file.
pub const ROLLBACK_FAILURE: i32 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            POLICY_VIOLATION,
            UNCONFIRMED_RISK,
            LOCK_FAILURE,
            BACKUP_FAILURE,
            ROLLED_BACK,
            ROLLBACK_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn only_success_is_zero() {
        assert_eq!(SUCCESS, 0);
        assert!(USER_ERROR > 0);
        assert!(ROLLBACK_FAILURE > ROLLED_BACK);
    }
}
