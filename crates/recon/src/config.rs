use milla_core::CoreError;

/// Failed validations allowed before a load is closed with a novelty.
pub const DEFAULT_ESCALATION_THRESHOLD: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceptionPolicy {
    pub escalation_threshold: u32,
}

impl Default for ReceptionPolicy {
    fn default() -> Self {
        Self {
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
        }
    }
}

impl ReceptionPolicy {
    pub fn new(escalation_threshold: u32) -> Result<Self, CoreError> {
        let policy = Self { escalation_threshold };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.escalation_threshold == 0 {
            return Err(CoreError::validation("escalation threshold must be at least 1"));
        }
        Ok(())
    }

    pub(crate) fn should_escalate(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.escalation_threshold
    }
}
