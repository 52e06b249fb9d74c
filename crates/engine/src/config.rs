use crate::error::EngineError;

pub const ITEM_FAILURE_POLICY_ENV: &str = "OPSYNC_ITEM_FAILURE_POLICY";

/// What a replace does when a single marker, link or portal row fails to
/// write after the operation row itself went in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemFailurePolicy {
    /// Log the item, list it in the sync report, keep going, commit the rest.
    #[default]
    SkipAndLog,
    /// Abort and roll back the whole replace; the previous version survives.
    AllOrNothing,
}

impl ItemFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkipAndLog => "skip",
            Self::AllOrNothing => "all-or-nothing",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EngineError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::SkipAndLog),
            "all-or-nothing" => Ok(Self::AllOrNothing),
            other => Err(EngineError::InvalidConfig(format!(
                "unknown item failure policy: {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub item_failure_policy: ItemFailurePolicy,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_values(std::env::var(ITEM_FAILURE_POLICY_ENV).ok())
    }

    fn from_values(item_failure_policy: Option<String>) -> Result<Self, EngineError> {
        let item_failure_policy = match item_failure_policy.as_deref() {
            None | Some("") => ItemFailurePolicy::default(),
            Some(raw) => ItemFailurePolicy::parse(raw)?,
        };
        Ok(Self { item_failure_policy })
    }

    pub fn with_policy(item_failure_policy: ItemFailurePolicy) -> Self {
        Self { item_failure_policy }
    }
}
