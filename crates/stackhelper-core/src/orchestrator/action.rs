use crate::error::StackError;
use std::fmt;
use std::str::FromStr;

/// Every operation the orchestrator can run against a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackAction {
    Delete,
    /// Delete followed by create; not atomic
    Recreate,
    Create,
    Update,
    Deploy,
    CreateChangeSet {
        /// Emit the request skeleton instead of submitting a change set
        generate_only: bool,
    },
    ExecuteChangeSet,
}

impl StackAction {
    pub fn name(&self) -> &'static str {
        match self {
            StackAction::Delete => "delete",
            StackAction::Recreate => "recreate",
            StackAction::Create => "create",
            StackAction::Update => "update",
            StackAction::Deploy => "deploy",
            StackAction::CreateChangeSet { .. } => "createChangeSet",
            StackAction::ExecuteChangeSet => "executeChangeSet",
        }
    }
}

impl fmt::Display for StackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StackAction {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete" => Ok(StackAction::Delete),
            "recreate" => Ok(StackAction::Recreate),
            "create" => Ok(StackAction::Create),
            "update" => Ok(StackAction::Update),
            "deploy" => Ok(StackAction::Deploy),
            "createChangeSet" | "create-change-set" => Ok(StackAction::CreateChangeSet {
                generate_only: false,
            }),
            "executeChangeSet" | "execute-change-set" => Ok(StackAction::ExecuteChangeSet),
            other => Err(StackError::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_str() {
        assert_eq!("delete".parse::<StackAction>().unwrap(), StackAction::Delete);
        assert_eq!(
            "recreate".parse::<StackAction>().unwrap(),
            StackAction::Recreate
        );
        assert_eq!(
            "create-change-set".parse::<StackAction>().unwrap(),
            StackAction::CreateChangeSet {
                generate_only: false
            }
        );
        assert_eq!(
            "executeChangeSet".parse::<StackAction>().unwrap(),
            StackAction::ExecuteChangeSet
        );
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        let err = "destroy".parse::<StackAction>().unwrap_err();
        assert!(matches!(err, StackError::UnknownAction(name) if name == "destroy"));
    }

    #[test]
    fn test_display_round_trips() {
        for action in [
            StackAction::Delete,
            StackAction::Recreate,
            StackAction::Create,
            StackAction::Update,
            StackAction::Deploy,
            StackAction::ExecuteChangeSet,
        ] {
            assert_eq!(action.to_string().parse::<StackAction>().unwrap(), action);
        }
    }
}
