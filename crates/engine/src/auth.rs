use opsync_core::{AgentId, OperationId};
use opsync_storage::OperationRecord;
use thiserror::Error;

use crate::error::EngineError;
use crate::teams::TeamMembership;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("unauthorized: operation {operation} is owned by someone else")]
    NotOwner { operation: OperationId },

    #[error("unauthorized: {agent} may not read operation {operation}")]
    NotReader {
        operation: OperationId,
        agent: AgentId,
    },
}

/// Write eligibility. `existing_owner` must come from the store before
/// anything about the operation is deleted: the first writer becomes the
/// owner, after that only the owner may write.
pub fn check_write(
    operation: &OperationId,
    existing_owner: Option<&AgentId>,
    requester: &AgentId,
) -> Result<(), AuthorizationError> {
    match existing_owner {
        None => Ok(()),
        Some(owner) if owner == requester => Ok(()),
        Some(_) => Err(AuthorizationError::NotOwner {
            operation: operation.clone(),
        }),
    }
}

/// Read eligibility: the owner, or any member of the attached team.
/// Runs before dependent rows are loaded.
pub fn check_read<T>(
    record: &OperationRecord,
    requester: &AgentId,
    teams: &T,
) -> Result<(), EngineError>
where
    T: TeamMembership + ?Sized,
{
    if &record.owner == requester {
        return Ok(());
    }
    if let Some(team) = &record.team {
        if teams.is_member(team, requester)? {
            return Ok(());
        }
    }
    Err(AuthorizationError::NotReader {
        operation: record.id.clone(),
        agent: requester.clone(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teams::{AgentRecord, MembershipError, StaticTeams};
    use opsync_core::{MemberRef, TeamId};

    fn record(team: Option<&str>) -> OperationRecord {
        OperationRecord {
            id: OperationId::from("op1"),
            name: "Raid Plan".into(),
            owner: AgentId::from("1"),
            color: "red".into(),
            team: team.map(TeamId::from),
        }
    }

    fn teams() -> StaticTeams {
        let mut teams = StaticTeams::new();
        teams.register_agent(AgentRecord::new(AgentId::from("2"), "Ally"));
        teams.register_agent(AgentRecord::new(AgentId::from("3"), "Stranger"));
        teams
            .add_member(TeamId::from("t1"), &MemberRef::Name("Ally".into()))
            .unwrap();
        teams
    }

    #[test]
    fn first_writer_is_allowed() {
        let op = OperationId::from("op1");
        assert_eq!(check_write(&op, None, &AgentId::from("anyone")), Ok(()));
    }

    #[test]
    fn owner_may_overwrite() {
        let op = OperationId::from("op1");
        let owner = AgentId::from("1");
        assert_eq!(check_write(&op, Some(&owner), &owner), Ok(()));
    }

    #[test]
    fn non_owner_may_not_overwrite() {
        let op = OperationId::from("op1");
        let result = check_write(&op, Some(&AgentId::from("1")), &AgentId::from("2"));
        assert_eq!(result, Err(AuthorizationError::NotOwner { operation: op }));
    }

    #[test]
    fn owner_reads_without_team() {
        assert!(check_read(&record(None), &AgentId::from("1"), &teams()).is_ok());
    }

    #[test]
    fn team_member_reads() {
        assert!(check_read(&record(Some("t1")), &AgentId::from("2"), &teams()).is_ok());
    }

    #[test]
    fn outsider_is_refused() {
        let teams = teams();
        for (team, agent) in [(Some("t1"), "3"), (None, "2"), (Some("t2"), "2")] {
            match check_read(&record(team), &AgentId::from(agent), &teams) {
                Err(EngineError::Unauthorized(AuthorizationError::NotReader { .. })) => {}
                other => panic!("expected NotReader for {agent} on {team:?}, got {other:?}"),
            }
        }
    }

    struct Down;

    impl TeamMembership for Down {
        fn is_member(&self, _team: &TeamId, _agent: &AgentId) -> Result<bool, MembershipError> {
            Err(MembershipError::Unavailable("directory offline".into()))
        }
    }

    #[test]
    fn membership_outage_fails_closed() {
        let result = check_read(&record(Some("t1")), &AgentId::from("2"), &Down);
        assert!(matches!(result, Err(EngineError::Membership(_))));
        // the owner never needs the directory
        assert!(check_read(&record(Some("t1")), &AgentId::from("1"), &Down).is_ok());
    }
}
