use std::collections::{BTreeMap, BTreeSet};

use opsync_core::{AgentId, MemberRef, TeamId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("no agent matches {0}")]
    UnknownAgent(MemberRef),

    #[error("membership directory unavailable: {0}")]
    Unavailable(String),
}

/// The team predicate the engine consumes. Team management itself lives
/// outside this crate.
pub trait TeamMembership {
    fn is_member(&self, team: &TeamId, agent: &AgentId) -> Result<bool, MembershipError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRecord {
    pub id: AgentId,
    pub name: String,
    pub lock_key: Option<String>,
    pub external_id: Option<String>,
}

impl AgentRecord {
    pub fn new(id: AgentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            lock_key: None,
            external_id: None,
        }
    }

    pub fn with_lock_key(mut self, key: impl Into<String>) -> Self {
        self.lock_key = Some(key.into());
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    fn matches(&self, member: &MemberRef) -> bool {
        match member {
            MemberRef::Agent(id) => &self.id == id,
            MemberRef::LockKey(key) => self.lock_key.as_deref() == Some(key.as_str()),
            MemberRef::ExternalId(ext) => self
                .external_id
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(ext)),
            MemberRef::Name(name) => self.name.eq_ignore_ascii_case(name),
        }
    }
}

/// In-process team directory: a fixed agent roster plus team rosters.
/// Used by embedders without an external directory, and by tests.
#[derive(Debug, Default)]
pub struct StaticTeams {
    agents: Vec<AgentRecord>,
    members: BTreeMap<TeamId, BTreeSet<AgentId>>,
}

impl StaticTeams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_agent(&mut self, agent: AgentRecord) {
        self.agents.retain(|a| a.id != agent.id);
        self.agents.push(agent);
    }

    pub fn resolve(&self, member: &MemberRef) -> Option<&AgentRecord> {
        self.agents.iter().find(|a| a.matches(member))
    }

    /// Add whichever agent `member` points at. Returns the resolved id.
    pub fn add_member(
        &mut self,
        team: TeamId,
        member: &MemberRef,
    ) -> Result<AgentId, MembershipError> {
        let agent = self
            .resolve(member)
            .map(|a| a.id.clone())
            .ok_or_else(|| MembershipError::UnknownAgent(member.clone()))?;
        self.members.entry(team).or_default().insert(agent.clone());
        Ok(agent)
    }
}

impl TeamMembership for StaticTeams {
    fn is_member(&self, team: &TeamId, agent: &AgentId) -> Result<bool, MembershipError> {
        Ok(self
            .members
            .get(team)
            .is_some_and(|roster| roster.contains(agent)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTERNAL: &str = "0123456789abcdef0123456789abcdef01234567";

    fn directory() -> StaticTeams {
        let mut teams = StaticTeams::new();
        teams.register_agent(
            AgentRecord::new(AgentId::from("101"), "Pathfinder")
                .with_lock_key("lk-9f2")
                .with_external_id(EXTERNAL.to_ascii_uppercase()),
        );
        teams.register_agent(AgentRecord::new(AgentId::from("102"), "Nomad"));
        teams
    }

    #[test]
    fn every_reference_kind_resolves() -> Result<(), Box<dyn std::error::Error>> {
        let teams = directory();
        for raw in [
            "gid:101".to_string(),
            "lockkey:lk-9f2".to_string(),
            format!("enl:{EXTERNAL}"),
            "name:pathfinder".to_string(),
        ] {
            let member: MemberRef = raw.parse()?;
            let found = teams.resolve(&member).map(|a| a.id.as_str());
            assert_eq!(found, Some("101"), "{raw} did not resolve");
        }
        Ok(())
    }

    #[test]
    fn membership_follows_adds() -> Result<(), Box<dyn std::error::Error>> {
        let mut teams = directory();
        let team = TeamId::from("t1");
        let added = teams.add_member(team.clone(), &"name:Nomad".parse::<MemberRef>()?)?;
        assert_eq!(added, AgentId::from("102"));
        assert!(teams.is_member(&team, &AgentId::from("102"))?);
        assert!(!teams.is_member(&team, &AgentId::from("101"))?);
        assert!(!teams.is_member(&TeamId::from("t2"), &AgentId::from("102"))?);
        Ok(())
    }

    #[test]
    fn unknown_reference_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let mut teams = directory();
        let result = teams.add_member(TeamId::from("t1"), &"gid:999".parse::<MemberRef>()?);
        assert!(matches!(result, Err(MembershipError::UnknownAgent(_))));
        Ok(())
    }

    #[test]
    fn reregistering_replaces_the_record() {
        let mut teams = directory();
        teams.register_agent(AgentRecord::new(AgentId::from("102"), "Wanderer"));
        assert!(teams.resolve(&MemberRef::Name("Nomad".into())).is_none());
        assert!(teams.resolve(&MemberRef::Name("Wanderer".into())).is_some());
    }
}
