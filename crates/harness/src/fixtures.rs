use serde_json::{Value, json};

/// Builds client payloads in the wire shape, so tests exercise the decoder
/// the same way a real client does.
#[derive(Debug, Clone)]
pub struct OperationPayload {
    id: String,
    name: String,
    creator: String,
    color: String,
    team: Option<String>,
    portals: Vec<Value>,
    links: Vec<Value>,
    markers: Vec<Value>,
}

pub fn portal(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "lat": "52.5163",
        "lon": "13.3777",
        "comment": "",
    })
}

impl OperationPayload {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("operation {id}"),
            creator: String::new(),
            color: "groupa".to_string(),
            team: None,
            portals: Vec::new(),
            links: Vec::new(),
            markers: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn creator(mut self, creator: &str) -> Self {
        self.creator = creator.to_string();
        self
    }

    pub fn team(mut self, team: &str) -> Self {
        self.team = Some(team.to_string());
        self
    }

    pub fn portal(mut self, id: &str, name: &str) -> Self {
        self.portals.push(portal(id, name));
        self
    }

    pub fn marker(mut self, id: &str, portal_id: &str, kind: &str) -> Self {
        self.markers.push(json!({
            "ID": id,
            "portal": portal(portal_id, &format!("portal {portal_id}")),
            "type": kind,
            "comment": "",
        }));
        self
    }

    pub fn link(mut self, id: &str, from: &str, to: &str) -> Self {
        self.links.push(json!({
            "ID": id,
            "fromPortal": portal(from, &format!("portal {from}")),
            "toPortal": portal(to, &format!("portal {to}")),
            "description": "",
        }));
        self
    }

    pub fn build(self) -> Value {
        let mut payload = json!({
            "ID": self.id,
            "name": self.name,
            "creator": self.creator,
            "color": self.color,
            "portals": self.portals,
            "links": self.links,
            "markers": self.markers,
        });
        if let Some(team) = self.team {
            payload["teamid"] = Value::String(team);
        }
        payload
    }
}

/// One marker on P1 and a link P1 -> P2.
pub fn raid_plan() -> Value {
    OperationPayload::new("op1")
        .name("Raid")
        .marker("m1", "P1", "destroy")
        .link("l1", "P1", "P2")
        .build()
}
