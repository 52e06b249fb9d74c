use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::value::RawValue;

use crate::error::CoreError;
use crate::ids::*;

/// A named, owned set of map annotations. Top level of the client payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "ID", alias = "id")]
    pub id: OperationId,
    #[serde(default, deserialize_with = "text")]
    pub name: String,
    /// Informational on the way in; the stored owner is always the requester.
    #[serde(default, deserialize_with = "text")]
    pub creator: AgentId,
    #[serde(default, deserialize_with = "text")]
    pub color: String,
    #[serde(
        rename = "teamid",
        alias = "team",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub team: Option<TeamId>,
    #[serde(default, deserialize_with = "list")]
    pub portals: Vec<Portal>,
    #[serde(default, deserialize_with = "list")]
    pub links: Vec<Link>,
    #[serde(default, deserialize_with = "list")]
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portal {
    #[serde(alias = "ID")]
    pub id: PortalId,
    #[serde(default, deserialize_with = "text")]
    pub name: String,
    #[serde(default, deserialize_with = "decimal_text")]
    pub lat: String,
    #[serde(default, deserialize_with = "decimal_text")]
    pub lon: String,
    #[serde(default, deserialize_with = "text")]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "ID", alias = "id", default, deserialize_with = "text")]
    pub id: LinkId,
    #[serde(rename = "fromPortal")]
    pub from: Portal,
    #[serde(rename = "toPortal")]
    pub to: Portal,
    #[serde(default, deserialize_with = "text")]
    pub description: String,
    #[serde(
        rename = "assignedTo",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to: Option<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(rename = "ID", alias = "id", default, deserialize_with = "text")]
    pub id: MarkerId,
    pub portal: Portal,
    #[serde(rename = "type", default, deserialize_with = "text")]
    pub kind: MarkerType,
    #[serde(default, deserialize_with = "text")]
    pub comment: String,
}

impl Operation {
    /// Decode a client payload. Only the shape is checked here: ownership and
    /// portal references are the engine's concern.
    pub fn from_json(raw: &[u8]) -> Result<Self, CoreError> {
        let op: Operation =
            serde_json::from_slice(raw).map_err(|e| CoreError::Validation(e.to_string()))?;
        if op.id.is_empty() {
            return Err(CoreError::Validation("operation ID must not be empty".into()));
        }
        Ok(op)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

impl From<String> for MarkerType {
    fn from(kind: String) -> Self {
        MarkerType::new(kind)
    }
}

// The plugin sends `null` and `""` freely; both mean "nothing here".

fn text<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(T::from(raw.unwrap_or_default()))
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(T::from))
}

fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Coordinates stay as decimal text. A JSON number is accepted too and kept
/// exactly as the client wrote it, digit for digit.
fn decimal_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<Box<RawValue>>::deserialize(deserializer)? else {
        return Ok(String::new());
    };
    let text = raw.get();
    match text.as_bytes().first() {
        Some(b'"') => serde_json::from_str(text).map_err(de::Error::custom),
        Some(b'-' | b'0'..=b'9') => Ok(text.to_string()),
        _ => Err(de::Error::custom(format!(
            "expected a coordinate as text or number, found {text}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLUGIN_PAYLOAD: &str = r#"{
        "ID": "op1",
        "name": "Raid Plan",
        "creator": "g1",
        "color": "red",
        "teamid": "",
        "portals": [
            {"id": "p2", "name": "Fountain", "lat": "33.5", "lon": "-112.07", "comment": ""}
        ],
        "links": [
            {
                "ID": "l1",
                "fromPortal": {"id": "p1", "name": "Fort", "lat": "1.0", "lon": "2.0", "comment": ""},
                "toPortal": {"id": "p2", "name": "Fountain", "lat": "33.5", "lon": "-112.07", "comment": ""},
                "description": "first throw",
                "assignedTo": ""
            }
        ],
        "markers": [
            {
                "ID": "m1",
                "portal": {"id": "p1", "name": "Fort", "lat": "1.0", "lon": "2.0", "comment": ""},
                "type": "waypoint",
                "comment": "go here"
            }
        ]
    }"#;

    #[test]
    fn decodes_plugin_payload() {
        let op = Operation::from_json(PLUGIN_PAYLOAD.as_bytes()).unwrap();
        assert_eq!(op.id.as_str(), "op1");
        assert_eq!(op.name, "Raid Plan");
        assert_eq!(op.creator.as_str(), "g1");
        assert_eq!(op.team, None);
        assert_eq!(op.portals.len(), 1);
        assert_eq!(op.links[0].from.id.as_str(), "p1");
        assert_eq!(op.links[0].to.lon, "-112.07");
        assert_eq!(op.links[0].assigned_to, None);
        assert_eq!(op.markers[0].kind.as_str(), "waypoint");
        assert_eq!(op.markers[0].portal.name, "Fort");
    }

    #[test]
    fn accepts_lowercase_ids_and_missing_collections() {
        let op = Operation::from_json(br#"{"id": "op9", "name": "bare"}"#).unwrap();
        assert_eq!(op.id.as_str(), "op9");
        assert!(op.portals.is_empty());
        assert!(op.links.is_empty());
        assert!(op.markers.is_empty());
    }

    #[test]
    fn null_fields_read_as_empty() {
        let op = Operation::from_json(
            br#"{"ID": "op2", "name": null, "color": null, "portals": null, "teamid": null}"#,
        )
        .unwrap();
        assert_eq!(op.name, "");
        assert_eq!(op.color, "");
        assert!(op.portals.is_empty());
        assert_eq!(op.team, None);
    }

    #[test]
    fn numeric_coordinates_keep_their_text() {
        let op = Operation::from_json(
            br#"{"ID": "op3", "portals": [{"id": "p1", "lat": 51.50735, "lon": -0.1277}]}"#,
        )
        .unwrap();
        assert_eq!(op.portals[0].lat, "51.50735");
        assert_eq!(op.portals[0].lon, "-0.1277");
    }

    #[test]
    fn numeric_coordinates_are_not_rounded() {
        let op = Operation::from_json(
            br#"{"ID": "op3", "portals": [{"id": "p1", "lat": 51.50735012345678901234, "lon": 2.10}]}"#,
        )
        .unwrap();
        assert_eq!(op.portals[0].lat, "51.50735012345678901234");
        assert_eq!(op.portals[0].lon, "2.10");
    }

    #[test]
    fn non_numeric_coordinates_are_rejected() {
        let cases: [&[u8]; 2] = [
            br#"{"ID": "op3", "portals": [{"id": "p1", "lat": true}]}"#,
            br#"{"ID": "op3", "portals": [{"id": "p1", "lon": {"deg": 2}}]}"#,
        ];
        for raw in cases {
            assert!(matches!(
                Operation::from_json(raw),
                Err(CoreError::Validation(_))
            ));
        }
    }

    #[test]
    fn team_and_assignee_survive() {
        let op = Operation::from_json(
            br#"{"ID": "op4", "teamid": "t1", "links": [{
                "ID": "l1",
                "fromPortal": {"id": "a"},
                "toPortal": {"id": "b"},
                "assignedTo": "g7"
            }]}"#,
        )
        .unwrap();
        assert_eq!(op.team, Some(TeamId::from("t1")));
        assert_eq!(op.links[0].assigned_to, Some(AgentId::from("g7")));
    }

    #[test]
    fn rejects_malformed_payloads() {
        let cases: &[&[u8]] = &[
            b"",
            b"not json",
            b"[]",
            br#"{"name": "no id"}"#,
            br#"{"ID": ""}"#,
            br#"{"ID": "op5", "portals": {"id": "p1"}}"#,
            br#"{"ID": "op5", "markers": [{"ID": "m1", "type": "x"}]}"#,
            br#"{"ID": "op5", "links": [{"ID": "l1", "fromPortal": {"id": "a"}}]}"#,
        ];
        for raw in cases {
            match Operation::from_json(raw) {
                Err(CoreError::Validation(_)) => {}
                other => panic!(
                    "expected validation error for {:?}, got {other:?}",
                    String::from_utf8_lossy(raw)
                ),
            }
        }
    }

    #[test]
    fn json_output_reads_back() {
        let op = Operation::from_json(PLUGIN_PAYLOAD.as_bytes()).unwrap();
        let bytes = op.to_json().unwrap();
        let again = Operation::from_json(&bytes).unwrap();
        assert_eq!(op, again);
    }
}
