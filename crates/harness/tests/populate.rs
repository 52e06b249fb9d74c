use opsync_engine::{AuthorizationError, EngineError};
use opsync_harness::fixtures::{self, OperationPayload};
use opsync_harness::TestServer;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn team_plan() -> serde_json::Value {
    OperationPayload::new("op1")
        .name("Raid")
        .team("t1")
        .marker("m1", "P1", "destroy")
        .link("l1", "P1", "P2")
        .build()
}

// ============================================================================
// Hydration (1 test)
// ============================================================================

#[test]
fn hydrates_links_and_markers_from_stored_portals() -> TestResult {
    let mut server = TestServer::new()?;
    server.sync(&fixtures::raid_plan(), "alice")?;

    let op = server.populate("op1", "alice")?;
    assert_eq!(op.name, "Raid");
    assert_eq!(op.color, "groupa");
    let link = &op.links[0];
    assert_eq!(link.from, op.portals[0]);
    assert_eq!(link.to, op.portals[1]);
    assert_eq!(op.markers[0].portal, op.portals[0]);
    assert_eq!(op.markers[0].kind.as_str(), "destroy");
    Ok(())
}

// ============================================================================
// Read Access (3 tests)
// ============================================================================

#[test]
fn team_members_can_read() -> TestResult {
    let mut server = TestServer::new()?;
    server.add_agent("bob", "Bob");
    server.add_agent("carol", "Carol");
    server.join_team("t1", "bob")?;
    server.sync(&team_plan(), "alice")?;

    let op = server.populate("op1", "bob")?;
    assert_eq!(op.creator.as_str(), "alice");
    assert_eq!(op.markers.len(), 1);

    let err = server.populate("op1", "carol").unwrap_err();
    assert!(matches!(
        err,
        EngineError::Unauthorized(AuthorizationError::NotReader { .. })
    ));
    Ok(())
}

#[test]
fn team_membership_does_not_grant_writes() -> TestResult {
    let mut server = TestServer::new()?;
    server.add_agent("bob", "Bob");
    server.join_team("t1", "Bob")?;
    server.sync(&team_plan(), "alice")?;

    let err = server.sync(&team_plan(), "bob").unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
    Ok(())
}

#[test]
fn operation_without_team_is_owner_only() -> TestResult {
    let mut server = TestServer::new()?;
    server.sync(&fixtures::raid_plan(), "alice")?;
    assert!(server.populate("op1", "bob").is_err());
    Ok(())
}

// ============================================================================
// Missing Data (2 tests)
// ============================================================================

#[test]
fn missing_operation_is_not_found() -> TestResult {
    let mut server = TestServer::new()?;
    let err = server.populate("nope", "alice").unwrap_err();
    assert!(matches!(err, EngineError::OperationNotFound(id) if id.as_str() == "nope"));
    Ok(())
}

#[test]
fn dangling_portal_reference_is_reported() -> TestResult {
    let mut server = TestServer::new()?;
    server.sync(&fixtures::raid_plan(), "alice")?;
    server.storage().conn().execute(
        "INSERT INTO marker (id, operation_id, portal_id, marker_type, comment)
         VALUES ('m9', 'op1', 'PX', 'destroy', '')",
        [],
    )?;

    let err = server.populate("op1", "alice").unwrap_err();
    match err {
        EngineError::DanglingPortal { operation, portal } => {
            assert_eq!(operation.as_str(), "op1");
            assert_eq!(portal.as_str(), "PX");
        }
        other => panic!("expected a dangling portal, got {other}"),
    }
    Ok(())
}

// ============================================================================
// Round Trip (1 test)
// ============================================================================

#[test]
fn populated_operation_resyncs_unchanged() -> TestResult {
    let mut server = TestServer::new()?;
    server.sync(&team_plan(), "alice")?;
    let first = server.populate("op1", "alice")?;

    let report = server.sync_raw(&first.to_json()?, "alice")?;
    assert!(!report.created);
    assert!(report.is_complete());
    assert_eq!(server.populate("op1", "alice")?, first);
    Ok(())
}
