use query_client::query_status;
use query_responder::{InfoResponder, ResponderMode};
use query_shared::status::QueryTarget;
use query_tests::{init_tracing, server_status};

/// Smoke test: default-config entry point against a challenging responder.
#[tokio::test]
async fn default_query_status_answers_challenge() -> anyhow::Result<()> {
    init_tracing();
    let responder = InfoResponder::bind_ephemeral(
        server_status("Site-19", 7, 25),
        ResponderMode::Challenge,
    )
    .await?
    .with_app_id(700);
    let handle = responder.spawn()?;

    let status = query_status(&QueryTarget::new("127.0.0.1", handle.port()))
        .await
        .expect("responder should answer");

    assert_eq!(status.server_name, "Site-19");
    assert_eq!(status.players, 7);
    assert_eq!(status.max_players, 25);
    assert_eq!(status.round_time, "unknown");
    assert_eq!(handle.requests_seen(), 2);
    Ok(())
}
