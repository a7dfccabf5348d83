// ABOUTME: Tests for the MachineClient facade's outbound actions
// ABOUTME: Verifies ID resolution, ephemeral routing, DM flow, and deferred scheduling

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use machine_core::testing::{MockSlackApi, RecordedCall};
use machine_core::{
    Attachment, DeferredExecutor, EntityCache, JobId, MachineClient, OutgoingMessage,
    ScheduledAction, ScheduledJob,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Executor that only records what it was asked to run
#[derive(Default)]
struct RecordingExecutor {
    jobs: Mutex<Vec<ScheduledJob>>,
}

#[async_trait]
impl DeferredExecutor for RecordingExecutor {
    async fn schedule(&self, job: ScheduledJob) -> Result<JobId> {
        let id = job.id.clone();
        self.jobs.lock().unwrap().push(job);
        Ok(id)
    }
}

fn client_with(api: MockSlackApi) -> (Arc<MockSlackApi>, MachineClient) {
    let api = Arc::new(api);
    let client = MachineClient::new(api.clone(), Arc::new(EntityCache::new()));
    (api, client)
}

#[tokio::test]
async fn test_send_posts_to_channel_by_id_or_entity() {
    let (api, client) = client_with(MockSlackApi::new());
    let channel = client
        .cache()
        .register_channel(&json!({"id": "C1", "name": "general"}))
        .unwrap();

    let receipt = client
        .send("C2", OutgoingMessage::text("by id"))
        .await
        .unwrap();
    assert_eq!(receipt.channel, "C2");
    assert!(receipt.ts.is_some());
    client
        .send(&channel, OutgoingMessage::text("by entity"))
        .await
        .unwrap();

    assert_eq!(
        api.calls(),
        vec![
            RecordedCall::PostMessage {
                channel: "C2".to_string(),
                text: "by id".to_string(),
                as_user: false,
            },
            RecordedCall::PostMessage {
                channel: "C1".to_string(),
                text: "by entity".to_string(),
                as_user: false,
            },
        ]
    );
}

#[tokio::test]
async fn test_ephemeral_message_routes_to_ephemeral_post() {
    let (api, client) = client_with(MockSlackApi::new());

    let receipt = client
        .send(
            "C1",
            OutgoingMessage::text("only you can see this").ephemeral_to("U1"),
        )
        .await
        .unwrap();

    assert_eq!(receipt.channel, "C1");
    assert_eq!(receipt.ts, None);

    assert_eq!(
        api.calls(),
        vec![RecordedCall::PostEphemeral {
            channel: "C1".to_string(),
            user: "U1".to_string(),
            text: "only you can see this".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_thread_and_attachments_reach_the_api() {
    let (api, client) = client_with(MockSlackApi::new());

    client
        .send(
            "C1",
            OutgoingMessage::text("reply")
                .in_thread("1700000000.000100")
                .with_attachment(Attachment::text("details").with_color("#36a64f")),
        )
        .await
        .unwrap();

    let posted = api.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].thread_ts.as_deref(), Some("1700000000.000100"));
    assert_eq!(posted[0].attachments[0].color.as_deref(), Some("#36a64f"));
}

#[tokio::test]
async fn test_post_failure_is_surfaced() {
    let (_api, client) = client_with(MockSlackApi::new().with_failing_posts());

    let err = client
        .send("C1", OutgoingMessage::text("hello"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not_in_channel"));
}

#[tokio::test]
async fn test_react_strips_colons() {
    let (api, client) = client_with(MockSlackApi::new());

    client.react("C1", "1700000000.000001", ":thumbsup:").await.unwrap();

    assert_eq!(
        api.calls(),
        vec![RecordedCall::AddReaction {
            channel: "C1".to_string(),
            ts: "1700000000.000001".to_string(),
            emoji: "thumbsup".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_send_dm_opens_im_then_posts_as_user() {
    let (api, client) = client_with(MockSlackApi::new().with_im("U1", "D42"));
    let user = client
        .cache()
        .register_user(&json!({"id": "U1", "name": "ann"}))
        .unwrap();

    let receipt = client
        .send_dm(&user, "hi there", vec![Attachment::text("more")])
        .await
        .unwrap();

    assert_eq!(receipt.channel, "D42");
    assert_eq!(
        api.calls(),
        vec![
            RecordedCall::OpenIm("U1".to_string()),
            RecordedCall::PostMessage {
                channel: "D42".to_string(),
                text: "hi there".to_string(),
                as_user: true,
            },
        ]
    );
    assert_eq!(api.posted()[0].attachments.len(), 1);
}

#[tokio::test]
async fn test_scheduled_send_requires_executor() {
    let (api, client) = client_with(MockSlackApi::new());

    let err = client
        .send_scheduled(
            Utc::now() + Duration::minutes(5),
            "C1",
            OutgoingMessage::text("later"),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("deferred executor"));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_scheduled_send_rejects_past_time() {
    let executor = Arc::new(RecordingExecutor::default());
    let (_api, client) = client_with(MockSlackApi::new());
    let client = client.with_scheduler(executor.clone());

    let err = client
        .send_dm_scheduled(Utc::now() - Duration::seconds(1), "U1", "too late", Vec::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("not in the future"));
    assert!(executor.jobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_scheduled_actions_store_ids_not_entities() {
    let executor = Arc::new(RecordingExecutor::default());
    let (api, client) = client_with(MockSlackApi::new());
    let client = client.with_scheduler(executor.clone());
    let user = client
        .cache()
        .register_user(&json!({"id": "U1", "name": "ann"}))
        .unwrap();
    let channel = client
        .cache()
        .register_channel(&json!({"id": "C1", "name": "general"}))
        .unwrap();
    let when = Utc::now() + Duration::hours(1);

    let send_id = client
        .send_scheduled(when, &channel, OutgoingMessage::text("standup"))
        .await
        .unwrap();
    let dm_id = client
        .send_dm_scheduled(when, &user, "reminder", Vec::new())
        .await
        .unwrap();

    let jobs = executor.jobs.lock().unwrap().clone();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, send_id);
    assert_eq!(jobs[0].run_at, when);
    assert_eq!(
        jobs[0].action,
        ScheduledAction::Send {
            channel_id: "C1".to_string(),
            message: OutgoingMessage::text("standup"),
        }
    );
    assert_eq!(jobs[1].id, dm_id);
    assert_eq!(
        serde_json::to_value(&jobs[1].action).unwrap(),
        json!({"action": "send_dm", "user_id": "U1", "text": "reminder"})
    );
    // nothing is sent until the executor runs the job
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_execute_replays_stored_action() {
    let (api, client) = client_with(MockSlackApi::new().with_im("U1", "D1"));

    let action = ScheduledAction::SendDm {
        user_id: "U1".to_string(),
        text: "scheduled hello".to_string(),
        attachments: Vec::new(),
    };
    let receipt = client.execute(&action).await.unwrap();

    assert_eq!(receipt.channel, "D1");
    assert!(api.calls().contains(&RecordedCall::PostMessage {
        channel: "D1".to_string(),
        text: "scheduled hello".to_string(),
        as_user: true,
    }));
}
