//! Subscription ingest.
//!
//! One background task per open conversation pulls events off the backend
//! stream and merges them into the store in receipt order. The store's own
//! `(timestamp, id)` insertion keeps display order correct even when an
//! event for an old message arrives late.
//!
//! When the stream ends the task resubscribes with backoff. Events missed
//! during the outage are not replayed; that gap is accepted behavior, and
//! only repeated resubscribe failure is surfaced to the user.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use palaver_shared::protocol::ChatEvent;
use palaver_shared::types::ChatId;
use palaver_store::ConversationStore;

use crate::config::ResubscribePolicy;
use crate::events::{notify, ClientNotification};
use crate::remote::RemoteHandle;

/// Handle to one conversation's ingest task.
#[derive(Debug)]
pub(crate) struct IngestHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl IngestHandle {
    /// Signal the task to stop and return its join handle. The stream
    /// receiver is dropped by the task; outstanding pending actions are
    /// not cancelled and resolve on their own.
    pub(crate) fn stop(self) -> JoinHandle<()> {
        let _ = self.shutdown.send(());
        self.task
    }
}

/// Spawn the ingest task for one conversation. The caller is responsible
/// for enforcing the one-subscription-per-conversation rule.
pub(crate) fn spawn_ingest(
    chat_id: ChatId,
    remote: RemoteHandle,
    store: Arc<Mutex<ConversationStore>>,
    notifications: mpsc::Sender<ClientNotification>,
    policy: ResubscribePolicy,
) -> IngestHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(run_ingest(
        chat_id,
        remote,
        store,
        notifications,
        policy,
        shutdown_rx,
    ));
    IngestHandle {
        shutdown: shutdown_tx,
        task,
    }
}

async fn run_ingest(
    chat_id: ChatId,
    remote: RemoteHandle,
    store: Arc<Mutex<ConversationStore>>,
    notifications: mpsc::Sender<ClientNotification>,
    policy: ResubscribePolicy,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut attempt: u32 = 0;

    'subscribe: loop {
        let mut events = loop {
            match remote.subscribe(chat_id.clone()).await {
                Ok(rx) => {
                    debug!(chat = %chat_id, "Subscription open");
                    attempt = 0;
                    break rx;
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= policy.max_attempts {
                        warn!(chat = %chat_id, attempt, error = %err, "Giving up on resubscribe");
                        notify(
                            &notifications,
                            ClientNotification::SubscriptionLost {
                                chat_id: chat_id.clone(),
                            },
                        );
                        return;
                    }
                    let delay = policy.backoff_delay(attempt);
                    debug!(
                        chat = %chat_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Subscribe failed, backing off"
                    );
                    tokio::select! {
                        _ = &mut shutdown => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!(chat = %chat_id, "Ingest shut down");
                    return;
                }
                event = events.recv() => match event {
                    Some(event) => apply_event(&store, &notifications, &chat_id, event),
                    None => {
                        warn!(chat = %chat_id, "Event stream ended, resubscribing");
                        continue 'subscribe;
                    }
                }
            }
        }
    }
}

/// Route one event to the matching store operation. Store operations are
/// idempotent, so redelivered events are harmless.
fn apply_event(
    store: &Arc<Mutex<ConversationStore>>,
    notifications: &mpsc::Sender<ClientNotification>,
    chat_id: &ChatId,
    event: ChatEvent,
) {
    if event.chat_id() != chat_id {
        warn!(
            chat = %chat_id,
            event_chat = %event.chat_id(),
            "Dropping event for another conversation"
        );
        return;
    }

    let mut guard = match store.lock() {
        Ok(guard) => guard,
        Err(_) => {
            error!(chat = %chat_id, "Store lock poisoned, dropping event");
            return;
        }
    };

    match event {
        ChatEvent::MessageCreated(record) => {
            let (message_id, sender, timestamp) =
                (record.id.clone(), record.sender.clone(), record.timestamp);
            match guard.append(record) {
                Ok(true) => {
                    drop(guard);
                    notify(
                        notifications,
                        ClientNotification::MessageReceived {
                            chat_id: chat_id.clone(),
                            message_id,
                            sender,
                            timestamp,
                        },
                    );
                }
                Ok(false) => {
                    drop(guard);
                    notify(
                        notifications,
                        ClientNotification::ConversationUpdated {
                            chat_id: chat_id.clone(),
                        },
                    );
                }
                Err(err) => {
                    warn!(chat = %chat_id, message = %message_id, error = %err, "Dropping malformed message event");
                }
            }
        }
        ChatEvent::MessageDeleted { message_id, .. } => {
            guard.remove(chat_id, &message_id);
            drop(guard);
            notify(
                notifications,
                ClientNotification::ConversationUpdated {
                    chat_id: chat_id.clone(),
                },
            );
        }
        ChatEvent::ReactionChanged {
            message_id,
            reactor,
            kind,
            action,
            ..
        } => {
            if guard
                .apply_reaction(chat_id, &message_id, reactor, kind, action)
                .is_none()
            {
                debug!(chat = %chat_id, message = %message_id, "Reaction for absent message ignored");
            }
            drop(guard);
            notify(
                notifications,
                ClientNotification::ConversationUpdated {
                    chat_id: chat_id.clone(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use chrono::DateTime;

    use palaver_shared::error::RemoteError;
    use palaver_shared::protocol::{MessageRecord, ReactionAction};
    use palaver_shared::types::{MessageId, ReactionKind, Reactions, WalletAddress};

    use crate::remote::{remote_channel, RemoteCommand};

    fn chat() -> ChatId {
        ChatId::from("chat-1")
    }

    fn record(id: &str, secs: i64) -> MessageRecord {
        MessageRecord {
            id: MessageId::from(id),
            chat_id: chat(),
            sender: WalletAddress::from("0xAlice"),
            text: Some(format!("message {id}")),
            image: None,
            reactions: Reactions::new(),
            timestamp: DateTime::from_timestamp(secs, 0).unwrap(),
        }
    }

    fn fast_policy(max_attempts: u32) -> ResubscribePolicy {
        ResubscribePolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn harness() -> (
        Arc<Mutex<ConversationStore>>,
        mpsc::Sender<ClientNotification>,
        mpsc::Receiver<ClientNotification>,
    ) {
        let store = Arc::new(Mutex::new(ConversationStore::new()));
        store.lock().unwrap().upsert_conversation(chat(), false);
        let (tx, rx) = mpsc::channel(64);
        (store, tx, rx)
    }

    async fn expect_subscribe(
        commands: &mut mpsc::Receiver<RemoteCommand>,
    ) -> mpsc::Sender<ChatEvent> {
        match commands.recv().await.unwrap() {
            RemoteCommand::Subscribe { reply, .. } => {
                let (events_tx, events_rx) = mpsc::channel(16);
                reply.send(Ok(events_rx)).unwrap();
                events_tx
            }
            other => panic!("expected Subscribe, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_order_events_sort_chronologically() {
        let (store, notify_tx, mut notify_rx) = harness();
        let (remote, mut commands) = remote_channel(8);
        let handle = spawn_ingest(chat(), remote, store.clone(), notify_tx, fast_policy(3));

        let events = expect_subscribe(&mut commands).await;
        for secs in [3, 1, 2] {
            events
                .send(ChatEvent::MessageCreated(record(&format!("m{secs}"), secs)))
                .await
                .unwrap();
        }
        for _ in 0..3 {
            assert!(matches!(
                notify_rx.recv().await.unwrap(),
                ClientNotification::MessageReceived { .. }
            ));
        }

        let ids: Vec<String> = store
            .lock()
            .unwrap()
            .snapshot(&chat())
            .into_iter()
            .map(|m| m.id.0)
            .collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_and_reaction_events() {
        let (store, notify_tx, mut notify_rx) = harness();
        let (remote, mut commands) = remote_channel(8);
        let handle = spawn_ingest(chat(), remote, store.clone(), notify_tx, fast_policy(3));

        let events = expect_subscribe(&mut commands).await;
        events
            .send(ChatEvent::MessageCreated(record("m1", 1)))
            .await
            .unwrap();
        // At-least-once delivery: the same reaction event arrives twice.
        for _ in 0..2 {
            events
                .send(ChatEvent::ReactionChanged {
                    chat_id: chat(),
                    message_id: MessageId::from("m1"),
                    reactor: WalletAddress::from("0xBob"),
                    kind: "👍".into(),
                    action: ReactionAction::Add,
                })
                .await
                .unwrap();
        }

        notify_rx.recv().await.unwrap();
        for _ in 0..2 {
            assert!(matches!(
                notify_rx.recv().await.unwrap(),
                ClientNotification::ConversationUpdated { .. }
            ));
        }
        {
            let guard = store.lock().unwrap();
            let message = guard.message(&chat(), &MessageId::from("m1")).unwrap();
            let kind = ReactionKind::from("👍");
            assert_eq!(message.reactions.get(&kind).unwrap().len(), 1);
        }

        events
            .send(ChatEvent::MessageDeleted {
                chat_id: chat(),
                message_id: MessageId::from("m1"),
            })
            .await
            .unwrap();
        notify_rx.recv().await.unwrap();

        assert_eq!(store.lock().unwrap().message_count(&chat()), 0);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_resubscribes_after_stream_drop_keeping_state() {
        let (store, notify_tx, mut notify_rx) = harness();
        let (remote, mut commands) = remote_channel(8);
        let handle = spawn_ingest(chat(), remote, store.clone(), notify_tx, fast_policy(3));

        let events = expect_subscribe(&mut commands).await;
        events
            .send(ChatEvent::MessageCreated(record("m1", 1)))
            .await
            .unwrap();
        notify_rx.recv().await.unwrap();
        drop(events);

        // Second subscription after the gap; earlier state survives.
        let events = expect_subscribe(&mut commands).await;
        events
            .send(ChatEvent::MessageCreated(record("m2", 2)))
            .await
            .unwrap();
        notify_rx.recv().await.unwrap();

        assert_eq!(store.lock().unwrap().message_count(&chat()), 2);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_reports_subscription_lost_after_exhausted_retries() {
        let (store, notify_tx, mut notify_rx) = harness();
        let (remote, mut commands) = remote_channel(8);
        let _handle = spawn_ingest(chat(), remote, store, notify_tx, fast_policy(2));

        for _ in 0..2 {
            match commands.recv().await.unwrap() {
                RemoteCommand::Subscribe { reply, .. } => {
                    reply
                        .send(Err(RemoteError::Rejected("unavailable".into())))
                        .unwrap();
                }
                other => panic!("expected Subscribe, got {other:?}"),
            }
        }

        assert_eq!(
            notify_rx.recv().await.unwrap(),
            ClientNotification::SubscriptionLost { chat_id: chat() }
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_task() {
        let (store, notify_tx, _notify_rx) = harness();
        let (remote, mut commands) = remote_channel(8);
        let handle = spawn_ingest(chat(), remote, store, notify_tx, fast_policy(3));

        let _events = expect_subscribe(&mut commands).await;
        handle.stop().await.unwrap();
    }
}
