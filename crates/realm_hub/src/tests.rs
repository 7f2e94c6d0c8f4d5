
// Include tests
#[cfg(test)]
mod tests {
    use crate::auth::{sign_connect_token, validate_ws_request};
    use crate::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex};
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq)]
    enum LifecycleEvent {
        Created(Realm),
        Joined {
            realm: Realm,
            user: String,
            first_user: bool,
        },
        Left {
            realm: Realm,
            user: String,
        },
        Deleted(Realm),
        Handled {
            mtype: MessageType,
            data: String,
            from: String,
        },
    }

    /// Records every lifecycle call the hub makes, in order.
    #[derive(Default)]
    struct RecordingHandler {
        events: Mutex<Vec<LifecycleEvent>>,
    }

    impl RecordingHandler {
        async fn events(&self) -> Vec<LifecycleEvent> {
            self.events.lock().await.clone()
        }

        async fn push(&self, event: LifecycleEvent) {
            self.events.lock().await.push(event);
        }
    }

    #[async_trait]
    impl RealmHandler for RecordingHandler {
        async fn handle_message(&self, msg: Message) {
            self.push(LifecycleEvent::Handled {
                mtype: msg.mtype,
                data: msg.data,
                from: msg.from,
            })
            .await;
        }

        async fn realm_creation(&self, realm: Realm) {
            self.push(LifecycleEvent::Created(realm)).await;
        }

        async fn realm_join(&self, realm: Realm, user: &str, _conn_id: ConnectionId, first_user: bool) {
            self.push(LifecycleEvent::Joined {
                realm,
                user: user.to_string(),
                first_user,
            })
            .await;
        }

        async fn realm_leave(&self, realm: Realm, user: &str, _conn_id: ConnectionId) {
            self.push(LifecycleEvent::Left {
                realm,
                user: user.to_string(),
            })
            .await;
        }

        async fn realm_deletion(&self, realm: Realm) {
            self.push(LifecycleEvent::Deleted(realm)).await;
        }
    }

    struct TestClient {
        id: ConnectionId,
        outbound: mpsc::Receiver<String>,
    }

    fn spawn_hub() -> (HubHandle, Arc<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::default());
        let (handle, commands) = RealmHub::channel();
        tokio::spawn(RealmHub::new(commands, handler.clone()).run());
        (handle, handler)
    }

    fn connect(handle: &HubHandle, realm: &Realm, user: &str, buffer: usize) -> TestClient {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(buffer);
        handle.register(
            realm.clone(),
            RealmConnection {
                id,
                username: user.to_string(),
                outbound: tx,
            },
        );
        TestClient { id, outbound: rx }
    }

    fn chat(realm: &Realm, from: &str, data: &str) -> Message {
        Message {
            data: data.to_string(),
            mtype: MessageType::Chat,
            from: from.to_string(),
            realm: realm.clone(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_realm_lifecycle_events() {
        let (handle, handler) = spawn_hub();
        let realm = Realm::from("footable");

        let alice = connect(&handle, &realm, "alice", 8);
        let bob = connect(&handle, &realm, "bob", 8);

        let stats = handle.stats().await.expect("hub should be running");
        assert_eq!(stats.realms, 1);
        assert_eq!(stats.connections, 2);

        handle.unregister(realm.clone(), alice.id);
        handle.unregister(realm.clone(), bob.id);
        let stats = handle.stats().await.expect("hub should be running");
        assert_eq!(stats.realms, 0);
        assert_eq!(stats.connections, 0);

        let events = handler.events().await;
        assert_eq!(
            events,
            vec![
                LifecycleEvent::Created(realm.clone()),
                LifecycleEvent::Joined {
                    realm: realm.clone(),
                    user: "alice".to_string(),
                    first_user: true,
                },
                LifecycleEvent::Joined {
                    realm: realm.clone(),
                    user: "bob".to_string(),
                    first_user: false,
                },
                LifecycleEvent::Left {
                    realm: realm.clone(),
                    user: "alice".to_string(),
                },
                LifecycleEvent::Left {
                    realm: realm.clone(),
                    user: "bob".to_string(),
                },
                LifecycleEvent::Deleted(realm),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_realm_recreated_after_deletion() {
        let (handle, handler) = spawn_hub();
        let realm = Realm::from("footable");

        let alice = connect(&handle, &realm, "alice", 8);
        handle.unregister(realm.clone(), alice.id);
        let _alice_again = connect(&handle, &realm, "alice", 8);
        handle.stats().await.expect("hub should be running");

        let events = handler.events().await;
        let creations = events
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Created(_)))
            .count();
        assert_eq!(creations, 2);
        // The re-join starts a fresh realm, so it is a first user again.
        assert!(matches!(
            events.last(),
            Some(LifecycleEvent::Joined { first_user: true, .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_unregister_is_noop() {
        let (handle, handler) = spawn_hub();
        let realm = Realm::from("footable");

        let alice = connect(&handle, &realm, "alice", 8);
        handle.unregister(realm.clone(), alice.id);
        handle.unregister(realm.clone(), alice.id);
        handle.stats().await.expect("hub should be running");

        let events = handler.events().await;
        let leaves = events
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Left { .. }))
            .count();
        let deletions = events
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Deleted(_)))
            .count();
        assert_eq!(leaves, 1);
        assert_eq!(deletions, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_inbound_chat_is_broadcast_verbatim() {
        let (handle, _handler) = spawn_hub();
        let realm = Realm::from("footable");

        let mut alice = connect(&handle, &realm, "alice", 8);
        let mut bob = connect(&handle, &realm, "bob", 8);
        handle.inbound(chat(&realm, "alice", "hello there"));
        handle.stats().await.expect("hub should be running");

        for client in [&mut alice, &mut bob] {
            let raw = client.outbound.try_recv().expect("broadcast should reach every member");
            let wire: serde_json::Value = serde_json::from_str(&raw).expect("valid JSON");
            assert_eq!(wire["data"], "hello there");
            assert_eq!(wire["type"], "chat");
            assert_eq!(wire["from"], "alice");
            // The realm travels out-of-band, never on the wire.
            assert!(wire.get("realm").is_none());
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_broadcast_scoped_to_realm() {
        let (handle, _handler) = spawn_hub();
        let here = Realm::from("room-1");
        let there = Realm::from("room-2");

        let mut near = connect(&handle, &here, "alice", 8);
        let mut far = connect(&handle, &there, "bob", 8);
        handle.inbound(chat(&here, "alice", "only for room-1"));
        handle.stats().await.expect("hub should be running");

        assert!(near.outbound.try_recv().is_ok());
        assert!(far.outbound.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_handler_bound_messages_are_not_broadcast() {
        let (handle, handler) = spawn_hub();
        let realm = Realm::from("footable");

        let mut alice = connect(&handle, &realm, "alice", 8);
        handle.inbound(Message {
            data: "start".to_string(),
            mtype: MessageType::TableCmd,
            from: "alice".to_string(),
            realm: realm.clone(),
        });
        handle.inbound(Message {
            data: "AEINRST".to_string(),
            mtype: MessageType::Guess,
            from: "alice".to_string(),
            realm: realm.clone(),
        });
        handle.stats().await.expect("hub should be running");

        assert!(alice.outbound.try_recv().is_err());
        let handled: Vec<_> = handler
            .events()
            .await
            .into_iter()
            .filter(|e| matches!(e, LifecycleEvent::Handled { .. }))
            .collect();
        assert_eq!(handled.len(), 2);
        assert_eq!(
            handled[0],
            LifecycleEvent::Handled {
                mtype: MessageType::TableCmd,
                data: "start".to_string(),
                from: "alice".to_string(),
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_private_messages_are_suppressed() {
        let (handle, handler) = spawn_hub();
        let realm = Realm::from("footable");

        let mut alice = connect(&handle, &realm, "alice", 8);
        handle.inbound(Message {
            data: "psst".to_string(),
            mtype: MessageType::Private,
            from: "alice".to_string(),
            realm: realm.clone(),
        });
        handle.stats().await.expect("hub should be running");

        assert!(alice.outbound.try_recv().is_err());
        assert!(!handler
            .events()
            .await
            .iter()
            .any(|e| matches!(e, LifecycleEvent::Handled { .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_backpressure_disconnects_slow_consumer() {
        let (handle, handler) = spawn_hub();
        let realm = Realm::from("footable");

        let mut fast = connect(&handle, &realm, "fast", 8);
        // A one-slot queue that nobody drains: the first broadcast fills
        // it, the second marks the connection unresponsive.
        let _slow = connect(&handle, &realm, "slow", 1);

        handle.broadcast_message(&realm, MessageType::Server, "one".to_string());
        handle.broadcast_message(&realm, MessageType::Server, "two".to_string());
        let stats = handle.stats().await.expect("hub should be running");

        assert_eq!(stats.connections, 1);
        assert!(handler.events().await.contains(&LifecycleEvent::Left {
            realm: realm.clone(),
            user: "slow".to_string(),
        }));

        // Fan-out to the healthy connection was unaffected.
        assert!(fast.outbound.try_recv().unwrap().contains("one"));
        assert!(fast.outbound.try_recv().unwrap().contains("two"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_backpressure_disconnect_can_delete_realm() {
        let (handle, handler) = spawn_hub();
        let realm = Realm::from("footable");

        let _slow = connect(&handle, &realm, "slow", 1);
        handle.broadcast_message(&realm, MessageType::Server, "one".to_string());
        handle.broadcast_message(&realm, MessageType::Server, "two".to_string());
        let stats = handle.stats().await.expect("hub should be running");

        assert_eq!(stats.realms, 0);
        assert!(handler
            .events()
            .await
            .contains(&LifecycleEvent::Deleted(realm)));
    }

    #[test]
    fn test_message_wire_shape() {
        let msg = Message::server(Realm::from("123456"), MessageType::Countdown, "3".to_string());
        let wire: serde_json::Value = serde_json::to_value(&msg).expect("serializes");
        assert_eq!(wire["type"], "countdown");
        assert_eq!(wire["data"], "3");
        assert_eq!(wire["from"], "");
        assert!(wire.get("realm").is_none());

        // Clients may omit `from`; the transport stamps it anyway.
        let inbound: Message =
            serde_json::from_str(r#"{"data": "start", "type": "tableCmd"}"#).expect("decodes");
        assert_eq!(inbound.mtype, MessageType::TableCmd);
        assert_eq!(inbound.from, "");
        assert_eq!(inbound.realm, Realm::default());

        assert!(serde_json::from_str::<Message>(r#"{"data": "x", "type": "warp"}"#).is_err());
    }

    const TEST_SECRET: &str = "a-very-secret-key";

    #[test]
    fn test_token_round_trip() {
        let token = sign_connect_token(TEST_SECRET, 2_000, "123456", "cesar");
        let query = format!("realm=123456&user=cesar&expire=2000&_token={token}");
        let creds = validate_ws_request(&query, TEST_SECRET, 1_000).expect("token should verify");
        assert_eq!(creds.realm, Realm::from("123456"));
        assert_eq!(creds.username, "cesar");
    }

    #[test]
    fn test_token_rejections() {
        let token = sign_connect_token(TEST_SECRET, 2_000, "123456", "cesar");

        // Expired.
        let query = format!("realm=123456&user=cesar&expire=2000&_token={token}");
        assert!(matches!(
            validate_ws_request(&query, TEST_SECRET, 3_000),
            Err(HubError::Auth(_))
        ));

        // Identity does not match what was signed.
        let query = format!("realm=123456&user=mallory&expire=2000&_token={token}");
        assert!(matches!(
            validate_ws_request(&query, TEST_SECRET, 1_000),
            Err(HubError::Auth(_))
        ));

        // Wrong key.
        let query = format!("realm=123456&user=cesar&expire=2000&_token={token}");
        assert!(matches!(
            validate_ws_request(&query, "other-key", 1_000),
            Err(HubError::Auth(_))
        ));

        // Missing realm and user.
        let query = format!("expire=2000&_token={token}");
        assert!(matches!(
            validate_ws_request(&query, TEST_SECRET, 1_000),
            Err(HubError::Auth(_))
        ));

        // Token must be hex.
        let query = "realm=123456&user=cesar&expire=2000&_token=zzzz";
        assert!(matches!(
            validate_ws_request(query, TEST_SECRET, 1_000),
            Err(HubError::Auth(_))
        ));

        // No secret configured is a server-side problem, not a bad token.
        let query = format!("realm=123456&user=cesar&expire=2000&_token={token}");
        assert!(matches!(
            validate_ws_request(&query, "", 1_000),
            Err(HubError::Internal(_))
        ));
    }
}
