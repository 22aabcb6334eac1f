//! Scenario 1 from the protocol's end-to-end test list: two clients
//! register, one sends a message to the other, and the receiver both
//! gets the push and can read the message back out of its history.

mod support;

#[tokio::test]
async fn register_then_send_then_receive_and_read_back() {
    let server = support::spawn_server().await;

    let (id_a, mut a) = support::register(&server, b"\x31\x32\x33\x34").await;
    let (id_b, mut b) = support::register(&server, b"hunter2").await;
    assert_ne!(id_a, id_b);

    let sent = b.client.send_message(id_a, b"hello".to_vec()).await.unwrap();
    assert!(sent);

    let pushed = a.pushes.recv().await.expect("A receives a push");
    assert_eq!(pushed.sender, id_b);
    assert_eq!(pushed.content, b"hello");

    let count = a.client.get_messages_count(id_b).await.unwrap();
    assert_eq!(count, Some(1));

    let messages = a.client.get_messages(id_b, 0, 1).await.unwrap().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, id_b);
    assert_eq!(messages[0].content, b"hello");

    a.client.disconnect().await;
    b.client.disconnect().await;
}
