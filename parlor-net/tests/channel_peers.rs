//! `GetChannelPeers`: a client's peer list should be empty until a
//! channel actually exists, and should name the other participant once
//! a message has passed between them.

mod support;

#[tokio::test]
async fn peers_list_reflects_channels_with_messages() {
    let server = support::spawn_server().await;
    let (id_a, mut a) = support::register(&server, b"alice-pw").await;
    let (id_b, mut b) = support::register(&server, b"bob-pw").await;

    assert_eq!(a.client.get_channel_peers().await.unwrap(), Vec::new());
    assert_eq!(b.client.get_channel_peers().await.unwrap(), Vec::new());

    assert!(a.client.send_message(id_b, b"hi".to_vec()).await.unwrap());
    b.pushes.recv().await.expect("push observed");

    assert_eq!(a.client.get_channel_peers().await.unwrap(), vec![id_b]);
    assert_eq!(b.client.get_channel_peers().await.unwrap(), vec![id_a]);

    a.client.disconnect().await;
    b.client.disconnect().await;
}
