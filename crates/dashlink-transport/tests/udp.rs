//! Integration tests for the UDP transport.
//!
//! These bind real sockets on the loopback interface, so data actually
//! goes through the OS network stack.

#[cfg(feature = "udp")]
mod udp {
    use std::sync::Arc;
    use std::time::Duration;

    use dashlink_transport::{
        DatagramTransport, TransportError, UdpTransport, MAX_DATAGRAM_SIZE,
    };

    async fn bind_loopback() -> UdpTransport {
        UdpTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind")
    }

    #[tokio::test]
    async fn test_udp_send_and_receive() {
        let client = bind_loopback().await;
        let server = bind_loopback().await;
        let server_addr = server.local_addr().unwrap();
        let client_addr = client.local_addr().unwrap();

        client
            .send_to(b"JOIN", server_addr)
            .await
            .expect("send should succeed");

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, source) = tokio::time::timeout(
            Duration::from_secs(2),
            server.recv_from(&mut buf),
        )
        .await
        .expect("should not time out")
        .expect("recv should succeed");

        assert_eq!(&buf[..len], b"JOIN");
        assert_eq!(source, client_addr);
    }

    #[tokio::test]
    async fn test_udp_try_send_is_received() {
        let client = bind_loopback().await;
        let server = bind_loopback().await;
        let server_addr = server.local_addr().unwrap();

        client
            .try_send_to(b"READY", server_addr)
            .expect("non-blocking send should succeed on an idle socket");

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, _) = tokio::time::timeout(
            Duration::from_secs(2),
            server.recv_from(&mut buf),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(&buf[..len], b"READY");
    }

    #[tokio::test]
    async fn test_udp_try_send_works_on_never_polled_socket() {
        let server = bind_loopback().await;
        let server_addr = server.local_addr().unwrap();

        // No await between bind and the sends: the reactor has never
        // reported this socket writable.
        let client = bind_loopback().await;
        for i in 0..16u8 {
            client
                .try_send_to(&[i], server_addr)
                .expect("an idle socket accepts datagrams");
        }

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        for i in 0..16u8 {
            let (len, _) = tokio::time::timeout(
                Duration::from_secs(2),
                server.recv_from(&mut buf),
            )
            .await
            .unwrap()
            .unwrap();
            assert_eq!(&buf[..len], &[i]);
        }
    }

    #[tokio::test]
    async fn test_udp_close_unblocks_pending_recv() {
        let transport = Arc::new(bind_loopback().await);

        let reader = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                let mut buf = [0u8; MAX_DATAGRAM_SIZE];
                transport.recv_from(&mut buf).await
            })
        };

        // Let the reader park inside recv_from.
        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.close();

        let result = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .expect("close should wake the reader")
            .expect("task should not panic");
        assert!(matches!(result, Err(TransportError::Closed)));
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_udp_send_after_close_fails() {
        let transport = bind_loopback().await;
        let target = transport.local_addr().unwrap();
        transport.close();

        assert!(matches!(
            transport.send_to(b"x", target).await,
            Err(TransportError::Closed)
        ));
        assert!(matches!(
            transport.try_send_to(b"x", target),
            Err(TransportError::Closed)
        ));
    }
}
