//! The facade exposes a working transport through its prelude and root.

use ironring::prelude::*;
use tempfile::tempdir;

#[test]
fn test_prelude_duplex_round_trip() {
    let dir = tempdir().unwrap();
    let inbound = dir.path().join("ipc-in");
    let outbound = dir.path().join("ipc-out");
    let config = TransportConfig::with_capacity(4096).wait(WaitStrategy::NoWait);

    let mut client = DuplexLink::open(&inbound, &outbound, config.clone()).unwrap();
    let mut server = DuplexLink::open(&outbound, &inbound, config).unwrap();

    client.send(b"ping").unwrap();
    assert_eq!(server.echo().unwrap(), 4);

    let mut reply = Vec::new();
    assert_eq!(client.poll(|p| reply.extend_from_slice(p)), 4);
    assert_eq!(reply, b"ping");
}

#[test]
fn test_root_reexports_report_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ring");

    let mut ring = ironring::RingTransport::create(&path, 1024).unwrap();
    let result: TransportResult<_> = ring.publish(&[0u8; 2048]);
    assert!(matches!(
        result,
        Err(ironring::TransportError::PayloadTooLarge {
            size: 2048,
            max: 960
        })
    ));

    let err = ironring::transport::RingTransport::create(&path, 4096).unwrap_err();
    assert!(matches!(err, TransportError::LayoutMismatch { .. }));
}
