//! Cross-thread tests: producer and consumer each hold their own mapping of
//! the same file, as two processes would.

use ironring_transport::{DuplexLink, RingTransport, TransportConfig, WaitStrategy};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn record(sequence: u64) -> Vec<u8> {
    // Vary lengths so records land on every slot alignment and wrap often.
    let len = 8 + (sequence as usize * 37) % 500;
    let mut out = vec![(sequence % 251) as u8; len];
    out[..8].copy_from_slice(&sequence.to_le_bytes());
    out
}

#[test]
fn test_fifo_across_many_laps() {
    const COUNT: u64 = 50_000;

    let dir = tempdir().unwrap();
    let path = dir.path().join("fifo");
    let mut producer = RingTransport::create(&path, 4096).unwrap();
    let mut consumer = RingTransport::create(&path, 4096).unwrap();

    let reader = thread::spawn(move || {
        let mut expected = 0u64;
        while expected < COUNT {
            consumer.poll(|payload| {
                assert_eq!(payload, record(expected).as_slice());
                expected += 1;
            });
        }
        assert_eq!(consumer.poll(|_| panic!("no more records")), 0);
        consumer.subscriber_sequence()
    });

    for sequence in 0..COUNT {
        producer.publish(&record(sequence)).unwrap();
    }

    let drained = reader.join().unwrap();
    assert_eq!(drained, producer.publisher_sequence());
    assert!(drained > 4096 * 100, "test should wrap the ring many times");
}

#[test]
fn test_fifo_with_records_up_to_a_full_lap() {
    const COUNT: u64 = 5_000;
    const CAPACITY: usize = 4096;

    let dir = tempdir().unwrap();
    let path = dir.path().join("fifo_large");
    let mut producer = RingTransport::create(&path, CAPACITY).unwrap();
    let mut consumer = RingTransport::create(&path, CAPACITY).unwrap();
    let max = producer.max_payload_len();

    // Lengths sweep up to the largest payload, so most wraps carry a record
    // bigger than half the ring and start from a different slot.
    let large = move |sequence: u64| {
        let len = 8 + (sequence as usize * 977) % (max - 7);
        let mut out = vec![(sequence % 251) as u8; len];
        out[..8].copy_from_slice(&sequence.to_le_bytes());
        out
    };

    let reader = thread::spawn(move || {
        let mut expected = 0u64;
        while expected < COUNT {
            consumer.poll(|payload| {
                assert_eq!(payload, large(expected).as_slice());
                expected += 1;
            });
        }
        consumer.subscriber_sequence()
    });

    let mut largest = 0;
    for sequence in 0..COUNT {
        let message = large(sequence);
        largest = largest.max(message.len());
        producer.publish(&message).unwrap();
    }

    assert_eq!(largest, max);
    let drained = reader.join().unwrap();
    assert_eq!(drained, producer.publisher_sequence());
}

#[test]
fn test_producer_blocks_until_consumer_advances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("backpressure");
    let mut producer = RingTransport::create(&path, 1024).unwrap();
    let mut consumer = RingTransport::create(&path, 1024).unwrap();

    // Three 320-byte records fill the lap up to 960.
    for i in 0..3u8 {
        producer.publish(&[i; 200]).unwrap();
    }

    let published = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&published);
    let writer = thread::spawn(move || {
        producer.publish(&[3u8; 200]).unwrap();
        flag.store(true, Ordering::Release);
        producer
    });

    thread::sleep(Duration::from_millis(50));
    assert!(
        !published.load(Ordering::Acquire),
        "producer must not overwrite unread records"
    );

    let mut first = Vec::new();
    consumer.poll(|p| first.extend_from_slice(p));
    assert_eq!(first, vec![0u8; 200]);

    let deadline = Instant::now() + Duration::from_secs(5);
    while !published.load(Ordering::Acquire) {
        assert!(Instant::now() < deadline, "producer did not resume");
        thread::yield_now();
    }
    let producer = writer.join().unwrap();
    assert_eq!(producer.publisher_sequence(), 1344);

    for i in 1..4u8 {
        assert_eq!(consumer.poll_bytes().unwrap().as_ref(), &[i; 200]);
    }
    assert!(consumer.poll_bytes().is_none());
}

#[test]
fn test_bounded_wait_reports_stalled_consumer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stalled");
    let config = TransportConfig::with_capacity(1024)
        .wait(WaitStrategy::SpinFor(Duration::from_millis(20)));
    let mut producer = RingTransport::open(&path, config).unwrap();
    let _consumer = RingTransport::create(&path, 1024).unwrap();

    let mut accepted = 0;
    let err = loop {
        match producer.publish(&[9u8; 100]) {
            Ok(_) => accepted += 1,
            Err(err) => break err,
        }
    };
    assert!(err.is_would_block());
    assert_eq!(accepted, 5);
    assert!(producer.pending_bytes() <= 1024);
}

#[test]
fn test_duplex_echo_round_trips() {
    const COUNT: u64 = 10_000;

    let dir = tempdir().unwrap();
    let inbound = dir.path().join("ipc-in");
    let outbound = dir.path().join("ipc-out");
    let config = TransportConfig::with_capacity(8192);

    let mut client = DuplexLink::open(&inbound, &outbound, config.clone()).unwrap();
    let mut server = DuplexLink::open(&outbound, &inbound, config).unwrap();

    let echoed = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&echoed);
    let echo = thread::spawn(move || {
        while counter.load(Ordering::Relaxed) < COUNT {
            if server.echo().unwrap() != 0 {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    let mut message = [7u8; 256];
    let mut expected = 0u64;
    for sequence in 0..COUNT {
        message[248..].copy_from_slice(&sequence.to_le_bytes());
        client.send(&message).unwrap();
        while client.poll(|reply| {
            let tail: [u8; 8] = reply[248..].try_into().unwrap();
            assert_eq!(u64::from_le_bytes(tail), expected);
            expected += 1;
        }) == 0
        {
            std::hint::spin_loop();
        }
    }

    echo.join().unwrap();
    assert_eq!(expected, COUNT);
    assert_eq!(echoed.load(Ordering::Relaxed), COUNT);
}
