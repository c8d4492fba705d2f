//! Echo example: a client and an echo server connected by two rings.
//!
//! The client stamps each message with a sequence number, the server thread
//! publishes every record it receives straight back, and the client checks
//! that replies arrive in order.
//!
//! Run with: `cargo run --example echo --release`
//!
//! Set `IRONRING_DIR` to place the ring files elsewhere (defaults to
//! `/dev/shm` when present, otherwise a temporary directory). Use
//! `RUST_LOG=ironring_transport=trace` to watch wraparounds.

use ironring::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const MESSAGE_COUNT: u64 = 1 << 16;
const MESSAGE_SIZE: usize = 256;
const BUFFER_SIZE: usize = 1 << 16;

fn ring_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("IRONRING_DIR") {
        return PathBuf::from(dir);
    }
    let shm = PathBuf::from("/dev/shm");
    if shm.is_dir() { shm } else { std::env::temp_dir() }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dir = ring_dir();
    let ipc_in = dir.join("ironring-ipc-in");
    let ipc_out = dir.join("ironring-ipc-out");

    // Stale rings from a previous run would be resumed, not restarted.
    let config = TransportConfig::with_capacity(BUFFER_SIZE).reset(true);
    let mut client = DuplexLink::open(&ipc_in, &ipc_out, config.clone())?;
    let config = config.reset(false);
    let mut server = DuplexLink::open(&ipc_out, &ipc_in, config)?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let echo = thread::Builder::new()
        .name("echo".into())
        .spawn(move || -> TransportResult<u64> {
            let mut echoed = 0;
            while flag.load(Ordering::Relaxed) {
                if server.echo()? != 0 {
                    echoed += 1;
                }
            }
            Ok(echoed)
        })?;

    tracing::info!(
        "Sending {} messages of {} bytes through {}",
        MESSAGE_COUNT,
        MESSAGE_SIZE,
        dir.display()
    );

    let mut message = [7u8; MESSAGE_SIZE];
    let mut min = Duration::MAX;
    let mut max = Duration::ZERO;
    let started = Instant::now();
    for sequence in 0..MESSAGE_COUNT {
        message[MESSAGE_SIZE - 8..].copy_from_slice(&sequence.to_le_bytes());
        let sent = Instant::now();
        client.send(&message)?;

        let mut reply = None;
        while client.poll(|payload| {
            let mut tail = [0u8; 8];
            tail.copy_from_slice(&payload[payload.len() - 8..]);
            reply = Some(u64::from_le_bytes(tail));
        }) == 0
        {
            std::hint::spin_loop();
        }

        let rtt = sent.elapsed();
        min = min.min(rtt);
        max = max.max(rtt);
        if reply != Some(sequence) {
            return Err(format!("expected sequence {sequence}, got {reply:?}").into());
        }
    }
    let elapsed = started.elapsed();

    running.store(false, Ordering::Relaxed);
    let echoed = echo
        .join()
        .map_err(|_| "echo thread panicked")??;

    println!("Round trips:  {}", echoed);
    println!("Min RTT:      {:?}", min);
    println!("Mean RTT:     {:?}", elapsed / MESSAGE_COUNT as u32);
    println!("Max RTT:      {:?}", max);

    std::fs::remove_file(&ipc_in).ok();
    std::fs::remove_file(&ipc_out).ok();
    Ok(())
}
