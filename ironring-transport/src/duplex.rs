//! Bidirectional link built from two independent rings.
//!
//! Each side opens the same two files with the roles swapped:
//!
//! ```ignore
//! let client = DuplexLink::open("/dev/shm/ipc-in", "/dev/shm/ipc-out", config.clone())?;
//! let server = DuplexLink::open("/dev/shm/ipc-out", "/dev/shm/ipc-in", config)?;
//! ```

use crate::config::TransportConfig;
use crate::error::Result;
use crate::transport::RingTransport;
use std::path::Path;

/// A pair of rings: one this side publishes on, one it polls.
#[derive(Debug)]
pub struct DuplexLink {
    outbound: RingTransport,
    inbound: RingTransport,
}

impl DuplexLink {
    /// Opens both rings with the same configuration.
    ///
    /// # Arguments
    /// * `outbound` - Ring this side publishes on
    /// * `inbound` - Ring this side polls
    /// * `config` - Configuration applied to both rings
    ///
    /// # Errors
    /// Returns an error if either ring cannot be opened.
    pub fn open(
        outbound: impl AsRef<Path>,
        inbound: impl AsRef<Path>,
        config: TransportConfig,
    ) -> Result<Self> {
        Ok(Self {
            outbound: RingTransport::open(outbound, config.clone())?,
            inbound: RingTransport::open(inbound, config)?,
        })
    }

    /// Builds a link from two already opened rings.
    #[must_use]
    pub fn from_parts(outbound: RingTransport, inbound: RingTransport) -> Self {
        Self { outbound, inbound }
    }

    /// Publishes a record on the outbound ring.
    ///
    /// # Errors
    /// See [`RingTransport::publish`].
    #[inline]
    pub fn send(&mut self, payload: &[u8]) -> Result<Option<u64>> {
        self.outbound.publish(payload)
    }

    /// Polls the inbound ring.
    ///
    /// # Panics
    /// Panics on a corrupt inbound record header, as
    /// [`RingTransport::poll`] does.
    #[inline]
    pub fn poll<F>(&mut self, receiver: F) -> usize
    where
        F: FnOnce(&[u8]),
    {
        self.inbound.poll(receiver)
    }

    /// Polls one inbound record and publishes it unchanged on the outbound
    /// ring.
    ///
    /// # Returns
    /// The length of the echoed record, or 0 if nothing was available.
    ///
    /// # Errors
    /// Returns the outbound publish error, if any. The inbound record is
    /// consumed either way.
    ///
    /// # Panics
    /// Panics on a corrupt inbound record header, as
    /// [`RingTransport::poll`] does.
    pub fn echo(&mut self) -> Result<usize> {
        let outbound = &mut self.outbound;
        let mut published = Ok(None);
        let len = self
            .inbound
            .poll(|payload| published = outbound.publish(payload));
        published?;
        Ok(len)
    }

    /// Returns the ring this side publishes on.
    pub fn outbound(&mut self) -> &mut RingTransport {
        &mut self.outbound
    }

    /// Returns the ring this side polls.
    pub fn inbound(&mut self) -> &mut RingTransport {
        &mut self.inbound
    }

    /// Splits the link into its outbound and inbound rings.
    #[must_use]
    pub fn into_parts(self) -> (RingTransport, RingTransport) {
        (self.outbound, self.inbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::SharedMapping;
    use tempfile::tempdir;

    fn pair(capacity: usize) -> (tempfile::TempDir, DuplexLink, DuplexLink) {
        let dir = tempdir().unwrap();
        let a = dir.path().join("ipc-in");
        let b = dir.path().join("ipc-out");
        let config = TransportConfig::with_capacity(capacity);
        let client = DuplexLink::open(&a, &b, config.clone()).unwrap();
        let server = DuplexLink::open(&b, &a, config).unwrap();
        (dir, client, server)
    }

    #[test]
    fn test_duplex_request_response() {
        let (_dir, mut client, mut server) = pair(4096);

        client.send(b"request").unwrap();
        let mut request = Vec::new();
        assert_eq!(server.poll(|p| request.extend_from_slice(p)), 7);
        assert_eq!(request, b"request");

        server.send(b"response").unwrap();
        let mut response = Vec::new();
        assert_eq!(client.poll(|p| response.extend_from_slice(p)), 8);
        assert_eq!(response, b"response");
    }

    #[test]
    fn test_duplex_echo() {
        let (_dir, mut client, mut server) = pair(1024);

        assert_eq!(server.echo().unwrap(), 0);
        for i in 0..20u8 {
            client.send(&[i; 100]).unwrap();
            assert_eq!(server.echo().unwrap(), 100);
            let echoed = client.inbound().poll_bytes().unwrap();
            assert_eq!(echoed.as_ref(), &[i; 100]);
        }
    }

    #[test]
    fn test_duplex_directions_independent() {
        let (_dir, mut client, mut server) = pair(1024);

        client.send(b"one way").unwrap();
        assert_eq!(client.poll(|_| panic!("nothing sent back")), 0);
        assert_eq!(server.outbound().pending_bytes(), 0);
        assert_eq!(server.inbound().pending_bytes(), 128);

        let (outbound, inbound) = client.into_parts();
        let mut rebuilt = DuplexLink::from_parts(outbound, inbound);
        rebuilt.send(b"again").unwrap();
        assert_eq!(server.inbound().drain(|_| {}), 2);
    }

    #[test]
    #[should_panic(expected = "corrupt record header")]
    fn test_duplex_echo_panics_on_corrupt_inbound() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("ipc-in");
        let b = dir.path().join("ipc-out");
        let config = TransportConfig::with_capacity(1024);
        let mut server = DuplexLink::open(&b, &a, config.clone()).unwrap();

        let foreign = SharedMapping::open(&a, &config).unwrap();
        foreign.data().store_header_release(0, 5000);
        let _ = server.echo();
    }
}
