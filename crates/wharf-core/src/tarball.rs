//! Tarball stream plumbing.
//!
//! When a tarball is served from an uplink, the byte stream is teed into a
//! local cache write so the next request is served locally. Caching is best
//! effort: a cache failure downgrades to serving the remote bytes directly,
//! it never fails the download.

use std::io::{self, Read};

use tracing::warn;

use crate::local::TarballSink;

/// Reader that mirrors everything it yields into a local cache sink.
///
/// The sink is committed when the source reaches EOF and aborted when the
/// source errors or the reader is dropped before completion. A sink write
/// failure drops the sink and the stream keeps serving uncached.
pub struct CachingReader {
    inner: Box<dyn Read + Send>,
    sink: Option<Box<dyn TarballSink>>,
}

impl CachingReader {
    pub fn new(inner: Box<dyn Read + Send>, sink: Option<Box<dyn TarballSink>>) -> Self {
        Self { inner, sink }
    }
}

impl Read for CachingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Ok(0) => {
                if let Some(mut sink) = self.sink.take() {
                    if let Err(err) = sink.commit() {
                        warn!(error = %err, "failed to commit tarball cache");
                    }
                }
                Ok(0)
            }
            Ok(n) => {
                if let Some(sink) = self.sink.as_mut() {
                    if let Err(err) = io::Write::write_all(sink, &buf[..n]) {
                        warn!(error = %err, "cache write failed, serving without caching");
                        if let Some(mut sink) = self.sink.take() {
                            sink.abort();
                        }
                    }
                }
                Ok(n)
            }
            Err(err) => {
                if let Some(mut sink) = self.sink.take() {
                    sink.abort();
                }
                Err(err)
            }
        }
    }
}

impl Drop for CachingReader {
    fn drop(&mut self) {
        // Cancelled before EOF: never commit a partial cache entry.
        if let Some(mut sink) = self.sink.take() {
            sink.abort();
        }
    }
}
