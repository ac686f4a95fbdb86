//! Connect drivers: the only modules in this crate that perform actual
//! stream I/O. [`blocking`] drives any `Read + Write` stream; [`asynch`]
//! drives any `AsyncRead + AsyncWrite` stream and accepts a
//! [`tokio_util::sync::CancellationToken`] for cooperative cancellation.

pub mod asynch;
pub mod blocking;
