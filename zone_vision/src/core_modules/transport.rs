// THEORY:
// The transport is the byte-oriented sink between the encoder and the external
// controller. It owns message framing: the encoder produces bare payloads, and
// the transport decides whether each one is followed by a newline. Any
// `std::io::Write` can serve, which covers a serial device node opened as a
// file, a pipe, stdout, or an in-memory buffer in tests.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// How a message is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// The payload bytes only.
    Raw,
    /// The payload followed by `\n`.
    #[default]
    Newline,
}

/// A sink for encoded messages.
pub trait Transport: Send {
    fn send(&mut self, payload: &[u8]) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        (**self).send(payload)
    }
}

/// Writes each message to `W` and flushes it.
#[derive(Debug)]
pub struct WriterTransport<W> {
    writer: W,
    framing: Framing,
}

impl<W: Write + Send> WriterTransport<W> {
    pub fn new(writer: W, framing: Framing) -> Self {
        Self { writer, framing }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Transport for WriterTransport<W> {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.writer.write_all(payload)?;
        if self.framing == Framing::Newline {
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }
}
