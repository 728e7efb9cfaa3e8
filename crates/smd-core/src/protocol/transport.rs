//! Bus transport
//!
//! The master only needs bounded reads, writes and a way to wait. Anything
//! implementing [`Transport`] can carry the protocol; [`SerialTransport`] is
//! the serial-port implementation.

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

/// Half-duplex byte channel to the bus
pub trait Transport: Send {
    /// Write all of `data` to the bus
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read up to `max_bytes`, blocking at most the configured timeout.
    /// May return fewer bytes than requested.
    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>>;

    /// Block the calling thread
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Drop any unread input
    fn clear_input(&mut self) -> io::Result<()>;

    /// Current read timeout
    fn timeout(&self) -> Duration;

    /// Set the read timeout
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Reconfigure the local line speed
    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()>;
}

/// Serial port wrapper implementing [`Transport`]
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Wrap an opened and configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Name of the underlying port, if known
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

fn to_io(e: serialport::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; max_bytes];
        let mut filled = 0;
        let deadline = Instant::now() + self.port.timeout();

        while filled < max_bytes {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(to_io)
    }

    fn timeout(&self) -> Duration {
        self.port.timeout()
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(to_io)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        self.port.clear(serialport::ClearBuffer::All).map_err(to_io)?;
        self.port.set_baud_rate(baud_rate).map_err(to_io)
    }
}
