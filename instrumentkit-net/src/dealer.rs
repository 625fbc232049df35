//! The request dealer: a synchronous request/reply socket.
//!
//! The wire protocol never pushes unsolicited data to a requester — only the
//! broadcast socket does that, and [`crate::subscriber`] handles it
//! separately — so a plain `TcpStream` with a read deadline is enough; there
//! is no need for the background-reader-thread machinery a push-capable
//! protocol would require.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use instrumentkit_types::{Instruction, Response};

use crate::error::ClientError;
use crate::framing;

const MAX_CONSECUTIVE_FAILURES: u32 = 3;

pub struct Dealer {
    addr: SocketAddr,
    timeout: Duration,
    stream: Option<TcpStream>,
    consecutive_failures: u32,
}

impl Dealer {
    pub fn connect(addr: impl ToSocketAddrs, timeout: Duration) -> io::Result<Self> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no address resolved"))?;
        let mut dealer = Dealer { addr, timeout, stream: None, consecutive_failures: 0 };
        dealer.ensure_connected()?;
        Ok(dealer)
    }

    fn ensure_connected(&mut self) -> io::Result<&mut TcpStream> {
        if self.stream.is_none() {
            let stream = TcpStream::connect(self.addr)?;
            stream.set_read_timeout(Some(self.timeout))?;
            stream.set_write_timeout(Some(self.timeout))?;
            self.stream = Some(stream);
        }
        Ok(self.stream.as_mut().expect("just set"))
    }

    /// Send `instruction` and block for its reply. On any socket failure the
    /// connection is dropped and reopened for the next call; after
    /// [`MAX_CONSECUTIVE_FAILURES`] failures in a row this returns
    /// [`ClientError::Disconnected`] instead of retrying again.
    pub fn request(&mut self, instruction: &Instruction) -> Result<Response, ClientError> {
        if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            return Err(ClientError::Disconnected);
        }
        match self.try_request(instruction) {
            Ok(response) => {
                self.consecutive_failures = 0;
                Ok(response)
            }
            Err(e) => {
                self.stream = None;
                self.consecutive_failures += 1;
                Err(e)
            }
        }
    }

    fn try_request(&mut self, instruction: &Instruction) -> Result<Response, ClientError> {
        let stream = self.ensure_connected()?;
        framing::write_message(stream, instruction)?;
        let response: Response = framing::read_message(stream)?;
        Ok(response)
    }
}
