//! An implementation of the controller driver for Linux
//!
//! Linux has a driver for the interface to the controller to provide a standard means of
//! communication. This driver opens a raw HCI socket to that driver for every controller handle
//! and uses it to exchange a command for its *Command Complete* event.
//!
//! ```no_run
//! use lbeacon_tag::Advertiser;
//! use lbeacon_tag_linux::LinuxDriver;
//!
//! let mut advertiser = Advertiser::new(LinuxDriver::new());
//!
//! advertiser.stop_advertising(0).expect("failed to stop advertising");
//! ```

use lbeacon_tag::hci::events::{EventPacket, Events};
use lbeacon_tag::hci::opcodes::OpCodePair;
use lbeacon_tag::hci::{ControllerHandle, Driver, MAX_COMMAND_PARAMETER_SIZE};
use nix::errno::Errno;
use std::error;
use std::fmt;
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::time::{Duration, Instant};

mod device;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    IOError(nix::Error),
    /// The controller did not complete the command in time
    Timeout,
    /// The controller responded with a Command Status event containing an error
    CommandStatus(u8),
    /// The Command Complete event did not contain a status
    InvalidEvent,
    /// The parameter is too large for a command packet
    ParameterTooLarge(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(from base-crate: lbeacon-tag-linux) ")?;

        match *self {
            Error::IOError(ref errno) => write!(f, "IO error: {}", errno),

            Error::Timeout => write!(f, "Timeout Occurred"),

            Error::CommandStatus(status) => write!(f, "command failed with status {:#04x}", status),

            Error::InvalidEvent => write!(f, "Command Complete event is missing the status"),

            Error::ParameterTooLarge(len) => write!(f, "command parameter of {} bytes is too large", len),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::IOError(ref errno) => Some(errno),
            _ => None,
        }
    }
}

impl From<nix::Error> for Error {
    fn from(e: nix::Error) -> Self {
        Error::IOError(e)
    }
}

/// Ignores the Unix errors EAGAIN and EINTR
fn ignore_eagain_and_eintr<F, R>(mut func: F) -> nix::Result<R>
where
    F: FnMut() -> nix::Result<R>,
{
    loop {
        match func() {
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => continue,
            result => break result,
        }
    }
}

/// Milliseconds left until `deadline`
///
/// The return is `None` once the deadline has passed.
fn remaining_ms(deadline: Instant) -> Option<i32> {
    let remaining = deadline.saturating_duration_since(Instant::now());

    if remaining.is_zero() {
        None
    } else {
        Some(remaining.as_millis().clamp(1, i32::MAX as u128) as i32)
    }
}

/// The driver for the Bluetooth controllers of a Linux system
///
/// Controllers are identified by their device id, the number `N` of the interface `hciN`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinuxDriver {
    _priv: (),
}

impl LinuxDriver {
    pub fn new() -> Self {
        LinuxDriver::default()
    }
}

impl Driver for LinuxDriver {
    type Handle = HciSocket;
    type Error = Error;

    fn open(&mut self, index: u16) -> Result<HciSocket, Error> {
        let socket = device::open_raw_socket(index)?;

        log::trace!("opened raw HCI socket for hci{}", index);

        Ok(HciSocket { dev_id: index, socket })
    }
}

/// A raw HCI socket bound to a controller
///
/// The socket is closed when this is dropped.
#[derive(Debug)]
pub struct HciSocket {
    dev_id: u16,
    socket: OwnedFd,
}

/// Restores the filter of the socket when dropped
struct FilterGuard {
    fd: RawFd,
    old: device::hci_filter,
}

impl Drop for FilterGuard {
    fn drop(&mut self) {
        if let Err(e) = device::set_filter(self.fd, &self.old) {
            log::warn!("failed to restore the HCI socket filter: {}", e);
        }
    }
}

impl HciSocket {
    pub fn dev_id(&self) -> u16 {
        self.dev_id
    }

    fn set_request_filter(&self, opcode: u16) -> Result<FilterGuard, Error> {
        let fd = self.socket.as_raw_fd();

        let old = device::get_filter(fd)?;

        let mut filter = device::hci_filter::default();

        filter.set_ptype(device::HCI_EVENT_PKT);
        filter.set_event(Events::CommandStatus.get_event_code());
        filter.set_event(Events::CommandComplete.get_event_code());
        filter.set_opcode(opcode);

        device::set_filter(fd, &filter)?;

        Ok(FilterGuard { fd, old })
    }

    fn send_command(&self, opcode: u16, parameter: &[u8]) -> Result<(), Error> {
        if parameter.len() > MAX_COMMAND_PARAMETER_SIZE {
            return Err(Error::ParameterTooLarge(parameter.len()));
        }

        let mut packet = Vec::with_capacity(4 + parameter.len());

        packet.push(device::HCI_COMMAND_PKT);
        packet.extend_from_slice(&opcode.to_le_bytes());
        packet.push(parameter.len() as u8);
        packet.extend_from_slice(parameter);

        ignore_eagain_and_eintr(|| device::write_packet(self.socket.as_raw_fd(), &packet))?;

        Ok(())
    }

    /// Wait for the response to the command with `opcode`
    fn wait_for_response(&self, opcode: u16, timeout: Duration) -> Result<u8, Error> {
        let fd = self.socket.as_raw_fd();

        let deadline = Instant::now() + timeout;

        let mut buffer = [0u8; device::HCI_MAX_EVENT_SIZE + 1];

        loop {
            // an interrupted poll only waits for what is left until the deadline
            let readable = ignore_eagain_and_eintr(|| match remaining_ms(deadline) {
                Some(timeout_ms) => device::poll_readable(self.socket.as_fd(), timeout_ms),
                None => Ok(false),
            })?;

            if !readable {
                return Err(Error::Timeout);
            }

            let len = ignore_eagain_and_eintr(|| device::read_packet(fd, &mut buffer))?;

            // the first byte is the packet indicator
            let event = match buffer[..len].split_first() {
                Some((&device::HCI_EVENT_PKT, event)) => event,
                _ => continue,
            };

            match EventPacket::try_from_packet(event) {
                Ok(event) if !event.is_response_to(opcode) => continue,
                Ok(EventPacket::CommandComplete(cc)) => break cc.status().ok_or(Error::InvalidEvent),
                Ok(EventPacket::CommandStatus(cs)) if cs.status != 0 => break Err(Error::CommandStatus(cs.status)),
                Ok(_) => continue,
                Err(e) => log::debug!("ignoring malformed event from hci{}: {}", self.dev_id, e),
            }
        }
    }
}

impl ControllerHandle for HciSocket {
    type Error = Error;

    fn send_control_request(&mut self, opcode: OpCodePair, parameter: &[u8], timeout: Duration) -> Result<u8, Error> {
        let opcode = opcode.into_opcode();

        let _guard = self.set_request_filter(opcode)?;

        self.send_command(opcode, parameter)?;

        let status = self.wait_for_response(opcode, timeout)?;

        log::trace!("hci{} completed command {:#06x} with status {:#04x}", self.dev_id, opcode, status);

        Ok(status)
    }
}

impl Drop for HciSocket {
    fn drop(&mut self) {
        log::trace!("closing raw HCI socket for hci{}", self.dev_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            Error::Timeout.to_string(),
            "(from base-crate: lbeacon-tag-linux) Timeout Occurred"
        );
        assert_eq!(
            Error::from(Errno::ENODEV),
            Error::IOError(Errno::ENODEV)
        );
    }

    #[test]
    fn retry_interrupted() {
        let mut calls = 0;

        let result = ignore_eagain_and_eintr(|| {
            calls += 1;

            match calls {
                1 => Err(Errno::EINTR),
                2 => Err(Errno::EAGAIN),
                _ => Ok(calls),
            }
        });

        assert_eq!(result, Ok(3));

        assert_eq!(ignore_eagain_and_eintr::<_, ()>(|| Err(Errno::EIO)), Err(Errno::EIO));
    }

    #[test]
    fn remaining_time_shrinks() {
        let deadline = Instant::now() + Duration::from_millis(1000);

        let first = remaining_ms(deadline).unwrap();

        assert!(first <= 1000 && first > 0);

        std::thread::sleep(Duration::from_millis(20));

        assert!(remaining_ms(deadline).unwrap() < first);

        assert_eq!(remaining_ms(Instant::now()), None);
    }

    #[test]
    fn interrupted_wait_keeps_deadline() {
        let deadline = Instant::now() + Duration::from_millis(100);

        let mut timeouts = Vec::new();

        // every wait is interrupted until the deadline runs out
        let readable = ignore_eagain_and_eintr(|| match remaining_ms(deadline) {
            Some(timeout_ms) => {
                timeouts.push(timeout_ms);
                std::thread::sleep(Duration::from_millis(10));
                Err(Errno::EINTR)
            }
            None => Ok(false),
        });

        assert_eq!(readable, Ok(false));
        assert!(timeouts.windows(2).all(|w| w[1] < w[0]));
        assert!(Instant::now() < deadline + Duration::from_millis(50));
    }

    #[test]
    fn poll_times_out() {
        let (quiet, _peer) = std::os::unix::net::UnixStream::pair().unwrap();

        assert_eq!(device::poll_readable(quiet.as_fd(), 10), Ok(false));
    }
}
