//! Linux Bluetooth device functionality
//!
//! These are the bindings and socket operations used to talk to a controller through the raw HCI
//! channel of the Linux Bluetooth subsystem. This isn't a complete implementation of the socket
//! interface, it is just the functionality used by this library. These are linux specific and have
//! no relation to the bluetooth specification.

#![allow(non_camel_case_types)]

use nix::errno::Errno;
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags};
use nix::unistd;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

pub const BTPROTO_HCI: i32 = 1;

pub const SOL_HCI: i32 = 0;
pub const HCI_FILTER: i32 = 2;

// A raw channel shares the controller with the kernel, the controller stays up and managed by it
pub const HCI_CHANNEL_RAW: u16 = 0;

/// The maximum size of an HCI event packet (header plus parameter)
pub const HCI_MAX_EVENT_SIZE: usize = 260;

/// HCI packet indicators
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_EVENT_PKT: u8 = 0x04;

// Mask applied to the packet type and event code when setting a bit within a filter
const HCI_FLT_TYPE_BITS: u32 = 31;
const HCI_FLT_EVENT_BITS: u32 = 63;

#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct hci_filter {
    pub type_mask: u32,
    pub event_mask: [u32; 2usize],
    pub opcode: u16,
}

impl hci_filter {
    /// Let packets with the indicator `packet_type` through the filter
    pub fn set_ptype(&mut self, packet_type: u8) {
        self.type_mask |= 1 << (packet_type as u32 & HCI_FLT_TYPE_BITS);
    }

    /// Let events with the code `event_code` through the filter
    pub fn set_event(&mut self, event_code: u8) {
        let bit = event_code as u32 & HCI_FLT_EVENT_BITS;

        self.event_mask[(bit >> 5) as usize] |= 1 << (bit & 31);
    }

    /// Let only the Command Complete and Command Status events of `opcode` through the filter
    pub fn set_opcode(&mut self, opcode: u16) {
        self.opcode = opcode.to_le();
    }
}

#[repr(C)]
#[derive(Default)]
pub struct sockaddr_hci {
    pub hci_family: libc::sa_family_t,
    pub hci_dev: u16,
    pub hci_channel: u16,
}

/// Open a raw HCI socket bound to the controller `dev_id`
pub fn open_raw_socket(dev_id: u16) -> nix::Result<OwnedFd> {
    let raw_fd = Errno::result(unsafe {
        libc::socket(libc::AF_BLUETOOTH, libc::SOCK_RAW | libc::SOCK_CLOEXEC, BTPROTO_HCI)
    })?;

    // closes the socket if bind fails
    let socket = unsafe { OwnedFd::from_raw_fd(raw_fd) };

    let address = sockaddr_hci {
        hci_family: libc::AF_BLUETOOTH as libc::sa_family_t,
        hci_dev: dev_id,
        hci_channel: HCI_CHANNEL_RAW,
    };

    let sa_p = &address as *const sockaddr_hci as *const libc::sockaddr;

    let sa_len = std::mem::size_of::<sockaddr_hci>() as libc::socklen_t;

    Errno::result(unsafe { libc::bind(socket.as_raw_fd(), sa_p, sa_len) })?;

    Ok(socket)
}

/// Get the filter of a HCI socket
pub fn get_filter(fd: RawFd) -> nix::Result<hci_filter> {
    let mut filter = hci_filter::default();

    let mut len = std::mem::size_of::<hci_filter>() as libc::socklen_t;

    Errno::result(unsafe {
        libc::getsockopt(
            fd,
            SOL_HCI,
            HCI_FILTER,
            &mut filter as *mut hci_filter as *mut libc::c_void,
            &mut len,
        )
    })?;

    Ok(filter)
}

/// Set the filter of a HCI socket
pub fn set_filter(fd: RawFd, filter: &hci_filter) -> nix::Result<()> {
    Errno::result(unsafe {
        libc::setsockopt(
            fd,
            SOL_HCI,
            HCI_FILTER,
            filter as *const hci_filter as *const libc::c_void,
            std::mem::size_of::<hci_filter>() as libc::socklen_t,
        )
    })
    .map(drop)
}

/// Write a packet to the socket
pub fn write_packet(fd: RawFd, packet: &[u8]) -> nix::Result<usize> {
    unistd::write(fd, packet)
}

/// Read one packet from the socket into `buffer`
pub fn read_packet(fd: RawFd, buffer: &mut [u8]) -> nix::Result<usize> {
    unistd::read(fd, buffer)
}

/// Wait until the socket is readable
///
/// The return is false if `timeout_ms` elapsed before there was anything to read.
pub fn poll_readable(fd: BorrowedFd<'_>, timeout_ms: i32) -> nix::Result<bool> {
    let mut poll_fds = [PollFd::new(&fd, PollFlags::POLLIN)];

    let count = poll(&mut poll_fds, timeout_ms)?;

    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_filter() {
        let mut filter = hci_filter::default();

        filter.set_ptype(HCI_EVENT_PKT);
        filter.set_event(0x0E);
        filter.set_event(0x0F);
        filter.set_opcode(0x2006);

        assert_eq!(filter.type_mask, 1 << 4);
        assert_eq!(filter.event_mask, [(1 << 0x0E) | (1 << 0x0F), 0]);
        assert_eq!(u16::from_le(filter.opcode), 0x2006);
    }

    #[test]
    fn high_event_code() {
        let mut filter = hci_filter::default();

        // LE meta event
        filter.set_event(0x3E);

        assert_eq!(filter.event_mask, [0, 1 << (0x3E - 32)]);
    }

    #[test]
    fn binding_sizes() {
        assert_eq!(std::mem::size_of::<sockaddr_hci>(), 6);
        assert_eq!(std::mem::size_of::<hci_filter>(), 16);
    }
}
