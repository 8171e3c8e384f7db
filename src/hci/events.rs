//! HCI events
//!
//! A tag only ever waits on the response to the command it just sent, so the only events parsed
//! here are the *Command Complete* and *Command Status* events. Any other event is returned as
//! [`EventPacket::Other`] so that it can be skipped over.

use core::fmt;

/// The size of the header of a HCI event packet (event code + parameter length)
pub const EVENT_HEADER_SIZE: usize = 2;

/// Event codes of the events that are parsed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Events {
    CommandComplete,
    CommandStatus,
}

impl Events {
    pub const fn get_event_code(&self) -> u8 {
        match self {
            Events::CommandComplete => 0x0E,
            Events::CommandStatus => 0x0F,
        }
    }
}

/// Generic error for trying to convert raw data into an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventError {
    /// The packet is smaller than the event header
    MissingHeader,
    /// The parameter length within the header does not match the packet
    IncorrectLength { expected: usize, found: usize },
    /// The event parameter is too small for the event
    InvalidEventParameter(Events),
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventError::MissingHeader => write!(f, "event packet is smaller than the event header"),
            EventError::IncorrectLength { expected, found } => write!(
                f,
                "event parameter length is {} but {} bytes were received",
                expected, found
            ),
            EventError::InvalidEventParameter(event) => write!(f, "invalid event parameter for {:?}", event),
        }
    }
}

impl std::error::Error for EventError {}

/// Data of a Command Complete event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandCompleteData<'a> {
    pub number_of_hci_command_packets: u8,
    /// This is `None` when the event was sent only to update the number of command packets
    pub command_opcode: Option<u16>,
    pub return_parameter: &'a [u8],
}

impl<'a> CommandCompleteData<'a> {
    fn try_from_parameter(parameter: &'a [u8]) -> Result<Self, EventError> {
        if parameter.len() < 3 {
            return Err(EventError::InvalidEventParameter(Events::CommandComplete));
        }

        let opcode = u16::from_le_bytes([parameter[1], parameter[2]]);

        Ok(CommandCompleteData {
            number_of_hci_command_packets: parameter[0],
            command_opcode: if opcode != 0 { Some(opcode) } else { None },
            return_parameter: &parameter[3..],
        })
    }

    /// Get the status of the command
    ///
    /// The status is the first byte of the return parameter for every command used by this
    /// library.
    pub fn status(&self) -> Option<u8> {
        self.return_parameter.first().copied()
    }
}

/// Data of a Command Status event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandStatusData {
    pub status: u8,
    pub number_of_hci_command_packets: u8,
    pub command_opcode: Option<u16>,
}

impl CommandStatusData {
    fn try_from_parameter(parameter: &[u8]) -> Result<Self, EventError> {
        if parameter.len() < 4 {
            return Err(EventError::InvalidEventParameter(Events::CommandStatus));
        }

        let opcode = u16::from_le_bytes([parameter[2], parameter[3]]);

        Ok(CommandStatusData {
            status: parameter[0],
            number_of_hci_command_packets: parameter[1],
            command_opcode: if opcode != 0 { Some(opcode) } else { None },
        })
    }
}

/// A received HCI event packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventPacket<'a> {
    CommandComplete(CommandCompleteData<'a>),
    CommandStatus(CommandStatusData),
    Other { event_code: u8 },
}

impl<'a> EventPacket<'a> {
    /// Try to create an `EventPacket` from the raw bytes of an event
    ///
    /// `packet` must start with the event header (it must not contain the packet indicator used
    /// by UART like interfaces).
    pub fn try_from_packet(packet: &'a [u8]) -> Result<Self, EventError> {
        if packet.len() < EVENT_HEADER_SIZE {
            return Err(EventError::MissingHeader);
        }

        let event_code = packet[0];

        let expected = packet[1] as usize;

        let parameter = &packet[EVENT_HEADER_SIZE..];

        if parameter.len() < expected {
            return Err(EventError::IncorrectLength {
                expected,
                found: parameter.len(),
            });
        }

        let parameter = &parameter[..expected];

        match event_code {
            c if c == Events::CommandComplete.get_event_code() => {
                CommandCompleteData::try_from_parameter(parameter).map(EventPacket::CommandComplete)
            }
            c if c == Events::CommandStatus.get_event_code() => {
                CommandStatusData::try_from_parameter(parameter).map(EventPacket::CommandStatus)
            }
            event_code => Ok(EventPacket::Other { event_code }),
        }
    }

    /// Check if this event is the response to the command with `opcode`
    pub fn is_response_to(&self, opcode: u16) -> bool {
        match self {
            EventPacket::CommandComplete(cc) => cc.command_opcode == Some(opcode),
            EventPacket::CommandStatus(cs) => cs.command_opcode == Some(opcode),
            EventPacket::Other { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_complete() {
        let packet = [0x0E, 0x04, 0x01, 0x06, 0x20, 0x00];

        let event = EventPacket::try_from_packet(&packet).unwrap();

        assert!(event.is_response_to(0x2006));
        assert!(!event.is_response_to(0x2008));

        match event {
            EventPacket::CommandComplete(cc) => {
                assert_eq!(cc.number_of_hci_command_packets, 1);
                assert_eq!(cc.status(), Some(0));
            }
            _ => panic!("expected command complete, got {:?}", event),
        }
    }

    #[test]
    fn command_status() {
        let packet = [0x0F, 0x04, 0x0C, 0x01, 0x0A, 0x20];

        match EventPacket::try_from_packet(&packet).unwrap() {
            EventPacket::CommandStatus(cs) => {
                assert_eq!(cs.status, 0x0C);
                assert_eq!(cs.command_opcode, Some(0x200A));
            }
            event => panic!("expected command status, got {:?}", event),
        }
    }

    #[test]
    fn no_opcode() {
        let packet = [0x0E, 0x03, 0x01, 0x00, 0x00];

        let event = EventPacket::try_from_packet(&packet).unwrap();

        assert!(!event.is_response_to(0));
    }

    #[test]
    fn other_event() {
        let packet = [0x3E, 0x01, 0x02];

        assert_eq!(
            EventPacket::try_from_packet(&packet),
            Ok(EventPacket::Other { event_code: 0x3E })
        );
    }

    #[test]
    fn malformed() {
        assert_eq!(EventPacket::try_from_packet(&[0x0E]), Err(EventError::MissingHeader));

        assert_eq!(
            EventPacket::try_from_packet(&[0x0E, 0x04, 0x01]),
            Err(EventError::IncorrectLength { expected: 4, found: 1 })
        );

        assert_eq!(
            EventPacket::try_from_packet(&[0x0F, 0x02, 0x00, 0x01]),
            Err(EventError::InvalidEventParameter(Events::CommandStatus))
        );
    }
}
