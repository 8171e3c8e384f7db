//! Host Controller Interface
//!
//! The HCI is the boundary between this library and the Bluetooth controller. A tag only sends a
//! few LE controller commands and every one of them is answered by a *Command Complete* event whose
//! return parameter is a single status byte. Because of this the interface to the controller is
//! kept to a synchronous request/response exchange.
//!
//! The platform specific part (how bytes actually reach the controller) is provided by an
//! implementation of [`Driver`]. A `Driver` opens a [`ControllerHandle`] for a controller index and
//! the handle is used to send control requests. Closing the handle is done by dropping it.

pub mod events;
pub mod le;
pub mod opcodes;

use core::fmt;
use core::time::Duration;

/// The default time to wait for the controller to respond to a command
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);

/// The maximum size of the parameter of a HCI command packet
pub const MAX_COMMAND_PARAMETER_SIZE: usize = u8::MAX as usize;

/// A driver for the controllers on the system
pub trait Driver {
    /// The handle to an opened controller
    type Handle: ControllerHandle;

    /// The error returned when a controller cannot be opened
    type Error: fmt::Display;

    /// Open the controller identified by `index`
    fn open(&mut self, index: u16) -> Result<Self::Handle, Self::Error>;
}

/// A handle to an open controller
///
/// The controller is closed when the handle is dropped.
pub trait ControllerHandle {
    /// The error returned when the request/response exchange with the controller fails
    type Error: fmt::Display;

    /// Send a control request to the controller
    ///
    /// This sends the command with opcode `opcode` and the command parameter `parameter` and then
    /// waits at most `timeout` for the controller to complete the command. The return is the status
    /// returned by the controller in the *Command Complete* event.
    fn send_control_request(
        &mut self,
        opcode: opcodes::OpCodePair,
        parameter: &[u8],
        timeout: Duration,
    ) -> Result<u8, Self::Error>;
}

impl<T: ControllerHandle + ?Sized> ControllerHandle for &mut T {
    type Error = T::Error;

    fn send_control_request(
        &mut self,
        opcode: opcodes::OpCodePair,
        parameter: &[u8],
        timeout: Duration,
    ) -> Result<u8, Self::Error> {
        (**self).send_control_request(opcode, parameter, timeout)
    }
}

/// Used to get the information required for sending a command from the host to the controller
///
/// The implementing type is the command parameter. Its serialized form, with integers in little
/// endian and without any length prefixes, is the parameter field of the HCI command packet. This
/// is the format `bincode` produces for structures of integers and fixed sized arrays.
pub trait CommandParameter: serde::Serialize {
    /// The command to send to the Bluetooth Controller.
    ///
    /// This is the OGF & OCF pair.
    const COMMAND: opcodes::HciCommand;

    /// Convert Self into the parameter form
    fn get_parameter(&self) -> Result<Vec<u8>, CommandError<core::convert::Infallible>> {
        let parameter = bincode::serialize(self).map_err(CommandError::Parameter)?;

        if parameter.len() > MAX_COMMAND_PARAMETER_SIZE {
            return Err(CommandError::ParameterTooLarge(parameter.len()));
        }

        Ok(parameter)
    }
}

/// Error returned when sending a command
#[derive(Debug)]
pub enum CommandError<E> {
    /// The command parameter could not be serialized
    Parameter(bincode::Error),
    /// The command parameter does not fit within a command packet
    ParameterTooLarge(usize),
    /// The request/response exchange with the controller failed
    Transport(E),
}

impl CommandError<core::convert::Infallible> {
    fn widen<E>(self) -> CommandError<E> {
        match self {
            CommandError::Parameter(e) => CommandError::Parameter(e),
            CommandError::ParameterTooLarge(len) => CommandError::ParameterTooLarge(len),
            CommandError::Transport(never) => match never {},
        }
    }
}

impl<E: fmt::Display> fmt::Display for CommandError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::Parameter(e) => write!(f, "failed to serialize command parameter: {}", e),
            CommandError::ParameterTooLarge(len) => write!(f, "command parameter of {} bytes is too large", len),
            CommandError::Transport(e) => write!(f, "{}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for CommandError<E> {}

/// Send a command and return the status from the controller
pub fn send_command<H, P>(handle: &mut H, parameter: &P, timeout: Duration) -> Result<u8, CommandError<H::Error>>
where
    H: ControllerHandle + ?Sized,
    P: CommandParameter,
{
    let raw = parameter.get_parameter().map_err(CommandError::widen)?;

    log::trace!("sending command {} with parameter {:x?}", P::COMMAND, raw);

    handle
        .send_control_request(P::COMMAND.into_opcode_pair(), &raw, timeout)
        .map_err(CommandError::Transport)
}

/// A status returned by the controller
///
/// A status of zero means the command succeeded, anything else is an error code. Only the error
/// codes that a controller may return for the advertising commands are named, the rest are
/// displayed as their number.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Status(pub u8);

impl Status {
    /// Check if the status is success
    pub fn is_success(&self) -> bool {
        self.0 == 0
    }

    fn name(&self) -> Option<&'static str> {
        match self.0 {
            0x00 => Some("Success"),
            0x01 => Some("Unknown HCI Command"),
            0x03 => Some("Hardware Failure"),
            0x07 => Some("Memory Capacity Exceeded"),
            0x0C => Some("Command Disallowed"),
            0x11 => Some("Unsupported Feature or Parameter Value"),
            0x12 => Some("Invalid HCI Command Parameters"),
            0x1F => Some("Unspecified Error"),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({:#04x})", name, self.0),
            None => write!(f, "unknown status ({:#04x})", self.0),
        }
    }
}
