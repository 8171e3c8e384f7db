//! Starting and stopping the advertising of a tag
//!
//! An [`Advertiser`] runs the two command sequences of a tag against a controller. Starting sets the
//! advertising parameters, enables advertising, and then sets the advertising data. Stopping only
//! disables advertising. A controller is opened at the start of either sequence and it is closed
//! when the sequence ends, regardless of whether the sequence succeeded.
//!
//! None of the commands are retried. If the controller fails to complete a command the sequence is
//! abandoned and the [`Error`] describes which command failed. Opening the controller is the only
//! step that gets more than one attempt.
//!
//! Failures are logged to the `health_report` target (see [`HEALTH_REPORT`]).

pub mod payload;

use crate::config::TagConfig;
use crate::gap::assigned::DataTooLargeError;
use crate::hci::le::transmitter::{
    set_advertising_data, set_advertising_enable,
    set_advertising_parameters::{self, AdvertisingInterval, AdvertisingParameters},
};
use crate::hci::opcodes::LEController;
use crate::hci::{CommandError, Driver, Status, DEFAULT_REQUEST_TIMEOUT};
use crate::identifier::{encode_hex, Identifier, InvalidIdentifier};
use crate::retry::{retry, DEFAULT_ATTEMPTS};
use core::fmt;
use core::num::NonZeroUsize;
use core::time::Duration;

/// The log target for failures that need to be seen by whoever maintains the tag
pub const HEALTH_REPORT: &str = "health_report";

/// The numeric result codes of a tag
///
/// These are the exit codes of the tag daemon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    WorkSuccessfully = 0,
    OpenFile = 1,
    OpenDevice = 2,
    OpenSocket = 3,
    AdvertiseStatus = 4,
    AdvertiseMode = 5,
    SendRequestTimeout = 6,
    InvalidIdentifier = 7,
    AdvertisingDataTooLarge = 8,
}

impl ErrorCode {
    /// Get the numeric value of the code
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(&self) -> &'static str {
        match *self {
            ErrorCode::WorkSuccessfully => "WORK_SUCCESSFULLY",
            ErrorCode::OpenFile => "E_OPEN_FILE",
            ErrorCode::OpenDevice => "E_OPEN_DEVICE",
            ErrorCode::OpenSocket => "E_OPEN_SOCKET",
            ErrorCode::AdvertiseStatus => "E_ADVERTISE_STATUS",
            ErrorCode::AdvertiseMode => "E_ADVERTISE_MODE",
            ErrorCode::SendRequestTimeout => "E_SEND_REQUEST_TIMEOUT",
            ErrorCode::InvalidIdentifier => "E_INVALID_IDENTIFIER",
            ErrorCode::AdvertisingDataTooLarge => "E_ADVERTISING_DATA_TOO_LARGE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Why a control request did not complete successfully
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestFailure {
    /// The request/response exchange with the controller failed
    Transport(String),
    /// The controller completed the command with an error status
    Status(Status),
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RequestFailure::Transport(reason) => f.write_str(reason),
            RequestFailure::Status(status) => write!(f, "controller returned {}", status),
        }
    }
}

/// Error returned by an [`Advertiser`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The controller could not be opened
    ///
    /// `reason` is `None` when the controller index is not a valid device id.
    OpenDevice { index: i32, reason: Option<String> },
    /// Setting the parameters, enabling advertising, or sending the advertising data failed
    SendRequestTimeout {
        command: LEController,
        reason: RequestFailure,
    },
    /// The controller returned an error status
    AdvertiseStatus { command: LEController, status: Status },
    /// Disabling advertising failed
    AdvertiseMode { reason: String },
    /// The identifier is not 32 hexadecimal digits
    InvalidIdentifier(InvalidIdentifier),
    /// The payload does not fit within the advertising data
    AdvertisingDataTooLarge(DataTooLargeError),
}

impl Error {
    /// Get the result code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::OpenDevice { .. } => ErrorCode::OpenDevice,
            Error::SendRequestTimeout { .. } => ErrorCode::SendRequestTimeout,
            Error::AdvertiseStatus { .. } => ErrorCode::AdvertiseStatus,
            Error::AdvertiseMode { .. } => ErrorCode::AdvertiseMode,
            Error::InvalidIdentifier(_) => ErrorCode::InvalidIdentifier,
            Error::AdvertisingDataTooLarge(_) => ErrorCode::AdvertisingDataTooLarge,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenDevice { index, reason: None } => {
                write!(f, "{}: {} is not a valid controller index", self.code(), index)
            }
            Error::OpenDevice {
                index,
                reason: Some(reason),
            } => write!(f, "{}: failed to open controller {}, {}", self.code(), index, reason),
            Error::SendRequestTimeout { command, reason } => {
                write!(f, "{}: {} failed, {}", self.code(), command, reason)
            }
            Error::AdvertiseStatus { command, status } => {
                write!(f, "{}: {} completed with {}", self.code(), command, status)
            }
            Error::AdvertiseMode { reason } => write!(f, "{}: failed to disable advertising, {}", self.code(), reason),
            Error::InvalidIdentifier(e) => write!(f, "{}: {}", self.code(), e),
            Error::AdvertisingDataTooLarge(e) => write!(f, "{}: {}", self.code(), e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidIdentifier(e) => Some(e),
            Error::AdvertisingDataTooLarge(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InvalidIdentifier> for Error {
    fn from(e: InvalidIdentifier) -> Self {
        Error::InvalidIdentifier(e)
    }
}

impl From<DataTooLargeError> for Error {
    fn from(e: DataTooLargeError) -> Self {
        Error::AdvertisingDataTooLarge(e)
    }
}

fn completed<E: fmt::Display>(result: Result<Status, CommandError<E>>) -> Result<(), RequestFailure> {
    match result {
        Ok(status) if status.is_success() => Ok(()),
        Ok(status) => Err(RequestFailure::Status(status)),
        Err(e) => Err(RequestFailure::Transport(e.to_string())),
    }
}

fn report(error: Error) -> Error {
    log::error!(target: HEALTH_REPORT, "{}", error);

    error
}

/// Convert the controller index into a device id
///
/// Negative indexes (the value returned by the system when there is no controller) are rejected.
fn device_id(controller_index: i32) -> Result<u16, Error> {
    u16::try_from(controller_index).map_err(|_| Error::OpenDevice {
        index: controller_index,
        reason: None,
    })
}

/// The advertising controller of a tag
pub struct Advertiser<D> {
    driver: D,
    open_attempts: NonZeroUsize,
    request_timeout: Duration,
}

impl<D: Driver> Advertiser<D> {
    /// Create a new `Advertiser`
    ///
    /// Opening a controller gets five attempts and every command is given one second to complete.
    pub fn new(driver: D) -> Self {
        Advertiser {
            driver,
            open_attempts: DEFAULT_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the number of attempts made to open the controller
    pub fn with_open_attempts(mut self, attempts: NonZeroUsize) -> Self {
        self.open_attempts = attempts;
        self
    }

    /// Set the time the controller is given to complete a command
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn open(&mut self, controller_index: i32, device_id: u16) -> Result<D::Handle, Error> {
        let driver = &mut self.driver;

        retry(self.open_attempts, |_| driver.open(device_id)).map_err(|e| Error::OpenDevice {
            index: controller_index,
            reason: Some(e.to_string()),
        })
    }

    /// Start advertising the identifier
    ///
    /// Inputs `interval_units` is the advertising interval in units of 0.625 ms and
    /// `identifier_text` is the 32 hexadecimal digits of the tag identifier. `rssi` is the
    /// calibrated RSSI of the tag, it is logged but it is not part of the advertising payload.
    ///
    /// # Error
    /// * `controller_index` is negative or the controller could not be opened
    ///   ([`ErrorCode::OpenDevice`])
    /// * `identifier_text` is malformed ([`ErrorCode::InvalidIdentifier`]), this is checked before
    ///   the controller is opened
    /// * setting the parameters or enabling advertising did not succeed, or the controller did not
    ///   respond to the advertising data ([`ErrorCode::SendRequestTimeout`])
    /// * the controller rejected the advertising data ([`ErrorCode::AdvertiseStatus`])
    pub fn start_advertising(
        &mut self,
        controller_index: i32,
        interval_units: u16,
        identifier_text: &str,
        rssi: i8,
    ) -> Result<(), Error> {
        let device_id = device_id(controller_index).map_err(report)?;

        let identifier = Identifier::new(identifier_text).map_err(|e| report(e.into()))?;

        self.advertise(controller_index, device_id, interval_units, &identifier, rssi)
            .map_err(report)
    }

    /// Stop advertising
    ///
    /// # Error
    /// * `controller_index` is negative or the controller could not be opened
    ///   ([`ErrorCode::OpenDevice`])
    /// * the controller did not respond to the command ([`ErrorCode::AdvertiseMode`])
    /// * the controller rejected the command ([`ErrorCode::AdvertiseStatus`])
    pub fn stop_advertising(&mut self, controller_index: i32) -> Result<(), Error> {
        let device_id = device_id(controller_index).map_err(report)?;

        self.disable(controller_index, device_id).map_err(report)
    }

    /// Start advertising with the configuration of a tag
    pub fn start(&mut self, config: &TagConfig, identifier: &Identifier) -> Result<(), Error> {
        let controller_index = config.advertise_dongle_id;

        let device_id = device_id(controller_index).map_err(report)?;

        self.advertise(
            controller_index,
            device_id,
            config.advertise_interval_in_units_0625_ms,
            identifier,
            config.advertise_rssi_value,
        )
        .map_err(report)
    }

    /// Stop advertising with the configuration of a tag
    pub fn stop(&mut self, config: &TagConfig) -> Result<(), Error> {
        self.stop_advertising(config.advertise_dongle_id)
    }

    fn advertise(
        &mut self,
        controller_index: i32,
        device_id: u16,
        interval_units: u16,
        identifier: &Identifier,
        rssi: i8,
    ) -> Result<(), Error> {
        let coordinates = identifier.coordinates();

        let advertising_data = payload::build(&coordinates, payload::BUTTON_RELEASED)?;

        log::info!(
            "advertising tag {} (x: {}, y: {}, rssi: {})",
            identifier,
            encode_hex(&coordinates.x),
            encode_hex(&coordinates.y),
            rssi
        );

        let interval = AdvertisingInterval::from_raw(interval_units);

        if !interval.is_within_spec() {
            log::warn!(
                "advertising interval of {:#06x} ({:?}) is outside of the range a controller must support",
                interval.get_raw_val(),
                interval.get_duration()
            );
        }

        let timeout = self.request_timeout;

        let mut handle = self.open(controller_index, device_id)?;

        log::debug!("opened controller {}", controller_index);

        let parameters = AdvertisingParameters::non_connectable(interval);

        completed(set_advertising_parameters::send(&mut handle, &parameters, timeout)).map_err(|reason| {
            Error::SendRequestTimeout {
                command: LEController::SetAdvertisingParameters,
                reason,
            }
        })?;

        log::debug!("advertising parameters set");

        completed(set_advertising_enable::send(&mut handle, true, timeout)).map_err(|reason| {
            Error::SendRequestTimeout {
                command: LEController::SetAdvertisingEnable,
                reason,
            }
        })?;

        log::debug!("advertising enabled");

        log::trace!(
            "advertising data: {:x?}",
            advertising_data
                .iter()
                .map(|ad_struct| ad_struct.into_inner())
                .collect::<Vec<_>>()
        );

        completed(set_advertising_data::send(&mut handle, &advertising_data, timeout)).map_err(
            |reason| match reason {
                RequestFailure::Status(status) => Error::AdvertiseStatus {
                    command: LEController::SetAdvertisingData,
                    status,
                },
                transport => Error::SendRequestTimeout {
                    command: LEController::SetAdvertisingData,
                    reason: transport,
                },
            },
        )?;

        log::debug!("advertising data set, closing controller {}", controller_index);

        Ok(())
    }

    fn disable(&mut self, controller_index: i32, device_id: u16) -> Result<(), Error> {
        let timeout = self.request_timeout;

        let mut handle = self.open(controller_index, device_id)?;

        completed(set_advertising_enable::send(&mut handle, false, timeout)).map_err(|reason| match reason {
            RequestFailure::Status(status) => Error::AdvertiseStatus {
                command: LEController::SetAdvertisingEnable,
                status,
            },
            RequestFailure::Transport(reason) => Error::AdvertiseMode { reason },
        })?;

        log::debug!("advertising disabled, closing controller {}", controller_index);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hci::opcodes::OpCodePair;
    use crate::hci::ControllerHandle;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        opens: usize,
        closes: usize,
        requests: Vec<(OpCodePair, Vec<u8>)>,
    }

    /// Every request is answered with the next status in `statuses`, `None` is a transport failure
    struct MockDriver {
        log: Rc<RefCell<Log>>,
        statuses: Vec<Option<u8>>,
    }

    struct MockHandle {
        log: Rc<RefCell<Log>>,
        statuses: std::vec::IntoIter<Option<u8>>,
    }

    impl Driver for MockDriver {
        type Handle = MockHandle;
        type Error = &'static str;

        fn open(&mut self, _: u16) -> Result<MockHandle, &'static str> {
            self.log.borrow_mut().opens += 1;

            Ok(MockHandle {
                log: self.log.clone(),
                statuses: self.statuses.clone().into_iter(),
            })
        }
    }

    impl ControllerHandle for MockHandle {
        type Error = &'static str;

        fn send_control_request(
            &mut self,
            opcode: OpCodePair,
            parameter: &[u8],
            _: Duration,
        ) -> Result<u8, &'static str> {
            self.log.borrow_mut().requests.push((opcode, parameter.to_vec()));

            self.statuses.next().flatten().ok_or("timed out")
        }
    }

    impl Drop for MockHandle {
        fn drop(&mut self) {
            self.log.borrow_mut().closes += 1;
        }
    }

    fn mock(statuses: &[Option<u8>]) -> (Advertiser<MockDriver>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));

        let driver = MockDriver {
            log: log.clone(),
            statuses: statuses.to_vec(),
        };

        (Advertiser::new(driver), log)
    }

    const IDENTIFIER: &str = "00000000000000000000000000000000";

    #[test]
    fn start_sequence() {
        let (mut advertiser, log) = mock(&[Some(0), Some(0), Some(0)]);

        assert_eq!(advertiser.start_advertising(0, 0x00A0, IDENTIFIER, -50), Ok(()));

        let log = log.borrow();

        let opcodes: Vec<u16> = log.requests.iter().map(|(opcode, _)| opcode.into_opcode()).collect();

        assert_eq!(opcodes, vec![0x2006, 0x200A, 0x2008]);
        assert_eq!(log.requests[1].1, vec![1]);
        assert_eq!((log.opens, log.closes), (1, 1));
    }

    #[test]
    fn negative_index() {
        let (mut advertiser, log) = mock(&[]);

        let err = advertiser.start_advertising(-1, 0x00A0, IDENTIFIER, 0).unwrap_err();

        assert_eq!(err.code(), ErrorCode::OpenDevice);
        assert_eq!(advertiser.stop_advertising(-1).unwrap_err().code(), ErrorCode::OpenDevice);
        assert_eq!(log.borrow().opens, 0);
    }

    #[test]
    fn invalid_identifier_before_open() {
        let (mut advertiser, log) = mock(&[]);

        let err = advertiser.start_advertising(0, 0x00A0, "0000Z", 0).unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidIdentifier);
        assert_eq!(log.borrow().opens, 0);
    }

    #[test]
    fn enable_rejected() {
        let (mut advertiser, log) = mock(&[Some(0), Some(0x0C)]);

        let err = advertiser.start_advertising(0, 0x00A0, IDENTIFIER, 0).unwrap_err();

        assert_eq!(
            err,
            Error::SendRequestTimeout {
                command: LEController::SetAdvertisingEnable,
                reason: RequestFailure::Status(Status(0x0C)),
            }
        );
        assert_eq!(log.borrow().requests.len(), 2);
        assert_eq!(log.borrow().closes, 1);
    }

    #[test]
    fn data_status_and_timeout() {
        let (mut advertiser, _) = mock(&[Some(0), Some(0), Some(0x12)]);

        assert_eq!(
            advertiser.start_advertising(0, 0x00A0, IDENTIFIER, 0).unwrap_err().code(),
            ErrorCode::AdvertiseStatus
        );

        let (mut advertiser, _) = mock(&[Some(0), Some(0), None]);

        assert_eq!(
            advertiser.start_advertising(0, 0x00A0, IDENTIFIER, 0).unwrap_err().code(),
            ErrorCode::SendRequestTimeout
        );
    }

    #[test]
    fn stop_sequence() {
        let (mut advertiser, log) = mock(&[Some(0)]);

        assert_eq!(advertiser.stop_advertising(3), Ok(()));

        let log = log.borrow();

        assert_eq!(log.requests.len(), 1);
        assert_eq!(log.requests[0].0.into_opcode(), 0x200A);
        assert_eq!(log.requests[0].1, vec![0]);
        assert_eq!(log.closes, 1);
    }

    #[test]
    fn stop_failures() {
        let (mut advertiser, _) = mock(&[None]);

        assert_eq!(advertiser.stop_advertising(0).unwrap_err().code(), ErrorCode::AdvertiseMode);

        let (mut advertiser, _) = mock(&[Some(1)]);

        assert_eq!(advertiser.stop_advertising(0).unwrap_err().code(), ErrorCode::AdvertiseStatus);
    }

    #[test]
    fn error_codes() {
        assert_eq!(ErrorCode::WorkSuccessfully.code(), 0);
        assert_eq!(ErrorCode::OpenFile.code(), 1);
        assert_eq!(ErrorCode::SendRequestTimeout.code(), 6);
        assert_eq!(ErrorCode::AdvertisingDataTooLarge.to_string(), "E_ADVERTISING_DATA_TOO_LARGE (8)");
    }
}
