//! Tests for the start and stop sequences of a tag against a simulated controller

use lbeacon_tag::advertiser::{Advertiser, Error, RequestFailure};
use lbeacon_tag::gap::assigned::EirOrAdIterator;
use lbeacon_tag::hci::opcodes::{HciCommand, LEController, OpCodePair};
use lbeacon_tag::hci::{ControllerHandle, Driver, Status};
use lbeacon_tag::{ErrorCode, Identifier, TagConfig};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::time::Duration;

const IDENTIFIER: &str = "00010002000300112233445566778899";

/// How the simulated controller answers a request
#[derive(Clone, Copy, Debug)]
enum Response {
    Complete(u8),
    NoResponse,
}

/// The state of a controller shared between the driver, the handles, and the test
#[derive(Default)]
struct Controller {
    open_attempts: Cell<usize>,
    failed_opens: Cell<usize>,
    opened: Cell<usize>,
    closed: Cell<usize>,
    responses: RefCell<VecDeque<Response>>,
    requests: RefCell<Vec<(u16, Vec<u8>)>>,
    timeouts: RefCell<Vec<Duration>>,
}

impl Controller {
    fn new(responses: &[Response]) -> Rc<Self> {
        let controller = Controller::default();

        controller.responses.borrow_mut().extend(responses.iter().copied());

        Rc::new(controller)
    }

    fn failing_opens(self: Rc<Self>, count: usize) -> Rc<Self> {
        self.failed_opens.set(count);
        self
    }

    fn opcodes(&self) -> Vec<u16> {
        self.requests.borrow().iter().map(|(opcode, _)| *opcode).collect()
    }

    fn parameter_of(&self, command: LEController) -> Option<Vec<u8>> {
        let opcode = HciCommand::LEController(command).into_opcode();

        self.requests
            .borrow()
            .iter()
            .find(|(o, _)| *o == opcode)
            .map(|(_, parameter)| parameter.clone())
    }
}

struct SimulatedDriver(Rc<Controller>);

struct SimulatedHandle(Rc<Controller>);

impl Driver for SimulatedDriver {
    type Handle = SimulatedHandle;
    type Error = String;

    fn open(&mut self, index: u16) -> Result<SimulatedHandle, String> {
        let controller = &self.0;

        controller.open_attempts.set(controller.open_attempts.get() + 1);

        if controller.failed_opens.get() > 0 {
            controller.failed_opens.set(controller.failed_opens.get() - 1);

            return Err(format!("hci{} is down", index));
        }

        controller.opened.set(controller.opened.get() + 1);

        Ok(SimulatedHandle(controller.clone()))
    }
}

impl ControllerHandle for SimulatedHandle {
    type Error = String;

    fn send_control_request(&mut self, opcode: OpCodePair, parameter: &[u8], timeout: Duration) -> Result<u8, String> {
        self.0
            .requests
            .borrow_mut()
            .push((opcode.into_opcode(), parameter.to_vec()));

        self.0.timeouts.borrow_mut().push(timeout);

        match self.0.responses.borrow_mut().pop_front() {
            Some(Response::Complete(status)) => Ok(status),
            Some(Response::NoResponse) | None => Err("Connection timed out".to_string()),
        }
    }
}

impl Drop for SimulatedHandle {
    fn drop(&mut self) {
        self.0.closed.set(self.0.closed.get() + 1);
    }
}

fn advertiser(controller: &Rc<Controller>) -> Advertiser<SimulatedDriver> {
    Advertiser::new(SimulatedDriver(controller.clone()))
}

#[test]
fn start_then_stop() {
    let controller = Controller::new(&[Response::Complete(0); 4]);

    let mut tag = advertiser(&controller);

    tag.start_advertising(0, 0x00A0, IDENTIFIER, -50)
        .expect("failed to start advertising");

    tag.stop_advertising(0).expect("failed to stop advertising");

    assert_eq!(controller.opcodes(), vec![0x2006, 0x200A, 0x2008, 0x200A]);
    assert_eq!(controller.opened.get(), 2);
    assert_eq!(controller.closed.get(), 2);

    let requests = controller.requests.borrow();

    assert_eq!(requests[1].1, vec![1]);
    assert_eq!(requests[3].1, vec![0]);

    assert!(controller
        .timeouts
        .borrow()
        .iter()
        .all(|timeout| *timeout == Duration::from_millis(1000)));
}

#[test]
fn advertising_parameters() {
    let controller = Controller::new(&[Response::Complete(0); 3]);

    advertiser(&controller)
        .start_advertising(0, 0x0140, IDENTIFIER, 0)
        .unwrap();

    let parameter = controller.parameter_of(LEController::SetAdvertisingParameters).unwrap();

    assert_eq!(
        parameter,
        vec![0x40, 0x01, 0x40, 0x01, 0x03, 0x00, 0x00, 0, 0, 0, 0, 0, 0, 0x07, 0x00]
    );
}

#[test]
fn advertising_payload() {
    let controller = Controller::new(&[Response::Complete(0); 3]);

    advertiser(&controller)
        .start_advertising(0, 0x00A0, IDENTIFIER, -60)
        .unwrap();

    let parameter = controller.parameter_of(LEController::SetAdvertisingData).unwrap();

    assert_eq!(parameter.len(), 32);

    let length = parameter[0] as usize;

    assert_eq!(length, 16);
    assert!(length <= 31);

    assert_eq!(
        &parameter[1..=length],
        &[0x02, 0x01, 0x04, 0x0C, 0xFF, 0x0F, 0x00, 0x00, 0x11, 0x22, 0x33, 0x66, 0x77, 0x88, 0x99, 0x00]
    );

    // every AD length byte is the number of bytes that follow it in the structure
    let sizes: Vec<usize> = EirOrAdIterator::new(&parameter[1..=length])
        .map(|ad_struct| ad_struct.size())
        .collect();

    assert_eq!(sizes, vec![3, 13]);
    assert!(parameter[1 + length..].iter().all(|b| *b == 0));
}

#[test]
fn negative_controller_index() {
    let controller = Controller::new(&[]);

    let mut tag = advertiser(&controller);

    assert_eq!(
        tag.start_advertising(-1, 0x00A0, IDENTIFIER, 0).unwrap_err().code(),
        ErrorCode::OpenDevice
    );
    assert_eq!(tag.stop_advertising(-1).unwrap_err().code(), ErrorCode::OpenDevice);

    assert_eq!(controller.open_attempts.get(), 0);
    assert!(controller.requests.borrow().is_empty());
}

#[test]
fn invalid_identifier() {
    let controller = Controller::new(&[]);

    for identifier in ["", "0011", "0001000200030011223344556677889G"] {
        let err = advertiser(&controller)
            .start_advertising(0, 0x00A0, identifier, 0)
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidIdentifier);
    }

    assert_eq!(controller.open_attempts.get(), 0);
}

#[test]
fn identifier_with_trailing_nul() {
    let controller = Controller::new(&[Response::Complete(0); 3]);

    let text = format!("{}\0", IDENTIFIER);

    advertiser(&controller).start_advertising(0, 0x00A0, &text, 0).unwrap();

    assert_eq!(controller.opcodes().len(), 3);
}

#[test]
fn open_is_retried() {
    let controller = Controller::new(&[Response::Complete(0); 3]).failing_opens(4);

    advertiser(&controller)
        .start_advertising(0, 0x00A0, IDENTIFIER, 0)
        .unwrap();

    assert_eq!(controller.open_attempts.get(), 5);
    assert_eq!(controller.opened.get(), 1);
}

#[test]
fn open_gives_up() {
    let controller = Controller::new(&[]).failing_opens(usize::MAX);

    let err = advertiser(&controller)
        .start_advertising(2, 0x00A0, IDENTIFIER, 0)
        .unwrap_err();

    assert_eq!(
        err,
        Error::OpenDevice {
            index: 2,
            reason: Some("hci2 is down".to_string()),
        }
    );
    assert_eq!(controller.open_attempts.get(), 5);

    let controller = Controller::new(&[]).failing_opens(usize::MAX);

    advertiser(&controller)
        .with_open_attempts(NonZeroUsize::new(2).unwrap())
        .stop_advertising(0)
        .unwrap_err();

    assert_eq!(controller.open_attempts.get(), 2);
}

#[test]
fn parameters_not_answered() {
    let controller = Controller::new(&[Response::NoResponse]);

    let err = advertiser(&controller)
        .start_advertising(0, 0x00A0, IDENTIFIER, 0)
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::SendRequestTimeout);
    assert_eq!(controller.opcodes(), vec![0x2006]);
    assert_eq!(controller.closed.get(), 1);
}

#[test]
fn parameters_rejected() {
    let controller = Controller::new(&[Response::Complete(0x12)]);

    let err = advertiser(&controller)
        .start_advertising(0, 0x00A0, IDENTIFIER, 0)
        .unwrap_err();

    assert_eq!(
        err,
        Error::SendRequestTimeout {
            command: LEController::SetAdvertisingParameters,
            reason: RequestFailure::Status(Status(0x12)),
        }
    );
    assert_eq!(controller.closed.get(), 1);
}

#[test]
fn data_rejected() {
    let controller = Controller::new(&[Response::Complete(0), Response::Complete(0), Response::Complete(0x07)]);

    let err = advertiser(&controller)
        .start_advertising(0, 0x00A0, IDENTIFIER, 0)
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::AdvertiseStatus);
    assert_eq!(controller.closed.get(), 1);
}

#[test]
fn stop_failures() {
    let controller = Controller::new(&[Response::NoResponse, Response::Complete(0x0C)]);

    let mut tag = advertiser(&controller);

    assert_eq!(tag.stop_advertising(0).unwrap_err().code(), ErrorCode::AdvertiseMode);
    assert_eq!(tag.stop_advertising(0).unwrap_err().code(), ErrorCode::AdvertiseStatus);

    assert_eq!(controller.opened.get(), 2);
    assert_eq!(controller.closed.get(), 2);
}

#[test]
fn start_from_config() {
    let config: TagConfig = "advertise_dongle_id=0\n\
                             advertise_interval_in_units_0625_ms=800\n\
                             advertise_rssi_value=-40\n"
        .parse()
        .unwrap();

    let controller = Controller::new(&[Response::Complete(0); 4]);

    let mut tag = advertiser(&controller);

    tag.start(&config, &Identifier::default()).unwrap();
    tag.stop(&config).unwrap();

    let parameter = controller.parameter_of(LEController::SetAdvertisingParameters).unwrap();

    assert_eq!(&parameter[..4], &[0x20, 0x03, 0x20, 0x03]);
    assert_eq!(controller.closed.get(), 2);
}
