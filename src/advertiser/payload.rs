//! The advertising payload of a tag
//!
//! The payload is a flags AD structure followed by a manufacturer specific AD structure that
//! carries the coordinates of the tag and the state of its button.
//!
//! ```text
//! 02 01 04                                  flags (BR/EDR not supported)
//! 0C FF 0F 00 X0 X1 X2 X3 Y0 Y1 Y2 Y3 BB    manufacturer specific data
//! ```

use crate::gap::assigned::{
    flags::{CoreFlags, Flags},
    manufacturer_data::ManufacturerData,
    DataTooLargeError,
};
use crate::hci::le::transmitter::set_advertising_data::AdvertisingData;
use crate::identifier::Coordinates;

/// The company identifier within the manufacturer specific data
pub const COMPANY_ID: u16 = 0x000F;

/// The button state of a tag whose button is not pressed
pub const BUTTON_RELEASED: u8 = 0;

/// Build the advertising data for `coordinates` and the button state `button`
pub fn build(coordinates: &Coordinates, button: u8) -> Result<AdvertisingData, DataTooLargeError> {
    let mut flags = Flags::new();

    flags.enable(CoreFlags::BREDRNotSupported);

    let mut manufacturer_data = [0u8; 9];

    manufacturer_data[..8].copy_from_slice(&coordinates.to_bytes());
    manufacturer_data[8] = button;

    let mut advertising_data = AdvertisingData::new();

    advertising_data.try_push(flags)?;

    advertising_data.try_push(ManufacturerData::new(COMPANY_ID, &manufacturer_data))?;

    Ok(advertising_data)
}
