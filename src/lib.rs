//! LBeacon tag advertising
//!
//! A tag is a Bluetooth LE broadcaster whose only job is to advertise a location identifier. The
//! identifier is carried inside a manufacturer specific AD structure as an X and Y coordinate that
//! are pulled out of a 32 digit hexadecimal UUID string.
//!
//! The library is split into the same pieces a host stack is split into. [`gap`] contains the AD
//! structures that make up the advertising payload, [`hci`] contains the commands sent to the
//! controller and the traits implemented by a platform driver (see the crate `lbeacon-tag-linux`),
//! and [`advertiser`] ties them together into the start/stop sequences of a tag.
//!
//! ```no_run
//! # fn run<D: lbeacon_tag::hci::Driver>(d: D) {
//! # let driver = move || d;
//! use lbeacon_tag::advertiser::Advertiser;
//!
//! let mut advertiser = Advertiser::new(driver());
//!
//! advertiser
//!     .start_advertising(0, 0x0800, "00000000000000000000000000000000", -50)
//!     .expect("failed to start advertising");
//!
//! // ... broadcast until told to stop
//!
//! advertiser.stop_advertising(0).expect("failed to stop advertising");
//! # }
//! ```

pub mod advertiser;
pub mod config;
pub mod gap;
pub mod hci;
pub mod identifier;
pub mod retry;

pub use advertiser::{Advertiser, ErrorCode};
pub use config::TagConfig;
pub use identifier::Identifier;
