//! Low Energy (LE) Controller Commands
//!
//! The LE commands are broken up into modules based on the implementation of a Bluetooth LE
//! controller. The organization of commands in modules is based on the *LE Controller Requirements*
//! in the Bluetooth Specification (v5.0) found at 'Vol 2, Part E, section 3.1'. A tag is an
//! advertiser, so only the *transmitter* commands are implemented.

pub mod transmitter;
