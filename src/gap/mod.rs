//! Generic Access Profile
//!
//! A tag is a *broadcaster* in GAP terms. It never connects and never scans, all it does is send
//! advertising data, so the only part of GAP within this library is the format of the data that
//! is advertised.

pub mod assigned;
