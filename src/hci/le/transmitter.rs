/// LE Set Advertising Parameters command
pub mod set_advertising_parameters {

    use crate::hci::*;
    use core::default::Default;
    use serde::Serialize;

    const COMMAND: opcodes::HciCommand =
        opcodes::HciCommand::LEController(opcodes::LEController::SetAdvertisingParameters);

    /// Advertising interval
    ///
    /// The interval is in units of 0.625 ms. The Bluetooth Specification limits the range to
    /// `0x0020..=0x4000` (20 ms to 10.24 s), but the value is sent to the controller as is. It is up
    /// to the controller to reject an interval it does not support.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AdvertisingInterval {
        interval: u16,
    }

    impl AdvertisingInterval {
        const RAW_RANGE: core::ops::RangeInclusive<u16> = 0x0020..=0x4000;

        const MICRO_SEC_CONV: u64 = 625;

        /// Create an interval from a raw value
        pub fn from_raw(raw: u16) -> Self {
            AdvertisingInterval { interval: raw }
        }

        /// Check if the interval is within the range defined by the Bluetooth Specification
        pub fn is_within_spec(&self) -> bool {
            Self::RAW_RANGE.contains(&self.interval)
        }

        /// Get the raw value of the interval
        pub fn get_raw_val(&self) -> u16 {
            self.interval
        }

        /// Get the value of the interval as a `Duration`
        pub fn get_duration(&self) -> core::time::Duration {
            core::time::Duration::from_micros(self.interval as u64 * Self::MICRO_SEC_CONV)
        }
    }

    impl Default for AdvertisingInterval {
        /// This is a Bluetooth Specification defined default value
        fn default() -> Self {
            AdvertisingInterval { interval: 0x0800 }
        }
    }

    /// Advertising Type
    ///
    /// Enumeration for the 'Advertising Type' advertising parameter.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum AdvertisingType {
        ConnectableAndScannableUndirectedAdvertising,
        ConnectableHighDucyCycleDirectedAdvertising,
        ScannableUndirectedAdvertising,
        NonConnectableUndirectedAdvertising,
        ConnectableLowDutyCycleDirectedAdvertising,
    }

    impl AdvertisingType {
        fn into_val(&self) -> u8 {
            match *self {
                AdvertisingType::ConnectableAndScannableUndirectedAdvertising => 0x00,
                AdvertisingType::ConnectableHighDucyCycleDirectedAdvertising => 0x01,
                AdvertisingType::ScannableUndirectedAdvertising => 0x02,
                AdvertisingType::NonConnectableUndirectedAdvertising => 0x03,
                AdvertisingType::ConnectableLowDutyCycleDirectedAdvertising => 0x04,
            }
        }
    }

    impl Default for AdvertisingType {
        fn default() -> Self {
            AdvertisingType::ConnectableAndScannableUndirectedAdvertising
        }
    }

    /// The type of address used by this device in advertising packets
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub enum OwnAddressType {
        #[default]
        PublicDeviceAddress,
        RandomDeviceAddress,
    }

    impl OwnAddressType {
        fn into_val(&self) -> u8 {
            match *self {
                OwnAddressType::PublicDeviceAddress => 0x00,
                OwnAddressType::RandomDeviceAddress => 0x01,
            }
        }
    }

    /// Peer address type
    ///
    /// # Notes (from core 5.0 specification)
    /// - PublicAddress -> Public Device Address (default) or Public Identity Address
    /// - RandomAddress -> Random Device Address or Random (static) Identity Address
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub enum PeerAddressType {
        #[default]
        PublicAddress,
        RandomAddress,
    }

    impl PeerAddressType {
        fn into_val(&self) -> u8 {
            match *self {
                PeerAddressType::PublicAddress => 0x00,
                PeerAddressType::RandomAddress => 0x01,
            }
        }
    }

    /// Advertising channels
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum AdvertisingChannel {
        Channel37,
        Channel38,
        Channel39,
    }

    impl AdvertisingChannel {
        fn into_val(&self) -> u8 {
            match *self {
                AdvertisingChannel::Channel37 => 0x01,
                AdvertisingChannel::Channel38 => 0x02,
                AdvertisingChannel::Channel39 => 0x04,
            }
        }

        pub fn default_channels() -> &'static [AdvertisingChannel] {
            &[
                AdvertisingChannel::Channel37,
                AdvertisingChannel::Channel38,
                AdvertisingChannel::Channel39,
            ]
        }
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub enum AdvertisingFilterPolicy {
        #[default]
        AllDevices,
        AllConnectionRequestsWhitlistedDeviceScanRequests,
        AllScanRequestsWhitlistedDeviceConnectionRequests,
        WhitelistedDevices,
    }

    impl AdvertisingFilterPolicy {
        fn into_val(&self) -> u8 {
            match *self {
                AdvertisingFilterPolicy::AllDevices => 0x00,
                AdvertisingFilterPolicy::AllConnectionRequestsWhitlistedDeviceScanRequests => 0x01,
                AdvertisingFilterPolicy::AllScanRequestsWhitlistedDeviceConnectionRequests => 0x02,
                AdvertisingFilterPolicy::WhitelistedDevices => 0x03,
            }
        }
    }

    /// All the parameters required for advertising
    ///
    /// For the advertising_channel_map, provide a slice containing every channels
    /// desired to be advertised on.
    #[derive(Clone, Debug)]
    pub struct AdvertisingParameters<'a> {
        pub minimum_advertising_interval: AdvertisingInterval,
        pub maximum_advertising_interval: AdvertisingInterval,
        pub advertising_type: AdvertisingType,
        pub own_address_type: OwnAddressType,
        pub peer_address_type: PeerAddressType,
        pub peer_address: [u8; 6],
        pub advertising_channel_map: &'a [AdvertisingChannel],
        pub advertising_filter_policy: AdvertisingFilterPolicy,
    }

    impl<'a> Default for AdvertisingParameters<'a> {
        /// Create an AdvertisingParameters object with the default parameters
        ///
        /// The default parameter values are from the bluetooth core 5.0 specification,
        /// however there is no default value for the peer_address. This function sets
        /// the peer_address to zero.
        fn default() -> Self {
            AdvertisingParameters {
                minimum_advertising_interval: AdvertisingInterval::default(),
                maximum_advertising_interval: AdvertisingInterval::default(),
                advertising_type: AdvertisingType::default(),
                own_address_type: OwnAddressType::default(),
                peer_address_type: PeerAddressType::default(),
                peer_address: [0u8; 6],
                advertising_channel_map: AdvertisingChannel::default_channels(),
                advertising_filter_policy: AdvertisingFilterPolicy::default(),
            }
        }
    }

    impl AdvertisingParameters<'static> {
        /// Create the parameters for non-connectable advertising on all channels at a fixed
        /// interval
        pub fn non_connectable(interval: AdvertisingInterval) -> Self {
            AdvertisingParameters {
                minimum_advertising_interval: interval,
                maximum_advertising_interval: interval,
                advertising_type: AdvertisingType::NonConnectableUndirectedAdvertising,
                ..AdvertisingParameters::default()
            }
        }
    }

    #[derive(Serialize)]
    struct Parameter {
        minimum_advertising_interval: u16,
        maximum_advertising_interval: u16,
        advertising_type: u8,
        own_address_type: u8,
        peer_address_type: u8,
        peer_address: [u8; 6],
        advertising_channel_map: u8,
        advertising_filter_policy: u8,
    }

    impl From<&AdvertisingParameters<'_>> for Parameter {
        fn from(ap: &AdvertisingParameters<'_>) -> Self {
            Parameter {
                minimum_advertising_interval: ap.minimum_advertising_interval.get_raw_val(),
                maximum_advertising_interval: ap.maximum_advertising_interval.get_raw_val(),
                advertising_type: ap.advertising_type.into_val(),
                own_address_type: ap.own_address_type.into_val(),
                peer_address_type: ap.peer_address_type.into_val(),
                peer_address: ap.peer_address,
                advertising_channel_map: ap.advertising_channel_map.iter().fold(0u8, |v, x| v | x.into_val()),
                advertising_filter_policy: ap.advertising_filter_policy.into_val(),
            }
        }
    }

    impl CommandParameter for Parameter {
        const COMMAND: opcodes::HciCommand = COMMAND;
    }

    /// Send the LE Set Advertising Parameters command
    pub fn send<H: ControllerHandle + ?Sized>(
        handle: &mut H,
        parameters: &AdvertisingParameters<'_>,
        timeout: core::time::Duration,
    ) -> Result<Status, CommandError<H::Error>> {
        send_command(handle, &Parameter::from(parameters), timeout).map(Status)
    }

}

/// LE Set Advertising Data command
pub mod set_advertising_data {

    use crate::gap::assigned::{DataTooLargeError, EirOrAdIterator, IntoStruct};
    use crate::hci::*;
    use serde::Serialize;

    const COMMAND: opcodes::HciCommand =
        opcodes::HciCommand::LEController(opcodes::LEController::SetAdvertisingData);

    /// The maximum number of bytes within the advertising data of a legacy advertising packet
    pub const MAX_ADVERTISING_DATA_SIZE: usize = 31;

    type Payload = [u8; MAX_ADVERTISING_DATA_SIZE];

    /// Advertising data
    ///
    /// The Advertising data is made up of AD Structs. The maximum amount of bytes a
    /// regular advertising broadcast can send is 31 bytes (look at extended
    /// advertising for a larger payload). The data can consist of as many AD structs
    /// that can fit in it.
    ///
    /// `AdvertisingData` is an append only builder, an AD struct is only added if the whole of it
    /// fits within the remaining space.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AdvertisingData {
        length: usize,
        payload: Payload,
    }

    impl AdvertisingData {
        /// Create an empty advertising data
        pub fn new() -> Self {
            AdvertisingData::default()
        }

        /// Add an ADStruct to the advertising data
        ///
        /// # Error
        /// 'data' in its transmission form was too large for remaining free space in
        /// the advertising data. Nothing is added to the advertising data.
        pub fn try_push<T>(&mut self, data: T) -> Result<(), DataTooLargeError>
        where
            T: IntoStruct,
        {
            let remaining = self.remaining_space();

            match data.convert_into(&mut self.payload[self.length..]) {
                Some(ad_struct) => {
                    self.length += ad_struct.size();
                    Ok(())
                }
                None => Err(DataTooLargeError {
                    overflow: data.struct_len().saturating_sub(remaining),
                    remaining,
                }),
            }
        }

        /// Get the remaining amount of space available for ADStructures
        pub fn remaining_space(&self) -> usize {
            self.payload.len() - self.length
        }

        /// Get the number of bytes used by the AD structures
        pub fn len(&self) -> usize {
            self.length
        }

        pub fn is_empty(&self) -> bool {
            self.length == 0
        }

        /// Get the AD structures as their transmitted bytes
        pub fn as_bytes(&self) -> &[u8] {
            &self.payload[..self.length]
        }

        /// Iterate over the AD structures
        pub fn iter(&self) -> EirOrAdIterator<'_> {
            EirOrAdIterator::new(self.as_bytes())
        }
    }

    #[derive(Serialize)]
    struct Parameter {
        length: u8,
        payload: Payload,
    }

    impl From<&AdvertisingData> for Parameter {
        fn from(ad: &AdvertisingData) -> Self {
            Parameter {
                length: ad.length as u8,
                payload: ad.payload,
            }
        }
    }

    impl CommandParameter for Parameter {
        const COMMAND: opcodes::HciCommand = COMMAND;
    }

    /// Send the LE Set Advertising Data command
    pub fn send<H: ControllerHandle + ?Sized>(
        handle: &mut H,
        advertising_data: &AdvertisingData,
        timeout: core::time::Duration,
    ) -> Result<Status, CommandError<H::Error>> {
        send_command(handle, &Parameter::from(advertising_data), timeout).map(Status)
    }

}

/// LE Set Advertising Enable command
pub mod set_advertising_enable {

    use crate::hci::*;
    use serde::Serialize;

    const COMMAND: opcodes::HciCommand =
        opcodes::HciCommand::LEController(opcodes::LEController::SetAdvertisingEnable);

    #[derive(Serialize)]
    struct Parameter {
        enable: u8,
    }

    impl CommandParameter for Parameter {
        const COMMAND: opcodes::HciCommand = COMMAND;
    }

    /// Send the LE Set Advertising Enable command
    pub fn send<H: ControllerHandle + ?Sized>(
        handle: &mut H,
        enable: bool,
        timeout: core::time::Duration,
    ) -> Result<Status, CommandError<H::Error>> {
        let parameter = Parameter {
            enable: if enable { 1u8 } else { 0u8 },
        };

        send_command(handle, &parameter, timeout).map(Status)
    }

}
