//! Advertising Data: Flags
//!
//! The flags AD structure is how a device tells a scanner what kind of discoverability and BR/EDR
//! support it has. A tag only ever advertises that it does not support BR/EDR, but all the core
//! flags are here.

use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoreFlags {
    /// LE limited discoverable mode
    LELimitedDiscoverableMode,
    /// LE general discoverable mode
    LEGeneralDiscoverableMode,
    /// BR/EDR not supported
    BREDRNotSupported,
    /// The controller supports simultanious BR/EDR and LE to the same device
    ControllerSupportsSimultaniousLEAndBREDR,
    /// The host supports simultanious BR/EDR and LE to the same device.
    HostSupportsSimultaniousLEAndBREDR,
}

impl CoreFlags {
    fn get_position(&self) -> u8 {
        match *self {
            CoreFlags::LELimitedDiscoverableMode => 0,
            CoreFlags::LEGeneralDiscoverableMode => 1,
            CoreFlags::BREDRNotSupported => 2,
            CoreFlags::ControllerSupportsSimultaniousLEAndBREDR => 3,
            CoreFlags::HostSupportsSimultaniousLEAndBREDR => 4,
        }
    }

    fn get_mask(&self) -> u8 {
        1 << self.get_position()
    }
}

/// The flags data type
///
/// ```rust
/// # use lbeacon_tag::gap::assigned::flags;
/// let mut flags = flags::Flags::new();
///
/// flags.enable(flags::CoreFlags::BREDRNotSupported);
///
/// assert_eq!(flags.bits(), 0x04);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    bits: u8,
}

impl Flags {
    const AD_TYPE: AssignedTypes = AssignedTypes::Flags;

    /// Creates a flags object with no enabled flag
    pub fn new() -> Self {
        Flags::default()
    }

    /// Create flags from the raw flag octet
    ///
    /// The reserved bits are kept as they are.
    pub fn from_raw(bits: u8) -> Self {
        Flags { bits }
    }

    /// Get the raw flag octet
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Enable a flag
    pub fn enable(&mut self, flag: CoreFlags) {
        self.bits |= flag.get_mask()
    }

    /// Disable a flag
    pub fn disable(&mut self, flag: CoreFlags) {
        self.bits &= !flag.get_mask()
    }

    /// Check if a flag is enabled
    pub fn is_enabled(&self, flag: CoreFlags) -> bool {
        self.bits & flag.get_mask() != 0
    }
}

impl IntoStruct for Flags {
    fn data_len(&self) -> usize {
        1
    }

    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Option<EirOrAdStruct<'a>> {
        let mut interm = StructIntermediate::new(b, Self::AD_TYPE.val())?;

        interm.try_extend(&[self.bits])?;

        Some(interm.finish())
    }
}

impl<'a> TryFromStruct<'a> for Flags {
    fn try_from_struct(st: EirOrAdStruct<'a>) -> Result<Self, Error> {
        if st.get_type() != Self::AD_TYPE.val() {
            return Err(Error::IncorrectAssignedType);
        }

        // a flags struct may be longer than one octet, the extra octets are not defined for LE
        match st.get_data().first() {
            Some(bits) => Ok(Flags::from_raw(*bits)),
            None => Err(Error::IncorrectLength),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn into_struct_test() {
        let mut flags = Flags::new();

        flags.enable(CoreFlags::LELimitedDiscoverableMode);
        flags.enable(CoreFlags::BREDRNotSupported);
        flags.disable(CoreFlags::LELimitedDiscoverableMode);

        let mut buffer = [0u8; 8];

        let ad_struct = flags.convert_into(&mut buffer).unwrap();

        assert_eq!(ad_struct.into_inner(), &[2u8, 0x01, 0x04]);
        assert_eq!(flags.struct_len(), 3);
    }

    #[test]
    fn buffer_too_small() {
        let mut buffer = [0u8; 2];

        assert!(Flags::new().convert_into(&mut buffer).is_none());
    }

    #[test]
    fn from_struct_test() {
        let packet = [2u8, AssignedTypes::Flags.val(), 0x06];

        let (ad_struct, _) = EirOrAdStruct::try_new(&packet).unwrap().unwrap();

        let flags: Flags = ad_struct.try_into().unwrap();

        assert!(flags.is_enabled(CoreFlags::LEGeneralDiscoverableMode));
        assert!(flags.is_enabled(CoreFlags::BREDRNotSupported));
        assert!(!flags.is_enabled(CoreFlags::LELimitedDiscoverableMode));
    }

    #[test]
    fn from_wrong_struct() {
        let packet = [2u8, AssignedTypes::TxPowerLevel.val(), 0x06];

        let (ad_struct, _) = EirOrAdStruct::try_new(&packet).unwrap().unwrap();

        assert_eq!(ad_struct.try_into::<Flags>(), Err(Error::IncorrectAssignedType));
    }
}
