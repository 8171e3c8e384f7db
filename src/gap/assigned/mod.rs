//! Assigned numbers and the associated data formats
//!
//! The assigned numbers for GAP come from the Bluetooth SIG and can be found on the official
//! [Bluetooth](https://www.bluetooth.com/specifications/assigned-numbers/) webpage. These numbers
//! are used to identify the meaning and corresponding data format for whoever is the receiver.
//!
//! The general format for the container of the data is one byte for length, one byte for the
//! assigned number, and multiple bytes for the data. Within advertising data this container is
//! called an *AD struct* (in an Extended Inquiry Response it is an *EIR struct*, but the format is
//! the same). The length byte is the number of bytes that follow it, so it counts the assigned
//! number byte along with the data.

pub mod flags;
pub mod manufacturer_data;

/// The size of the header for either an EIR or AD structure
///
/// The full size of either an EIR or AD structure is this plus the size of the data.
pub const HEADER_SIZE: usize = 2;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AssignedTypes {
    Flags,
    ShortenedLocalName,
    CompleteLocalName,
    TxPowerLevel,
    ManufacturerSpecificData,
}

impl AssignedTypes {
    pub const fn val(&self) -> u8 {
        match *self {
            AssignedTypes::Flags => 0x01,
            AssignedTypes::ShortenedLocalName => 0x08,
            AssignedTypes::CompleteLocalName => 0x09,
            AssignedTypes::TxPowerLevel => 0x0A,
            AssignedTypes::ManufacturerSpecificData => 0xFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The assigned type within the structure is different from the expected type
    IncorrectAssignedType,
    /// The length byte contains an invalid value
    IncorrectLength,
    /// The buffer is too small for the structure
    RawTooSmall,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Error::IncorrectAssignedType => write!(f, "Incorrect Assigned Type Field"),
            Error::IncorrectLength => write!(
                f,
                "The length of this type is larger than the remaining bytes in the packet"
            ),
            Error::RawTooSmall => write!(f, "Raw data length is too small"),
        }
    }
}

impl std::error::Error for Error {}

/// An intermediary for help creating a EIR or AD Structure from a local type
///
/// The common format of either an EIR or AD Structure is one byte for the length of the data, one
/// byte for the AD type, and zero or more bytes for the AD data.
struct StructIntermediate<'a> {
    len: u8,
    struct_type: u8,
    ad: &'a mut [u8],
}

impl<'a> StructIntermediate<'a> {
    /// Create an new `StructIntermediate`
    ///
    /// Input `b` is where the structure is to be placed. `None` is returned if `b` is too small to
    /// even contain the header.
    fn new(b: &'a mut [u8], struct_type: u8) -> Option<Self> {
        if b.len() < HEADER_SIZE {
            return None;
        }

        // The length starts at 1 because that is the size of the ad type
        Some(Self {
            len: 1,
            struct_type,
            ad: b,
        })
    }

    /// Extend the AD data by `bytes`
    ///
    /// If there is not enough room for all of `bytes` then none of them are added and `None` is
    /// returned.
    fn try_extend(&mut self, bytes: &[u8]) -> Option<()> {
        let len = self.len as usize + bytes.len();

        if len > u8::MAX as usize || 1 + len > self.ad.len() {
            return None;
        }

        let start = 1 + self.len as usize;

        self.ad[start..(1 + len)].copy_from_slice(bytes);

        self.len = len as u8;

        Some(())
    }

    /// Fill-out the header
    ///
    /// The return is the completed structure.
    fn finish(self) -> EirOrAdStruct<'a> {
        let StructIntermediate { len, struct_type, ad } = self;

        ad[0] = len;
        ad[1] = struct_type;

        let ad: &'a [u8] = ad;

        EirOrAdStruct(&ad[..1 + len as usize])
    }
}

/// A trait for converting a local type into an Extended Inquiry Response (EIR) or Advertising Data
/// (AD) Structure
pub trait IntoStruct {
    /// The length of the data of the structure
    fn data_len(&self) -> usize;

    /// The full length of the structure in its transmitted form
    fn struct_len(&self) -> usize {
        HEADER_SIZE + self.data_len()
    }

    /// Covert into its structure
    ///
    /// Input `b` is the buffer to contain the Structure. The implementor needs to create a
    /// structure and place it at the beginning of the buffer. If `b` is too small then the return
    /// is `None`.
    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Option<EirOrAdStruct<'a>>;
}

impl<T: IntoStruct + ?Sized> IntoStruct for &T {
    fn data_len(&self) -> usize {
        (**self).data_len()
    }

    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Option<EirOrAdStruct<'a>> {
        (**self).convert_into(b)
    }
}

/// A trait for attempting to convert an Extended Inquiry Response (EIR) or Advertising Data (AD)
/// Structure to a local type
pub trait TryFromStruct<'a> {
    /// Attempt to convert an EIR or AD struct into this type
    fn try_from_struct(st: EirOrAdStruct<'a>) -> Result<Self, Error>
    where
        Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataTooLargeError {
    pub(crate) overflow: usize,
    pub(crate) remaining: usize,
}

impl DataTooLargeError {
    /// Return the number of bytes that would overflow the advertising packet buffer
    pub fn overflow(&self) -> usize {
        self.overflow
    }

    /// The number of bytes remaining in the advertising buffer at the time that this error was
    /// generated.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl core::fmt::Display for DataTooLargeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "Advertising Data Too Large (overflow by {} with {} bytes remaining)",
            self.overflow, self.remaining
        )
    }
}

impl std::error::Error for DataTooLargeError {}

/// A wrapper around an EIR or AD structure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EirOrAdStruct<'a>(&'a [u8]);

impl<'a> EirOrAdStruct<'a> {
    /// Try to create a new `EirOrAdStruct`
    ///
    /// This will return a new `EirOrAdStruct` if it bytes starts with and contains a complete
    /// EIR or AD struct. A slice to the rest of the bytes is returned with a new `EirOrAdStruct`.
    ///
    /// `None` is returned if the length in the structure is zero. This is used to indicate an
    /// early termination of the entire data sequence, so any bytes that come after it are to be
    /// ignored.
    pub fn try_new(bytes: &'a [u8]) -> Result<Option<(Self, &'a [u8])>, Error> {
        let len = *bytes.first().ok_or(Error::RawTooSmall)? as usize;

        match len {
            0 => Ok(None),
            len if len < bytes.len() => Ok(Some((Self(&bytes[..1 + len]), &bytes[1 + len..]))),
            _ => Err(Error::IncorrectLength),
        }
    }

    /// Return the type (assigned number)
    pub fn get_type(&self) -> u8 {
        self.0[1]
    }

    /// Get the data bytes
    pub fn get_data(&self) -> &'a [u8] {
        let raw: &'a [u8] = self.0;

        &raw[HEADER_SIZE..]
    }

    /// Get the size of the structure
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Try to convert this struct into the type `T`
    pub fn try_into<T>(self) -> Result<T, Error>
    where
        T: TryFromStruct<'a>,
    {
        T::try_from_struct(self)
    }

    /// Convert into the inner struct data
    pub fn into_inner(self) -> &'a [u8] {
        self.0
    }
}

/// An iterator over EIR or AD structs
///
/// The iterator will stop if there is no more data, a length field is zero (which is used to
/// indicate an early termination), or the remaining bytes do not form a valid structure.
#[derive(Clone, Copy, Debug)]
pub struct EirOrAdIterator<'a>(&'a [u8]);

impl<'a> EirOrAdIterator<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        EirOrAdIterator(data)
    }
}

impl<'a> Iterator for EirOrAdIterator<'a> {
    type Item = EirOrAdStruct<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match EirOrAdStruct::try_new(self.0) {
            Ok(Some((ad_struct, rest))) => {
                self.0 = rest;
                Some(ad_struct)
            }
            _ => {
                self.0 = &[];
                None
            }
        }
    }
}
