//! Tag identifier
//!
//! A tag is identified by a UUID written as 32 hexadecimal digits (no hyphens). Only two parts of
//! it make it into the advertising payload, the digits `12..20` are the X coordinate and the digits
//! `24..32` are the Y coordinate of the tag.
//!
//! ```
//! use lbeacon_tag::identifier::{decode_hex_pairs, Identifier};
//!
//! assert_eq!(decode_hex_pairs("0A1B").unwrap(), vec![0x0A, 0x1B]);
//!
//! let identifier: Identifier = "000000000000000000010000000000ff".parse().unwrap();
//!
//! assert_eq!(identifier.coordinates().to_bytes(), [0, 0, 0, 1, 0, 0, 0, 0xff]);
//! ```

use core::fmt;
use core::str::FromStr;

/// The number of hexadecimal digits within an identifier
pub const IDENTIFIER_DIGITS: usize = 32;

// Positions of the coordinates as byte offsets into the decoded identifier. These are the digits
// `12..20` and `24..32` of the identifier string.
const X_COORDINATE: core::ops::Range<usize> = 6..10;
const Y_COORDINATE: core::ops::Range<usize> = 12..16;

/// Error for malformed hexadecimal input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidIdentifier {
    /// The number of digits is odd (so the last pair is incomplete)
    OddLength(usize),
    /// A character that is not a hexadecimal digit
    InvalidDigit { position: usize, character: char },
    /// The identifier does not contain the expected number of digits
    IncorrectLength(usize),
}

impl fmt::Display for InvalidIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            InvalidIdentifier::OddLength(len) => write!(f, "odd number of hexadecimal digits ({})", len),
            InvalidIdentifier::InvalidDigit { position, character } => {
                write!(f, "'{}' at position {} is not a hexadecimal digit", character.escape_default(), position)
            }
            InvalidIdentifier::IncorrectLength(len) => write!(
                f,
                "an identifier is {} hexadecimal digits, found {}",
                IDENTIFIER_DIGITS, len
            ),
        }
    }
}

impl std::error::Error for InvalidIdentifier {}

fn hex_value(position: usize, character: char) -> Result<u8, InvalidIdentifier> {
    character
        .to_digit(16)
        .map(|val| val as u8)
        .ok_or(InvalidIdentifier::InvalidDigit { position, character })
}

/// Decode a string of hexadecimal digit pairs
///
/// Every two characters of `text` are converted into one byte, the first character being the high
/// nibble. Both upper and lower case digits are accepted.
///
/// # Error
/// `text` has an odd number of characters or contains a character that is not a hexadecimal digit.
pub fn decode_hex_pairs(text: &str) -> Result<Vec<u8>, InvalidIdentifier> {
    let chars: Vec<char> = text.chars().collect();

    if chars.len() % 2 != 0 {
        return Err(InvalidIdentifier::OddLength(chars.len()));
    }

    chars
        .chunks_exact(2)
        .enumerate()
        .map(|(pair, digits)| {
            let hi = hex_value(pair * 2, digits[0])?;
            let lo = hex_value(pair * 2 + 1, digits[1])?;

            Ok(16 * hi + lo)
        })
        .collect()
}

/// Encode bytes as upper case hexadecimal digit pairs
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// The X and Y coordinates of a tag
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coordinates {
    pub x: [u8; 4],
    pub y: [u8; 4],
}

impl Coordinates {
    /// Get the coordinates as they are laid out within the advertising payload
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];

        bytes[..4].copy_from_slice(&self.x);
        bytes[4..].copy_from_slice(&self.y);

        bytes
    }
}

/// A validated tag identifier
///
/// The identifier may be given with a trailing NUL character, this is how the identifier is stored
/// when it comes from a 33 byte C string buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Identifier {
    digits: String,
    bytes: [u8; IDENTIFIER_DIGITS / 2],
}

impl Identifier {
    /// Create a new `Identifier`
    ///
    /// # Error
    /// `text` is not 32 hexadecimal digits.
    pub fn new(text: &str) -> Result<Self, InvalidIdentifier> {
        let text = text.strip_suffix('\0').unwrap_or(text);

        let len = text.chars().count();

        if len != IDENTIFIER_DIGITS {
            return Err(InvalidIdentifier::IncorrectLength(len));
        }

        let mut bytes = [0u8; IDENTIFIER_DIGITS / 2];

        bytes.copy_from_slice(&decode_hex_pairs(text)?);

        Ok(Identifier {
            digits: text.to_string(),
            bytes,
        })
    }

    /// Get the identifier as its digits
    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// Get the coordinates carried by this identifier
    pub fn coordinates(&self) -> Coordinates {
        let mut coordinates = Coordinates::default();

        coordinates.x.copy_from_slice(&self.bytes[X_COORDINATE]);
        coordinates.y.copy_from_slice(&self.bytes[Y_COORDINATE]);

        coordinates
    }

    /// Get the identifier as the sixteen bytes of the UUID
    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_DIGITS / 2] {
        &self.bytes
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Identifier {
            digits: "0".repeat(IDENTIFIER_DIGITS),
            bytes: [0u8; IDENTIFIER_DIGITS / 2],
        }
    }
}

impl FromStr for Identifier {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::new(s)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = InvalidIdentifier;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Identifier::new(s)
    }
}

#[cfg(feature = "uuid-crate")]
impl From<uuid::Uuid> for Identifier {
    fn from(uuid: uuid::Uuid) -> Self {
        Identifier {
            digits: encode_hex(uuid.as_bytes()),
            bytes: *uuid.as_bytes(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Identifier({})", self.digits)
    }
}
