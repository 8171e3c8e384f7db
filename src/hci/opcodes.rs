//! HCI Command Opcodes
//!
//! Opcodes are composed of a group identifier and an individual command identifier specific to the
//! group. The group identifier and individual identifier are put together to form the raw opcode
//! value.
//!
//! Only the commands used by a tag are listed here.
//!
//! ```
//! # use lbeacon_tag::hci::opcodes::{HciCommand, LEController};
//!
//! assert_eq!(0x200A, HciCommand::LEController(LEController::SetAdvertisingEnable).into_opcode());
//! ```

/// Enumerations of the HCI command opcodes
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HciCommand {
    LEController(LEController),
}

impl HciCommand {
    /// Get the opcode for this command
    pub const fn into_opcode(self) -> u16 {
        self.into_opcode_pair().into_opcode()
    }

    /// Get the `OpCodePair` for this command
    pub const fn into_opcode_pair(self) -> OpCodePair {
        match self {
            HciCommand::LEController(ocf) => ocf.into_opcode_pair(),
        }
    }
}

impl core::fmt::Display for HciCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            HciCommand::LEController(c) => {
                let opcode = c.into_opcode_pair();

                write!(f, "LE controller - {} ({:#x}:{:#x})", c, opcode.ogf, opcode.ocf)
            }
        }
    }
}

/// An type for the pair of OGF (OpCode Group Field) and OCF (OpCode Command Field)
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct OpCodePair {
    pub ogf: u16,
    pub ocf: u16,
}

impl OpCodePair {
    /// Convert the OpCodePair into the opcode
    ///
    /// The returned value is the OpCode used with building a HCI command Packet.
    pub const fn into_opcode(self) -> u16 {
        // The first 10 bits of the OpCode is the OCF field and the last 6 bits is the OGF field.
        (self.ocf & 0x3FFu16) | (self.ogf << 10)
    }

    /// Convert a HCI command packet formatted Op Code into an OpCodePair
    pub const fn from_opcode(val: u16) -> Self {
        OpCodePair {
            ogf: val >> 10,
            ocf: val & 0x3FFu16,
        }
    }
}

impl From<HciCommand> for OpCodePair {
    fn from(cmd: HciCommand) -> OpCodePair {
        cmd.into_opcode_pair()
    }
}

/// LE controller commands
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum LEController {
    SetAdvertisingParameters,
    SetAdvertisingData,
    SetAdvertisingEnable,
}

impl LEController {
    const OGF: u16 = 0x8;

    const fn into_opcode_pair(self) -> OpCodePair {
        use self::LEController::*;

        OpCodePair {
            ogf: LEController::OGF,
            ocf: match self {
                SetAdvertisingParameters => 0x6,
                SetAdvertisingData => 0x8,
                SetAdvertisingEnable => 0xa,
            },
        }
    }
}

impl core::fmt::Display for LEController {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            LEController::SetAdvertisingParameters => f.write_str("set advertising parameters"),
            LEController::SetAdvertisingData => f.write_str("set advertising data"),
            LEController::SetAdvertisingEnable => f.write_str("set advertising enable"),
        }
    }
}
