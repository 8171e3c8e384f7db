//! Manufacturer Specific Data Type
//!
//! The first two octets of the data are the company identifier assigned by the Bluetooth SIG, the
//! rest of the data is defined by the company.

use super::*;

/// The size of the company identifier in the data
pub const COMPANY_ID_SIZE: usize = 2;

/// Manufacturer specific data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManufacturerData<'a> {
    company_id: u16,
    data: &'a [u8],
}

impl<'a> ManufacturerData<'a> {
    const AD_TYPE: AssignedTypes = AssignedTypes::ManufacturerSpecificData;

    /// Create a new `ManufacturerData`
    ///
    /// `company_id` is the company identifier. It is transmitted in little endian.
    pub fn new(company_id: u16, data: &'a [u8]) -> Self {
        ManufacturerData { company_id, data }
    }

    pub fn get_company_id(&self) -> u16 {
        self.company_id
    }

    pub fn get_data(&self) -> &'a [u8] {
        self.data
    }
}

impl IntoStruct for ManufacturerData<'_> {
    fn data_len(&self) -> usize {
        COMPANY_ID_SIZE + self.data.len()
    }

    fn convert_into<'b>(&self, b: &'b mut [u8]) -> Option<EirOrAdStruct<'b>> {
        let mut interm = StructIntermediate::new(b, Self::AD_TYPE.val())?;

        interm.try_extend(&self.company_id.to_le_bytes())?;

        interm.try_extend(self.data)?;

        Some(interm.finish())
    }
}

impl<'a> TryFromStruct<'a> for ManufacturerData<'a> {
    fn try_from_struct(st: EirOrAdStruct<'a>) -> Result<Self, Error> {
        if st.get_type() != Self::AD_TYPE.val() {
            return Err(Error::IncorrectAssignedType);
        }

        let raw = st.get_data();

        if raw.len() < COMPANY_ID_SIZE {
            return Err(Error::IncorrectLength);
        }

        let company_id = u16::from_le_bytes([raw[0], raw[1]]);

        Ok(ManufacturerData::new(company_id, &raw[COMPANY_ID_SIZE..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_struct() {
        let mut buffer = [0u8; 31];

        let data = [1, 2, 3];

        let ad_struct = ManufacturerData::new(0x000F, &data).convert_into(&mut buffer).unwrap();

        assert_eq!(ad_struct.into_inner(), &[6, 0xFF, 0x0F, 0x00, 1, 2, 3]);
    }

    #[test]
    fn too_large_for_buffer() {
        let mut buffer = [0u8; 6];

        assert!(ManufacturerData::new(0x1234, &[1, 2, 3])
            .convert_into(&mut buffer)
            .is_none());
    }

    #[test]
    fn from_struct() {
        let raw = [5, 0xFF, 0x34, 0x12, 0xAB, 0xCD];

        let (ad_struct, rest) = EirOrAdStruct::try_new(&raw).unwrap().unwrap();

        assert!(rest.is_empty());

        let data: ManufacturerData = ad_struct.try_into().unwrap();

        assert_eq!(data.get_company_id(), 0x1234);
        assert_eq!(data.get_data(), &[0xAB, 0xCD]);
    }

    #[test]
    fn from_struct_without_company_id() {
        let raw = [2, 0xFF, 0x34];

        let (ad_struct, _) = EirOrAdStruct::try_new(&raw).unwrap().unwrap();

        assert_eq!(ad_struct.try_into::<ManufacturerData>(), Err(Error::IncorrectLength));
    }
}
