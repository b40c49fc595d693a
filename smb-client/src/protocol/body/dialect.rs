use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

#[repr(u16)]
#[derive(
    Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone, Ord, PartialOrd,
)]
#[allow(non_camel_case_types)]
pub enum SMBDialect {
    V2_0_2 = 0x202,
    V2_1_0 = 0x210,
    V3_0_0 = 0x300,
    V3_0_2 = 0x302,
    V3_1_1 = 0x311,
}

impl SMBDialect {
    pub fn is_smb3(&self) -> bool {
        *self as u16 >= 0x300
    }

    /// Dialects offered in a negotiate request, oldest first.
    pub fn all() -> [SMBDialect; 5] {
        [
            SMBDialect::V2_0_2,
            SMBDialect::V2_1_0,
            SMBDialect::V3_0_0,
            SMBDialect::V3_0_2,
            SMBDialect::V3_1_1,
        ]
    }
}
