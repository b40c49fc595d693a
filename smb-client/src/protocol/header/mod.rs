mod command;
mod flags;
mod header;
mod legacy;

pub use command::SMB2Command;
pub use flags::SMB2Flags;
pub use header::{SMB2Header, SMB2_HEADER_SIZE, SMB2_PROTOCOL_ID, UNSOLICITED_MESSAGE_ID};
pub use legacy::{
    SMB1Command, SMB1Flags2, SMB1Header, LEGACY_OPLOCK_BREAK_MID, SMB1_HEADER_SIZE,
    SMB1_PROTOCOL_ID,
};
