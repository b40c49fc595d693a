pub mod name_service;
pub mod packet;
pub mod receive_buffer;

pub use name_service::node_status_query;
pub use packet::{encode_name, SessionPacket, SessionPacketType, SMB_SERVER_SUFFIX};
pub use receive_buffer::SessionReceiveBuffer;
