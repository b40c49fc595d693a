use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default)]
   pub struct Capabilities: u32 {
      const DFS                = 0x01;
      const LEASING            = 0x02;
      const LARGE_MTU          = 0x04;
      const MULTI_CHANNEL      = 0x08;
      const PERSISTENT_HANDLES = 0x10;
      const DIRECTORY_LEASING  = 0x20;
      const ENCRYPTION         = 0x40;
   }
}
