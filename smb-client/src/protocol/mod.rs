pub mod body;
pub mod header;
pub mod legacy;
pub mod transform;
