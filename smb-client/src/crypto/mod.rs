pub mod des;
pub mod ntlm;
pub mod smb2;
pub mod sp800_108;
