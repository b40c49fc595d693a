use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

/// Target request window the client asks the server to sustain.
pub const DESIRED_CREDITS: u16 = 16;

/// One credit covers 64 KiB of payload (MS-SMB2 3.1.5.2).
const BYTES_PER_CREDIT: usize = 65536;

/// Tracks the credit window granted by the server. A connection
/// starts with the single credit every server must honor for the
/// first request.
#[derive(Debug)]
pub struct CreditPool {
    available: u16,
}

/// What a request may consume and ask for, computed before sending.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CreditCharge {
    /// CreditCharge header field.
    pub charge: u16,
    /// CreditRequest header field.
    pub request: u16,
}

impl CreditPool {
    pub fn new() -> Self {
        Self { available: 1 }
    }

    pub fn available(&self) -> u16 {
        self.available
    }

    /// Charge for dialects and transports without multi-credit
    /// support: the charge field stays zero but one credit is spent.
    pub fn charge_single(&mut self) -> SMBResult<CreditCharge> {
        if self.available == 0 {
            return Err(SMBError::insufficient_credits(1, 0));
        }
        self.available -= 1;
        Ok(CreditCharge {
            charge: 0,
            request: 1,
        })
    }

    /// Multi-credit charge sized by the larger direction of the
    /// payload.
    pub fn charge(&mut self, payload_bytes: usize) -> SMBResult<CreditCharge> {
        let charge = (payload_bytes.div_ceil(BYTES_PER_CREDIT)).max(1) as u16;
        if self.available < charge {
            return Err(SMBError::insufficient_credits(charge, self.available));
        }
        self.available -= charge;
        Ok(CreditCharge {
            charge,
            request: self.top_up(charge),
        })
    }

    /// Request enough credits to restore the desired window.
    fn top_up(&self, charge: u16) -> u16 {
        let after_send = self.available;
        if after_send < DESIRED_CREDITS {
            (DESIRED_CREDITS - after_send).max(charge)
        } else {
            charge
        }
    }

    pub fn grant(&mut self, credits: u16) {
        self.available = self.available.saturating_add(credits);
    }

    pub fn reset(&mut self) {
        self.available = 1;
    }
}

impl Default for CreditPool {
    fn default() -> Self {
        Self::new()
    }
}
