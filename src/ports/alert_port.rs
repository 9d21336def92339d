//! Chat alert port.

use crate::domain::error::SigtraderError;

pub trait AlertPort {
    /// Delivers one pre-formatted message (HTML subset: `<b>`, `<i>`).
    fn send(&self, message: &str) -> Result<(), SigtraderError>;
}
