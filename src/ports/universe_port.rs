//! Universe constituent list port.

use crate::domain::error::EquisimError;
use crate::domain::universe::Universe;

pub trait UniversePort {
    fn symbols(&self, universe: &Universe) -> Result<Vec<String>, EquisimError>;
}
