//! Prize catalogs.
//!
//! Admin-configured outcomes for instant-win and spin-wheel games, the checks that gate a save, and
//! the payloads handed to persistence.

mod collection;
mod constants;
mod error;
mod instant;
mod outcome;
mod payload;
pub mod rules;
mod wheel;

pub use collection::{Catalog, Outcome};
pub use constants::*;
pub use error::{format_percent, ValidationError};
pub use instant::*;
pub use outcome::*;
pub use payload::*;
pub use wheel::*;
