//! Seams towards the wallet and connection-pool collaborators.

mod traits;

pub use traits::*;
