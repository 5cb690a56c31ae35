//! Report outputs: the CSV attachment, the terminal view and the email text.

mod csv;
mod email;
mod render;

pub use csv::*;
pub use email::*;
pub use render::*;
