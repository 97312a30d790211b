pub mod align;
pub mod cgh;
pub mod cn;
pub mod error;
pub mod io;
pub mod matrix;
pub mod profile;
pub mod segment;
pub mod stats;
