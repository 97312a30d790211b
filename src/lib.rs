//! `cnpa` - arm-wise alignment of segmented copy number profiles.

pub mod libs;

pub use crate::libs::io::{reader, writer};
