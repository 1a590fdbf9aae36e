#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]

mod mediatype;

pub use mediatype::{media_type, valid_media_type};
