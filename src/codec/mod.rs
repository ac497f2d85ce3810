//! Translates between captured wire bytes and the structured textual
//! record format used for both the capture log and the playback log.

mod deserialize;
mod serialize;

pub use deserialize::{
  deserialize,
  deserialize_records,
};
pub use serialize::serialize;
