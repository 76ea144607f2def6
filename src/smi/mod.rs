pub mod client;
pub mod snapshot;
pub mod value;

pub use client::{SmiClient, SmiVersions};
pub use snapshot::{DeviceIdentity, DeviceRecord, Snapshot, SYSTEM_KEY};
pub use value::{is_na, normalize};
