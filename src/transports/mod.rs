//! Transport implementations

pub mod device;
pub mod replay;
#[cfg(unix)]
pub mod serial;

#[cfg(unix)]
pub use device::{DeviceTransport, open_device};
pub use device::IoTransport;
pub use replay::ReplayTransport;
#[cfg(unix)]
pub use serial::SerialPort;
