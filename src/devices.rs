use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{AudioError, Result};
use crate::transport::Transport;
use crate::types::{DeviceDescriptor, DeviceId, Direction};

/// Snapshot view of the hardware endpoints the transport exposes.
///
/// Every listing re-queries the transport; nothing is cached, because the
/// hardware topology can change between calls.
pub struct DeviceCatalog<'a> {
    transport: &'a dyn Transport,
}

impl<'a> DeviceCatalog<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Devices with at least one input channel, keyed by device id.
    pub fn list_input_devices(&self) -> Result<BTreeMap<DeviceId, DeviceDescriptor>> {
        self.list(Direction::Capture)
    }

    /// Devices with at least one output channel, keyed by device id.
    pub fn list_output_devices(&self) -> Result<BTreeMap<DeviceId, DeviceDescriptor>> {
        self.list(Direction::Playback)
    }

    fn list(&self, direction: Direction) -> Result<BTreeMap<DeviceId, DeviceDescriptor>> {
        let count = self.transport.device_count();
        if count < 0 {
            return Err(AudioError::DeviceEnumeration(format!(
                "transport reported device count {count}"
            )));
        }

        let mut devices = BTreeMap::new();
        for id in 0..count as DeviceId {
            let Some(descriptor) = self.transport.device_descriptor(id) else {
                continue;
            };
            let channels = match direction {
                Direction::Capture => descriptor.max_input_channels,
                Direction::Playback => descriptor.max_output_channels,
            };
            if channels == 0 {
                continue;
            }
            devices.insert(id, descriptor);
        }

        debug!(%direction, total = count, usable = devices.len(), "enumerated devices");
        Ok(devices)
    }
}
