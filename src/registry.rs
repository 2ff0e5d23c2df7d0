//! Control surface capability interface and device registry

use crate::collab::PlayState;
use crate::config::SurfaceConfig;
use crate::midi::EventWord;
use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// Capability interface every control surface implements.
///
/// The host calls these on activation, deactivation, event arrival and
/// sequencer state change. Nothing here returns an error: surfaces degrade
/// visually instead of failing.
pub trait ControlSurface: Send {
    /// Surface name for logs
    fn name(&self) -> &str;

    /// Port name fragments identifying the hardware
    fn device_ids(&self) -> &[&str];

    fn activate(&mut self);
    fn deactivate(&mut self);

    /// Handle one event word; returns whether it was consumed
    fn handle_event(&mut self, word: EventWord) -> bool;

    /// Resync every LED with host state
    fn render_state(&mut self, force: bool);

    /// Reflect a pad state change; returns false if the pad is not on the device
    fn update_pad(&mut self, pad: u32, state: PlayState, mode: u8) -> bool;

    /// Apply reloaded surface settings. Surfaces without settings ignore this.
    fn reconfigure(&mut self, _settings: &SurfaceConfig) {}

    /// Whether a MIDI port name belongs to this surface (case-insensitive)
    fn matches_port(&self, port_name: &str) -> bool {
        let port_name = port_name.to_lowercase();
        self.device_ids()
            .iter()
            .any(|id| port_name.contains(&id.to_lowercase()))
    }
}

struct Slot {
    surface: Box<dyn ControlSurface>,
    active: bool,
}

/// Surfaces keyed by the device index carried in event words
#[derive(Default)]
pub struct DeviceRegistry {
    slots: HashMap<u8, Slot>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a surface for a device index (inactive until `activate`)
    pub fn register(&mut self, device: u8, surface: Box<dyn ControlSurface>) -> Result<()> {
        if self.slots.contains_key(&device) {
            anyhow::bail!("Device {} already has a surface registered", device);
        }
        info!("Registered surface '{}' for device {}", surface.name(), device);
        self.slots.insert(
            device,
            Slot {
                surface,
                active: false,
            },
        );
        Ok(())
    }

    /// Remove a surface, deactivating it first if needed
    pub fn unregister(&mut self, device: u8) -> Option<Box<dyn ControlSurface>> {
        let mut slot = self.slots.remove(&device)?;
        if slot.active {
            slot.surface.deactivate();
        }
        Some(slot.surface)
    }

    /// Device index of the first registered surface claiming a port name
    pub fn find_by_port_name(&self, port_name: &str) -> Option<u8> {
        let mut devices: Vec<_> = self.slots.keys().copied().collect();
        devices.sort_unstable();
        devices
            .into_iter()
            .find(|device| self.slots[device].surface.matches_port(port_name))
    }

    pub fn is_active(&self, device: u8) -> bool {
        self.slots.get(&device).is_some_and(|slot| slot.active)
    }

    /// Activate a surface; returns false if none is registered
    pub fn activate(&mut self, device: u8) -> bool {
        let Some(slot) = self.slots.get_mut(&device) else {
            return false;
        };
        if !slot.active {
            slot.surface.activate();
            slot.active = true;
        }
        true
    }

    pub fn deactivate(&mut self, device: u8) -> bool {
        let Some(slot) = self.slots.get_mut(&device) else {
            return false;
        };
        if slot.active {
            slot.surface.deactivate();
            slot.active = false;
        }
        true
    }

    pub fn deactivate_all(&mut self) {
        for (device, slot) in self.slots.iter_mut() {
            if slot.active {
                debug!("Deactivating device {}", device);
                slot.surface.deactivate();
                slot.active = false;
            }
        }
    }

    /// Route an event word to the active surface owning its device index
    pub fn handle_event(&mut self, raw: u32) -> bool {
        let word = EventWord(raw);
        let device = word.decode().device;
        match self.slots.get_mut(&device) {
            Some(slot) if slot.active => slot.surface.handle_event(word),
            _ => {
                trace!("No active surface for device {} ({})", device, word);
                false
            }
        }
    }

    pub fn refresh(&mut self, device: u8, force: bool) {
        if let Some(slot) = self.slots.get_mut(&device).filter(|slot| slot.active) {
            slot.surface.render_state(force);
        }
    }

    pub fn refresh_all(&mut self, force: bool) {
        for slot in self.slots.values_mut().filter(|slot| slot.active) {
            slot.surface.render_state(force);
        }
    }

    /// Hand reloaded settings to every surface
    pub fn reconfigure_all(&mut self, settings: &SurfaceConfig) {
        for slot in self.slots.values_mut() {
            slot.surface.reconfigure(settings);
            if slot.active {
                slot.surface.render_state(true);
            }
        }
    }

    /// Draw a set of pads on every active surface; returns how many were shown
    pub fn update_pads(&mut self, pads: &[(u32, PlayState)], mode: u8) -> usize {
        pads.iter()
            .filter(|(pad, state)| self.update_pad(*pad, *state, mode))
            .count()
    }

    /// Forward a pad state change to every active surface.
    ///
    /// Returns whether any surface displayed it.
    pub fn update_pad(&mut self, pad: u32, state: PlayState, mode: u8) -> bool {
        let mut shown = false;
        for slot in self.slots.values_mut().filter(|slot| slot.active) {
            shown |= slot.surface.update_pad(pad, state, mode);
        }
        shown
    }
}
