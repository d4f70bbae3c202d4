//! Two-button input: raw pin reads plus debounced press/release events.
//!
//! On the device the buttons are active-low GPIO lines exposed by the
//! `gpio-key` overlay as an evdev key device; any keyboard works the same
//! way off-device. Events fire on release, never on level.

use std::time::Duration;

use evdev::{Device, Key};
use tracing::{debug, info};

use crate::config::ButtonsConfig;
use crate::error::HardwareError;

/// The two physical controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// White button: increment / next.
    Next,
    /// Blue button: confirm / select / skip / quit.
    Select,
}

/// Logical events produced by a full press-then-release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Increment,
    Confirm,
}

/// Raw level reads for the two controls.
pub trait ButtonPins: Send {
    /// True while the control is physically held down.
    fn is_pressed(&mut self, control: Control) -> Result<bool, HardwareError>;
}

/// Resolve a key name like "KEY_ENTER" to an evdev Key code.
fn resolve_key(name: &str) -> Result<Key, HardwareError> {
    let key = match name {
        "KEY_ENTER" => Key::KEY_ENTER,
        "KEY_SPACE" => Key::KEY_SPACE,
        "KEY_N" => Key::KEY_N,
        "KEY_Q" => Key::KEY_Q,
        "KEY_1" => Key::KEY_1,
        "KEY_2" => Key::KEY_2,
        "KEY_UP" => Key::KEY_UP,
        "KEY_DOWN" => Key::KEY_DOWN,
        "KEY_LEFT" => Key::KEY_LEFT,
        "KEY_RIGHT" => Key::KEY_RIGHT,
        "KEY_NEXT" => Key::KEY_NEXT,
        "KEY_SELECT" => Key::KEY_SELECT,
        "KEY_OK" => Key::KEY_OK,
        "KEY_PLAYPAUSE" => Key::KEY_PLAYPAUSE,
        "BTN_0" => Key::BTN_0,
        "BTN_1" => Key::BTN_1,
        "BTN_2" => Key::BTN_2,
        "BTN_3" => Key::BTN_3,
        _ => return Err(HardwareError::UnknownKey(name.to_string())),
    };
    Ok(key)
}

/// Buttons read from an evdev key device.
pub struct EvdevButtons {
    device: Device,
    next: Key,
    select: Key,
}

impl EvdevButtons {
    pub fn open(config: &ButtonsConfig) -> Result<Self, HardwareError> {
        let next = resolve_key(&config.next_key)?;
        let select = resolve_key(&config.select_key)?;

        let device = if config.device.is_empty() {
            Self::find_device(next, select)?
        } else {
            Device::open(&config.device)?
        };

        info!(
            "Buttons on {} ({} = next, {} = select)",
            device.name().unwrap_or("unknown"),
            config.next_key,
            config.select_key
        );

        Ok(Self {
            device,
            next,
            select,
        })
    }

    /// First input device that reports both keys.
    fn find_device(next: Key, select: Key) -> Result<Device, HardwareError> {
        evdev::enumerate()
            .map(|(_path, device)| device)
            .find(|device| {
                device
                    .supported_keys()
                    .is_some_and(|keys| keys.contains(next) && keys.contains(select))
            })
            .ok_or_else(|| {
                HardwareError::DeviceNotFound(format!(
                    "no device with {next:?} and {select:?}; check the gpio-key overlay \
                     and membership of the 'input' group"
                ))
            })
    }
}

impl ButtonPins for EvdevButtons {
    fn is_pressed(&mut self, control: Control) -> Result<bool, HardwareError> {
        let key = match control {
            Control::Next => self.next,
            Control::Select => self.select,
        };
        Ok(self.device.get_key_state()?.contains(key))
    }
}

/// Debounced input on top of raw pins.
pub struct InputSource {
    pins: Box<dyn ButtonPins>,
    debounce: Duration,
}

impl InputSource {
    pub fn new(pins: Box<dyn ButtonPins>, debounce: Duration) -> Self {
        Self { pins, debounce }
    }

    pub fn poll(&mut self, control: Control) -> Result<bool, HardwareError> {
        self.pins.is_pressed(control)
    }

    /// Suspend until `control` is no longer held, sampling every `debounce`.
    pub async fn await_release(&mut self, control: Control) -> Result<(), HardwareError> {
        while self.pins.is_pressed(control)? {
            tokio::time::sleep(self.debounce).await;
        }
        debug!("{control:?} released");
        Ok(())
    }

    /// One sample of both controls. Next wins if both are held.
    pub async fn next_event(&mut self) -> Result<Option<InputEvent>, HardwareError> {
        if self.poll(Control::Next)? {
            self.await_release(Control::Next).await?;
            return Ok(Some(InputEvent::Increment));
        }
        if self.poll(Control::Select)? {
            self.await_release(Control::Select).await?;
            return Ok(Some(InputEvent::Confirm));
        }
        Ok(None)
    }

    /// Block (cooperatively) until either control fires.
    pub async fn wait_event(&mut self, tick: Duration) -> Result<InputEvent, HardwareError> {
        loop {
            if let Some(event) = self.next_event().await? {
                return Ok(event);
            }
            tokio::time::sleep(tick).await;
        }
    }

    /// Non-blocking check for a completed Select press.
    pub async fn confirm_pressed(&mut self) -> Result<bool, HardwareError> {
        if self.poll(Control::Select)? {
            self.await_release(Control::Select).await?;
            return Ok(true);
        }
        Ok(false)
    }
}
