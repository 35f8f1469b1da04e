use crate::error::ApplianceError;
use crate::messages::Button;
use evdev::{Device, KeyCode};
use std::path::Path;

/// Raw digital levels of the three buttons, indexed in scan order
pub type ButtonLevels = [bool; 3];

/// Source of raw button levels
pub trait ButtonPanel: Send {
    fn read_levels(&mut self) -> Result<ButtonLevels, ApplianceError>;
}

/// Buttons wired through the `gpio-keys` driver and read as an evdev device.
///
/// Levels come from the kernel key state (EVIOCGKEY), so reads are plain
/// polls that never block on the event queue.
pub struct EvdevButtons {
    device: Device,
    codes: [KeyCode; 3],
}

impl EvdevButtons {
    pub fn open(path: &Path, codes: [u16; 3]) -> Result<Self, ApplianceError> {
        let device = Device::open(path)
            .map_err(|e| ApplianceError::hardware(&format!("open {}", path.display()), e))?;

        tracing::info!(
            "Opened button device {} ({})",
            path.display(),
            device.name().unwrap_or("unnamed")
        );

        Ok(Self {
            device,
            codes: codes.map(KeyCode::new),
        })
    }
}

impl ButtonPanel for EvdevButtons {
    fn read_levels(&mut self) -> Result<ButtonLevels, ApplianceError> {
        let state = self
            .device
            .get_key_state()
            .map_err(|e| ApplianceError::hardware("read button state", e))?;
        Ok(self.codes.map(|code| state.contains(code)))
    }
}

/// Edge-triggered button reader.
///
/// A button is reported once when its level goes from released to pressed;
/// it has to be seen released again before it can fire another event. With
/// a poll interval of a few milliseconds this also swallows contact bounce.
pub struct ButtonPoller {
    panel: Box<dyn ButtonPanel>,
    previous: ButtonLevels,
}

impl ButtonPoller {
    pub fn new(panel: Box<dyn ButtonPanel>) -> Self {
        Self {
            panel,
            previous: [false; 3],
        }
    }

    /// Read the panel once and return the first newly pressed button in scan order
    pub fn poll(&mut self) -> Result<Option<Button>, ApplianceError> {
        let levels = self.panel.read_levels()?;
        let pressed = (0..levels.len()).find(|&i| levels[i] && !self.previous[i]);
        self.previous = levels;

        match pressed {
            Some(index) => {
                let button = Button::try_from(index)?;
                tracing::info!("{:?} pressed", button);
                Ok(Some(button))
            }
            None => Ok(None),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedPanel;
    use super::*;

    #[test]
    fn test_held_button_fires_once() {
        let panel = ScriptedPanel::new(&[
            [false, true, false],
            [false, true, false],
            [false, true, false],
            [false, false, false],
            [false, true, false],
        ]);
        let mut poller = ButtonPoller::new(Box::new(panel));

        assert_eq!(poller.poll().unwrap(), Some(Button::Button1));
        assert_eq!(poller.poll().unwrap(), None);
        assert_eq!(poller.poll().unwrap(), None);
        assert_eq!(poller.poll().unwrap(), None);
        assert_eq!(poller.poll().unwrap(), Some(Button::Button1));
    }

    #[test]
    fn test_scan_order_priority() {
        let panel = ScriptedPanel::new(&[[true, true, true], [false, false, true]]);
        let mut poller = ButtonPoller::new(Box::new(panel));

        assert_eq!(poller.poll().unwrap(), Some(Button::Button0));
        // Button2 was already held, so releasing the others yields nothing new
        assert_eq!(poller.poll().unwrap(), None);
    }

    #[test]
    fn test_idle_panel_yields_nothing() {
        let mut poller = ButtonPoller::new(Box::new(ScriptedPanel::default()));
        assert_eq!(poller.poll().unwrap(), None);
    }
}
