use crate::error::ApplianceError;
use tokio_util::sync::CancellationToken;

/// Physical buttons, in scan order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    /// Front left
    Button0,
    /// Front right
    Button1,
    /// Side
    Button2,
}

impl Button {
    pub const SCAN_ORDER: [Button; 3] = [Button::Button0, Button::Button1, Button::Button2];
}

impl TryFrom<usize> for Button {
    type Error = ApplianceError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Button::SCAN_ORDER
            .get(index)
            .copied()
            .ok_or(ApplianceError::InvalidButtonEvent(index))
    }
}

/// Controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Standby,
    Shutdown,
    Record,
}

/// How a shutdown countdown ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Button0 pressed during the countdown
    Confirmed,
    /// Countdown animation ran out without a press
    Elapsed,
    /// Button1 or Button2 pressed
    Cancelled,
    /// Loop flag cleared elsewhere (Ctrl+C) while counting down
    Interrupted,
}

/// Gates the outer activation loop.
///
/// Animations get a child token: clearing the flag stops them, while stopping
/// a single animation leaves the flag set.
#[derive(Clone, Debug, Default)]
pub struct LoopFlag {
    token: CancellationToken,
}

impl LoopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn clear(&self) {
        self.token.cancel();
    }

    pub async fn cleared(&self) {
        self.token.cancelled().await
    }

    pub fn animation_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_from_index() {
        assert_eq!(Button::try_from(0).unwrap(), Button::Button0);
        assert_eq!(Button::try_from(2).unwrap(), Button::Button2);
        assert!(matches!(
            Button::try_from(3),
            Err(ApplianceError::InvalidButtonEvent(3))
        ));
    }

    #[test]
    fn test_animation_token_does_not_clear_flag() {
        let flag = LoopFlag::new();
        let token = flag.animation_token();
        token.cancel();
        assert!(flag.is_set());

        let token = flag.animation_token();
        flag.clear();
        assert!(!flag.is_set());
        assert!(token.is_cancelled());
    }
}
