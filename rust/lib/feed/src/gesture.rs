use std::time::{Duration, Instant};

/// Default double-tap window.
pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Raw press events from a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressEvent {
    Press,
    LongPressStart,
    LongPressEnd,
}

/// Commands a card's press stream resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureCommand {
    DoubleTap,
    RevealCaption,
    HideCaption,
}

/// Per-card tap memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GestureWindow {
    pub last_press_at: Option<Instant>,
}

/// Classifies press events using a double-tap window. Stateless; the window
/// state lives with each card.
#[derive(Debug, Clone, Copy)]
pub struct GestureDisambiguator {
    window: Duration,
}

impl GestureDisambiguator {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Feed one event. A press within the window of the previous press is a
    /// double tap and resets the window; any other press opens a new one.
    pub fn observe(
        &self,
        state: &mut GestureWindow,
        event: PressEvent,
        now: Instant,
    ) -> Option<GestureCommand> {
        match event {
            PressEvent::Press => match state.last_press_at {
                Some(last) if now.saturating_duration_since(last) < self.window => {
                    state.last_press_at = None;
                    Some(GestureCommand::DoubleTap)
                }
                _ => {
                    state.last_press_at = Some(now);
                    None
                }
            },
            PressEvent::LongPressStart => Some(GestureCommand::RevealCaption),
            PressEvent::LongPressEnd => Some(GestureCommand::HideCaption),
        }
    }
}

impl Default for GestureDisambiguator {
    fn default() -> Self {
        Self::new(DOUBLE_TAP_WINDOW)
    }
}

/// Gesture and caption state of one mounted card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardGesture {
    pub window: GestureWindow,
    pub caption_visible: bool,
}

impl CardGesture {
    /// Classify `event` and apply caption commands locally. Returns the
    /// command, if any, so the caller can act on `DoubleTap`.
    pub fn apply(
        &mut self,
        disambiguator: &GestureDisambiguator,
        event: PressEvent,
        now: Instant,
    ) -> Option<GestureCommand> {
        let command = disambiguator.observe(&mut self.window, event, now);
        match command {
            Some(GestureCommand::RevealCaption) => self.caption_visible = true,
            Some(GestureCommand::HideCaption) => self.caption_visible = false,
            _ => {}
        }
        command
    }
}
