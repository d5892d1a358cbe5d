//! Normal/edit interaction driven by encoder and button events
//!
//! In normal mode only a button press matters: it snapshots the clock into an
//! edit buffer and enables rotation. In edit mode rotation steps the active
//! field and presses walk Year → Month → Day → Hour → Minute → Second; the
//! press on Second commits the buffer to the clock.
//!
//! Clock failures never corrupt state. A failed snapshot leaves the machine
//! in normal mode, and a failed commit keeps the buffer and field so the next
//! press retries.

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use crate::clock_value::{ClockValue, EditField};
use crate::display::ClockView;
use crate::input::{InputEvent, RotaryIrqControl};
use crate::protocol::{ClockSource, ProtocolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Edit,
}

/// State that only exists while editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSession {
    pub buffer: ClockValue,
    pub field: EditField,
}

/// Outcome of feeding one event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ignored,
    EnteredEdit,
    EnterFailed(ProtocolError),
    Adjusted(EditField),
    Advanced(EditField),
    Committed(ClockValue),
    CommitFailed(ProtocolError),
}

pub struct InteractionStateMachine<R> {
    session: Option<EditSession>,
    blink_visible: bool,
    last_blink_toggle: Instant,
    blink_period: Duration,
    rotary: R,
}

impl<R: RotaryIrqControl> InteractionStateMachine<R> {
    /// Start in normal mode. The rotary source is switched off.
    pub fn new(mut rotary: R, blink_period: Duration) -> Self {
        rotary.set_rotary_enabled(false);
        Self {
            session: None,
            blink_visible: true,
            last_blink_toggle: Instant::from_ticks(0),
            blink_period,
            rotary,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.session.is_some() {
            Mode::Edit
        } else {
            Mode::Normal
        }
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn blink_visible(&self) -> bool {
        self.blink_visible
    }

    pub fn rotary(&self) -> &R {
        &self.rotary
    }

    /// Feed one event. `now` restarts the blink phase on entering edit mode.
    pub async fn handle<C: ClockSource>(
        &mut self,
        event: InputEvent,
        clock: &mut C,
        now: Instant,
    ) -> Transition {
        if self.session.is_none() {
            return match event {
                InputEvent::ButtonDown => self.enter_edit(clock, now).await,
                _ => Transition::Ignored,
            };
        }

        match event {
            InputEvent::RotateCw => self.adjust(1),
            InputEvent::RotateCcw => self.adjust(-1),
            InputEvent::ButtonDown => self.press_in_edit(clock).await,
            InputEvent::ButtonUp | InputEvent::None => Transition::Ignored,
        }
    }

    async fn enter_edit<C: ClockSource>(&mut self, clock: &mut C, now: Instant) -> Transition {
        match clock.read_clock().await {
            Ok(value) => {
                self.session = Some(EditSession {
                    buffer: value,
                    field: EditField::Year,
                });
                self.blink_visible = true;
                self.last_blink_toggle = now;
                self.rotary.set_rotary_enabled(true);
                info!("Editing clock, starting from {}", value);
                Transition::EnteredEdit
            }
            Err(e) => {
                warn!("Cannot enter edit mode, clock read failed: {}", e);
                Transition::EnterFailed(e)
            }
        }
    }

    fn adjust(&mut self, delta: i8) -> Transition {
        match self.session.as_mut() {
            Some(session) => {
                session.buffer.adjust(session.field, delta);
                debug!("{} -> {}", session.field.clock_field(), session.buffer);
                Transition::Adjusted(session.field)
            }
            None => Transition::Ignored,
        }
    }

    async fn press_in_edit<C: ClockSource>(&mut self, clock: &mut C) -> Transition {
        let Some(session) = self.session.as_mut() else {
            return Transition::Ignored;
        };
        if session.field != EditField::Second {
            session.field = session.field.next();
            return Transition::Advanced(session.field);
        }

        let buffer = session.buffer;
        match clock.write_clock(buffer).await {
            Ok(()) => {
                self.session = None;
                self.blink_visible = true;
                self.rotary.set_rotary_enabled(false);
                info!("Clock set to {}", buffer);
                Transition::Committed(buffer)
            }
            Err(e) => {
                warn!("Clock write failed, still editing: {}", e);
                Transition::CommitFailed(e)
            }
        }
    }

    /// Drop any edit in progress without writing it and switch rotation off.
    pub fn abandon(&mut self) {
        if self.session.take().is_some() {
            info!("Edit abandoned");
        }
        self.blink_visible = true;
        self.rotary.set_rotary_enabled(false);
    }

    /// Advance the blink phase. Outside edit mode the field is always shown.
    pub fn update_blink(&mut self, now: Instant) {
        if self.session.is_none() {
            self.blink_visible = true;
            self.last_blink_toggle = now;
            return;
        }
        if now.saturating_duration_since(self.last_blink_toggle) >= self.blink_period {
            self.blink_visible = !self.blink_visible;
            self.last_blink_toggle = now;
        }
    }

    /// What the clock rows should show, given the cached chip reading.
    pub fn view<'a>(&'a self, cached: Option<&'a ClockValue>) -> ClockView<'a> {
        match &self.session {
            Some(session) => ClockView::Editing {
                buffer: &session.buffer,
                field: session.field,
                visible: self.blink_visible,
            },
            None => ClockView::Live(cached),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock_value::ClockField;
    use embassy_futures::block_on;

    #[derive(Default)]
    struct Irq {
        enabled: bool,
    }

    impl RotaryIrqControl for Irq {
        fn set_rotary_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }
    }

    struct ScriptedClock {
        value: ClockValue,
        fail_read: bool,
        fail_write: bool,
        writes: std::vec::Vec<ClockValue>,
    }

    impl ScriptedClock {
        fn new() -> Self {
            Self {
                value: ClockValue::from_calendar(2024, 1, 31, 22, 15, 5).unwrap(),
                fail_read: false,
                fail_write: false,
                writes: std::vec::Vec::new(),
            }
        }
    }

    impl ClockSource for ScriptedClock {
        async fn read_clock(&mut self) -> Result<ClockValue, ProtocolError> {
            if self.fail_read {
                return Err(ProtocolError::Range {
                    field: ClockField::Second,
                });
            }
            Ok(self.value)
        }

        async fn write_clock(&mut self, value: ClockValue) -> Result<(), ProtocolError> {
            if self.fail_write {
                return Err(ProtocolError::Transport);
            }
            self.value = value;
            self.writes.push(value);
            Ok(())
        }
    }

    fn machine() -> InteractionStateMachine<Irq> {
        InteractionStateMachine::new(Irq::default(), Duration::from_millis(500))
    }

    fn press(
        sm: &mut InteractionStateMachine<Irq>,
        clock: &mut ScriptedClock,
    ) -> Transition {
        block_on(sm.handle(InputEvent::ButtonDown, clock, Instant::from_millis(0)))
    }

    #[test]
    fn test_seven_presses_rewrite_original_value() {
        let mut sm = machine();
        let mut clock = ScriptedClock::new();
        let original = clock.value;

        assert_eq!(press(&mut sm, &mut clock), Transition::EnteredEdit);
        assert_eq!(sm.mode(), Mode::Edit);
        let session = sm.session().unwrap();
        assert_eq!(session.buffer, original);
        assert_eq!(session.field, EditField::Year);
        assert!(sm.rotary().enabled);

        for field in [
            EditField::Month,
            EditField::Day,
            EditField::Hour,
            EditField::Minute,
            EditField::Second,
        ] {
            assert_eq!(press(&mut sm, &mut clock), Transition::Advanced(field));
        }

        assert_eq!(press(&mut sm, &mut clock), Transition::Committed(original));
        assert_eq!(sm.mode(), Mode::Normal);
        assert_eq!(clock.writes, [original]);
        assert!(!sm.rotary().enabled);
    }

    #[test]
    fn test_rotation_edits_active_field_with_clamping() {
        let mut sm = machine();
        let mut clock = ScriptedClock::new();
        let now = Instant::from_millis(0);
        press(&mut sm, &mut clock);
        press(&mut sm, &mut clock);

        // Month: Jan 31 -> Feb clamps the day to 29 (2024 is a leap year)
        assert_eq!(
            block_on(sm.handle(InputEvent::RotateCw, &mut clock, now)),
            Transition::Adjusted(EditField::Month)
        );
        let buffer = sm.session().unwrap().buffer;
        assert_eq!((buffer.month, buffer.day), (2, 29));

        block_on(sm.handle(InputEvent::RotateCcw, &mut clock, now));
        block_on(sm.handle(InputEvent::RotateCcw, &mut clock, now));
        assert_eq!(sm.session().unwrap().buffer.month, 12);
        // The chip is untouched until commit
        assert!(clock.writes.is_empty());
    }

    #[test]
    fn test_normal_mode_ignores_rotation_and_release() {
        let mut sm = machine();
        let mut clock = ScriptedClock::new();
        let now = Instant::from_millis(0);
        for event in [InputEvent::RotateCw, InputEvent::RotateCcw, InputEvent::ButtonUp] {
            assert_eq!(
                block_on(sm.handle(event, &mut clock, now)),
                Transition::Ignored
            );
        }
        assert_eq!(sm.mode(), Mode::Normal);
    }

    #[test]
    fn test_failed_snapshot_stays_normal() {
        let mut sm = machine();
        let mut clock = ScriptedClock::new();
        clock.fail_read = true;

        assert!(matches!(
            press(&mut sm, &mut clock),
            Transition::EnterFailed(_)
        ));
        assert_eq!(sm.mode(), Mode::Normal);
        assert!(!sm.rotary().enabled);
    }

    #[test]
    fn test_failed_commit_keeps_buffer_and_retries() {
        let mut sm = machine();
        let mut clock = ScriptedClock::new();
        let now = Instant::from_millis(0);
        press(&mut sm, &mut clock);
        for _ in 0..5 {
            press(&mut sm, &mut clock);
        }
        block_on(sm.handle(InputEvent::RotateCw, &mut clock, now));
        let edited = sm.session().unwrap().buffer;
        assert_eq!(edited.second, 6);

        clock.fail_write = true;
        assert_eq!(
            press(&mut sm, &mut clock),
            Transition::CommitFailed(ProtocolError::Transport)
        );
        let session = sm.session().unwrap();
        assert_eq!(session.field, EditField::Second);
        assert_eq!(session.buffer, edited);
        assert!(sm.rotary().enabled);

        clock.fail_write = false;
        assert_eq!(press(&mut sm, &mut clock), Transition::Committed(edited));
        assert_eq!(clock.value, edited);
    }

    #[test]
    fn test_blink_toggles_only_while_editing() {
        let mut sm = machine();
        let mut clock = ScriptedClock::new();
        let t0 = Instant::from_millis(1_000);

        sm.update_blink(t0 + Duration::from_millis(600));
        assert!(sm.blink_visible());

        block_on(sm.handle(InputEvent::ButtonDown, &mut clock, t0));
        sm.update_blink(t0 + Duration::from_millis(450));
        assert!(sm.blink_visible());
        sm.update_blink(t0 + Duration::from_millis(500));
        assert!(!sm.blink_visible());
        assert!(matches!(
            sm.view(None),
            ClockView::Editing { visible: false, .. }
        ));
        sm.update_blink(t0 + Duration::from_millis(1_000));
        assert!(sm.blink_visible());

        // Blinking never touches the buffer
        assert_eq!(sm.session().unwrap().buffer, clock.value);
    }

    #[test]
    fn test_abandon_discards_edit() {
        let mut sm = machine();
        let mut clock = ScriptedClock::new();
        press(&mut sm, &mut clock);
        block_on(sm.handle(InputEvent::RotateCw, &mut clock, Instant::from_millis(0)));

        sm.abandon();
        assert_eq!(sm.mode(), Mode::Normal);
        assert!(!sm.rotary().enabled);
        assert!(clock.writes.is_empty());
    }

    #[test]
    fn test_view_follows_mode() {
        let sm = machine();
        let cached = ClockValue::default();
        assert_eq!(sm.view(Some(&cached)), ClockView::Live(Some(&cached)));
        assert_eq!(sm.view(None), ClockView::Live(None));
    }
}
