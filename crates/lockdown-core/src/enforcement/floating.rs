//! Floating countdown overlay.

use super::effects::Overlay;
use crate::events::Event;
use crate::storage::{FloatingPosition, LockRecord};
use chrono::{DateTime, Utc};
use tracing::warn;

/// `HH:MM:SS`, zero-padded. Hours keep growing past 99.
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Tracks whether the countdown is on screen and at which corner.
#[derive(Debug, Clone, Default)]
pub struct FloatingCountdown {
    shown_at: Option<FloatingPosition>,
}

impl FloatingCountdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Option<FloatingPosition> {
        self.shown_at
    }

    /// Show, update, move or hide the countdown for this tick.
    pub fn refresh<O: Overlay + ?Sized>(
        &mut self,
        record: &LockRecord,
        now_ms: u64,
        overlay: &mut O,
        at: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        let pending = record
            .timer_end_ms
            .filter(|&end| now_ms < end && record.show_floating_timer);

        let Some(end) = pending else {
            self.hide(overlay, at, events);
            return;
        };

        let text = format_hms((end - now_ms) / 1000);
        let position = record.floating_position;

        if self.shown_at.is_some_and(|shown| shown != position) {
            self.hide(overlay, at, events);
        }

        if self.shown_at.is_some() {
            overlay.update_floating(&text);
            return;
        }

        match overlay.show_floating(&text, position) {
            Ok(()) => {
                self.shown_at = Some(position);
                events.push(Event::FloatingShown {
                    text,
                    position,
                    at,
                });
            }
            Err(e) => warn!(error = %e, "floating countdown unavailable"),
        }
    }

    pub fn hide<O: Overlay + ?Sized>(
        &mut self,
        overlay: &mut O,
        at: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        if self.shown_at.take().is_some() {
            overlay.hide_floating();
            events.push(Event::FloatingHidden { at });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcement::effects::{DeviceCall, RecordingDevice};
    use crate::error::EffectError;

    const NOW: u64 = 1_700_000_000_000;

    fn record(end: Option<u64>, show: bool, position: FloatingPosition) -> LockRecord {
        LockRecord {
            timer_end_ms: end,
            show_floating_timer: show,
            floating_position: position,
            ..Default::default()
        }
    }

    fn at() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(NOW as i64).unwrap()
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(59), "00:00:59");
        assert_eq!(format_hms(15 * 60), "00:15:00");
        assert_eq!(format_hms(3 * 3600 + 7 * 60 + 9), "03:07:09");
    }

    #[test]
    fn shows_then_updates_pending_timer() {
        let mut floating = FloatingCountdown::new();
        let mut device = RecordingDevice::new();
        let mut events = Vec::new();
        let rec = record(Some(NOW + 90_500), true, FloatingPosition::TopRight);

        floating.refresh(&rec, NOW, &mut device, at(), &mut events);
        assert_eq!(
            device.floating,
            Some(("00:01:30".to_string(), FloatingPosition::TopRight))
        );

        floating.refresh(&rec, NOW + 1_000, &mut device, at(), &mut events);
        assert_eq!(device.count(&DeviceCall::UpdateFloating("00:01:29".into())), 1);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn hidden_when_disabled_or_no_timer() {
        let mut floating = FloatingCountdown::new();
        let mut device = RecordingDevice::new();
        let mut events = Vec::new();

        floating.refresh(
            &record(Some(NOW + 5_000), false, FloatingPosition::TopLeft),
            NOW,
            &mut device,
            at(),
            &mut events,
        );
        assert!(device.floating.is_none());
        assert!(device.calls.is_empty());

        floating.refresh(
            &record(Some(NOW + 5_000), true, FloatingPosition::TopLeft),
            NOW,
            &mut device,
            at(),
            &mut events,
        );
        floating.refresh(
            &record(None, true, FloatingPosition::TopLeft),
            NOW,
            &mut device,
            at(),
            &mut events,
        );
        assert!(device.floating.is_none());
        assert!(matches!(events.last(), Some(Event::FloatingHidden { .. })));
    }

    #[test]
    fn position_change_forces_reshow() {
        let mut floating = FloatingCountdown::new();
        let mut device = RecordingDevice::new();
        let mut events = Vec::new();

        floating.refresh(
            &record(Some(NOW + 60_000), true, FloatingPosition::TopRight),
            NOW,
            &mut device,
            at(),
            &mut events,
        );
        floating.refresh(
            &record(Some(NOW + 60_000), true, FloatingPosition::BottomLeft),
            NOW,
            &mut device,
            at(),
            &mut events,
        );

        assert_eq!(device.count(&DeviceCall::HideFloating), 1);
        assert_eq!(floating.position(), Some(FloatingPosition::BottomLeft));
        assert_eq!(
            device.floating,
            Some(("00:01:00".to_string(), FloatingPosition::BottomLeft))
        );
    }

    #[test]
    fn failed_show_is_retried_next_tick() {
        let mut floating = FloatingCountdown::new();
        let mut device = RecordingDevice {
            overlay_error: Some(EffectError::PermissionDenied("overlay".into())),
            ..Default::default()
        };
        let mut events = Vec::new();
        let rec = record(Some(NOW + 10_000), true, FloatingPosition::TopRight);

        floating.refresh(&rec, NOW, &mut device, at(), &mut events);
        assert_eq!(floating.position(), None);

        device.overlay_error = None;
        floating.refresh(&rec, NOW + 1_000, &mut device, at(), &mut events);
        assert_eq!(floating.position(), Some(FloatingPosition::TopRight));
        assert_eq!(device.count(&DeviceCall::ShowFloating("00:00:09".into(), FloatingPosition::TopRight)), 1);
    }
}
