//! Primary-pointer capture with tap/drag discrimination.

use crate::math::Vector2;

/// Movement in CSS pixels before a press becomes a drag.
pub const DRAG_THRESHOLD: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Vector2),
    Move(Vector2),
    Up(Vector2),
    Cancel,
    /// Movement without capture.
    Hover(Vector2),
    DragStart(Vector2),
    DragMove { pos: Vector2, delta: Vector2 },
    DragEnd(Vector2),
    /// Released without crossing the drag threshold.
    Tap(Vector2),
}

#[derive(Debug, Clone, Copy)]
struct Capture {
    start: Vector2,
    last: Vector2,
    dragging: bool,
}

#[derive(Debug, Default)]
pub struct Pointer {
    capture: Option<Capture>,
}

impl Pointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_captured(&self) -> bool {
        self.capture.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.capture.is_some_and(|c| c.dragging)
    }

    pub fn down(&mut self, pos: Vector2) -> Vec<PointerEvent> {
        let mut out = Vec::new();
        if self.capture.is_some() {
            out.extend(self.cancel());
        }
        self.capture = Some(Capture {
            start: pos,
            last: pos,
            dragging: false,
        });
        out.push(PointerEvent::Down(pos));
        out
    }

    pub fn moved(&mut self, pos: Vector2) -> Vec<PointerEvent> {
        let Some(cap) = &mut self.capture else {
            return vec![PointerEvent::Hover(pos)];
        };

        let mut out = vec![PointerEvent::Move(pos)];
        if !cap.dragging && cap.start.distance(pos) >= DRAG_THRESHOLD {
            cap.dragging = true;
            out.push(PointerEvent::DragStart(cap.start));
            // The movement accumulated below the threshold is not lost.
            cap.last = cap.start;
        }
        if cap.dragging {
            out.push(PointerEvent::DragMove {
                pos,
                delta: pos - cap.last,
            });
        }
        cap.last = pos;
        out
    }

    pub fn up(&mut self, pos: Vector2) -> Vec<PointerEvent> {
        let Some(cap) = self.capture.take() else {
            return Vec::new();
        };
        let mut out = vec![PointerEvent::Up(pos)];
        out.push(if cap.dragging {
            PointerEvent::DragEnd(pos)
        } else {
            PointerEvent::Tap(pos)
        });
        out
    }

    /// Releases capture without a tap.
    pub fn cancel(&mut self) -> Vec<PointerEvent> {
        match self.capture.take() {
            Some(cap) if cap.dragging => vec![PointerEvent::Cancel, PointerEvent::DragEnd(cap.last)],
            Some(_) => vec![PointerEvent::Cancel],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> Vector2 {
        Vector2::new(x, y)
    }

    #[test]
    fn short_press_is_a_tap() {
        let mut p = Pointer::new();
        p.down(v(10.0, 10.0));
        let ev = p.moved(v(12.0, 11.0));
        assert_eq!(ev, vec![PointerEvent::Move(v(12.0, 11.0))]);
        let ev = p.up(v(12.0, 11.0));
        assert_eq!(ev, vec![PointerEvent::Up(v(12.0, 11.0)), PointerEvent::Tap(v(12.0, 11.0))]);
        assert!(!p.is_captured());
    }

    #[test]
    fn crossing_the_threshold_starts_a_drag() {
        let mut p = Pointer::new();
        p.down(v(0.0, 0.0));
        let ev = p.moved(v(5.0, 0.0));
        assert_eq!(
            ev,
            vec![
                PointerEvent::Move(v(5.0, 0.0)),
                PointerEvent::DragStart(v(0.0, 0.0)),
                PointerEvent::DragMove {
                    pos: v(5.0, 0.0),
                    delta: v(5.0, 0.0)
                },
            ]
        );
        assert!(p.is_dragging());
        let ev = p.moved(v(8.0, 1.0));
        assert_eq!(ev[1], PointerEvent::DragMove { pos: v(8.0, 1.0), delta: v(3.0, 1.0) });
        assert_eq!(p.up(v(8.0, 1.0))[1], PointerEvent::DragEnd(v(8.0, 1.0)));
    }

    #[test]
    fn hover_without_capture_and_cancel_releases() {
        let mut p = Pointer::new();
        assert_eq!(p.moved(v(1.0, 1.0)), vec![PointerEvent::Hover(v(1.0, 1.0))]);
        assert!(p.cancel().is_empty());
        p.down(v(0.0, 0.0));
        assert_eq!(p.cancel(), vec![PointerEvent::Cancel]);
        assert!(p.up(v(0.0, 0.0)).is_empty());
    }
}
