//! Pointer drag tracking for the orbit controls.

/// Turns press / move / release into movement deltas while the button is held.
#[derive(Debug, Default)]
pub struct DragTracker {
    pressed: bool,
    last: Option<(f64, f64)>,
}

impl DragTracker {
    pub fn press(&mut self) {
        self.pressed = true;
    }

    pub fn release(&mut self) {
        self.pressed = false;
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.pressed
    }

    /// Record a cursor position. Returns the delta while dragging.
    pub fn moved(&mut self, x: f64, y: f64) -> Option<(f64, f64)> {
        let previous = self.last.replace((x, y));
        if !self.pressed {
            return None;
        }
        previous.map(|(px, py)| (x - px, y - py))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_only_while_pressed() {
        let mut drag = DragTracker::default();
        assert_eq!(drag.moved(10.0, 10.0), None);
        drag.press();
        assert_eq!(drag.moved(15.0, 7.0), Some((5.0, -3.0)));
        assert_eq!(drag.moved(15.0, 7.0), Some((0.0, 0.0)));
        drag.release();
        assert_eq!(drag.moved(30.0, 30.0), None);
        drag.press();
        assert_eq!(drag.moved(31.0, 30.0), Some((1.0, 0.0)));
    }

    #[test]
    fn first_move_after_press_without_history() {
        let mut drag = DragTracker::default();
        drag.press();
        assert!(drag.is_dragging());
        assert_eq!(drag.moved(1.0, 1.0), None);
    }
}
