//! Hovercard support: placement around an anchor rect and the show/hide
//! debounce timers.
//!
//! Placement is pure geometry: given the hovered target's rect, the card's
//! size, and the viewport, try the preferred compass position and fall back
//! through the others until the card fits. The timer half debounces pointer
//! churn so the card neither flickers in on a fly-by nor vanishes while the
//! pointer crosses the gap between target and card.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Gap between the target and the card, in logical pixels.
pub const HOVERCARD_OFFSET: f32 = 4.0;

/// Delay before a scheduled card becomes visible.
pub const SHOW_DELAY: Duration = Duration::from_millis(550);

/// Delay before a visible card hides after the pointer leaves.
pub const HIDE_DELAY: Duration = Duration::from_millis(500);

/// Compass position of the card relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Positions tried, in order, when the preferred one does not fit.
pub const FALLBACK_ORDER: [Position; 8] = [
    Position::Right,
    Position::BottomRight,
    Position::TopRight,
    Position::Bottom,
    Position::Top,
    Position::BottomLeft,
    Position::TopLeft,
    Position::Left,
];

/// Axis-aligned rect, origin at top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.x
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.origin.x >= self.origin.x
            && other.origin.y >= self.origin.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A resolved placement: where the card goes and which position won.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin: Vec2,
    pub position: Position,
}

/// Card origin for one compass position. Plain sides center the card along
/// the shared axis; diagonals align the card's edge with the target's.
fn origin_for(target: &Rect, card: Vec2, position: Position) -> Vec2 {
    let centered_x = target.origin.x + (target.size.x - card.x) / 2.0;
    let centered_y = target.origin.y + (target.size.y - card.y) / 2.0;
    let left_of = target.origin.x - card.x - HOVERCARD_OFFSET;
    let right_of = target.right() + HOVERCARD_OFFSET;
    let above = target.origin.y - card.y - HOVERCARD_OFFSET;
    let below = target.bottom() + HOVERCARD_OFFSET;
    match position {
        Position::Top => Vec2::new(centered_x, above),
        Position::Bottom => Vec2::new(centered_x, below),
        Position::Left => Vec2::new(left_of, centered_y),
        Position::Right => Vec2::new(right_of, centered_y),
        Position::TopRight => Vec2::new(right_of, target.bottom() - card.y),
        Position::BottomRight => Vec2::new(right_of, target.origin.y),
        Position::TopLeft => Vec2::new(left_of, target.bottom() - card.y),
        Position::BottomLeft => Vec2::new(left_of, target.origin.y),
    }
}

/// Places the card: the preferred position if it fits the viewport, then the
/// fallback order. When nothing fits, the last position tried wins.
pub fn place(target: &Rect, card: Vec2, viewport: &Rect, preferred: Position) -> Placement {
    let mut last = Placement {
        origin: origin_for(target, card, preferred),
        position: preferred,
    };
    let candidates =
        std::iter::once(preferred).chain(FALLBACK_ORDER.iter().copied().filter(|p| *p != preferred));
    for position in candidates {
        let origin = origin_for(target, card, position);
        let rect = Rect { origin, size: card };
        if viewport.contains_rect(&rect) {
            return Placement { origin, position };
        }
        last = Placement { origin, position };
    }
    log::warn!("hovercard does not fit the viewport in any position");
    last
}

/// Visibility phases of one hovercard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverPhase {
    Hidden,
    ScheduledShow,
    Showing,
    ScheduledHide,
}

struct TimerInner {
    phase: Mutex<HoverPhase>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// Debounced show/hide state machine. Must live on a tokio runtime; the
/// delayed transitions run as spawned tasks.
#[derive(Clone)]
pub struct HoverTimer {
    inner: Arc<TimerInner>,
}

impl HoverTimer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TimerInner {
                phase: Mutex::new(HoverPhase::Hidden),
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn phase(&self) -> HoverPhase {
        *self.inner.phase.lock()
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.phase(), HoverPhase::Showing | HoverPhase::ScheduledHide)
    }

    /// Pointer entered the target.
    pub fn target_entered(&self) {
        let mut phase = self.inner.phase.lock();
        match *phase {
            HoverPhase::Hidden => {
                *phase = HoverPhase::ScheduledShow;
                drop(phase);
                self.schedule(SHOW_DELAY, HoverPhase::ScheduledShow, HoverPhase::Showing);
            }
            HoverPhase::ScheduledHide => {
                *phase = HoverPhase::Showing;
                drop(phase);
                self.cancel_pending();
            }
            // A pending show keeps its original timer.
            HoverPhase::ScheduledShow | HoverPhase::Showing => {}
        }
    }

    /// Pointer left the target.
    pub fn target_left(&self) {
        let mut phase = self.inner.phase.lock();
        match *phase {
            HoverPhase::ScheduledShow => {
                *phase = HoverPhase::Hidden;
                drop(phase);
                self.cancel_pending();
            }
            HoverPhase::Showing => {
                *phase = HoverPhase::ScheduledHide;
                drop(phase);
                self.schedule(HIDE_DELAY, HoverPhase::ScheduledHide, HoverPhase::Hidden);
            }
            HoverPhase::Hidden | HoverPhase::ScheduledHide => {}
        }
    }

    /// Pointer entered the card itself; a pending hide is cancelled so the
    /// card survives the crossing.
    pub fn card_entered(&self) {
        let mut phase = self.inner.phase.lock();
        if *phase == HoverPhase::ScheduledHide {
            *phase = HoverPhase::Showing;
            drop(phase);
            self.cancel_pending();
        }
    }

    /// Pointer left the card.
    pub fn card_left(&self) {
        self.target_left();
    }

    /// The target was clicked: dismiss immediately, no debounce.
    pub fn target_clicked(&self) {
        *self.inner.phase.lock() = HoverPhase::Hidden;
        self.cancel_pending();
    }

    fn schedule(&self, delay: Duration, expected: HoverPhase, next: HoverPhase) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut phase = inner.phase.lock();
            if *phase == expected {
                *phase = next;
            }
        });
        if let Some(previous) = self.inner.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self.inner.pending.lock().take() {
            handle.abort();
        }
    }
}

impl Default for HoverTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerInner {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, sleep};

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 800.0)
    }

    #[test]
    fn preferred_position_wins_when_it_fits() {
        let target = Rect::new(400.0, 300.0, 80.0, 20.0);
        let placement = place(&target, Vec2::new(200.0, 100.0), &viewport(), Position::Bottom);
        assert_eq!(placement.position, Position::Bottom);
        assert_eq!(placement.origin.y, 320.0 + HOVERCARD_OFFSET);
        // Centered horizontally over the target.
        assert_eq!(placement.origin.x, 340.0);
    }

    #[test]
    fn falls_back_when_preferred_overflows() {
        // Target at the right edge: every rightward or centered position
        // overflows, so the first leftward fallback wins.
        let target = Rect::new(950.0, 300.0, 40.0, 20.0);
        let placement = place(&target, Vec2::new(200.0, 100.0), &viewport(), Position::Right);
        assert_eq!(placement.position, Position::BottomLeft);
    }

    #[test]
    fn nothing_fits_keeps_last_fallback() {
        let target = Rect::new(0.0, 0.0, 10.0, 10.0);
        let placement = place(
            &target,
            Vec2::new(5000.0, 5000.0),
            &viewport(),
            Position::Right,
        );
        assert_eq!(placement.position, Position::Left);
    }

    #[test]
    fn diagonal_aligns_card_edge_with_target() {
        let target = Rect::new(100.0, 700.0, 80.0, 20.0);
        let placement = place(
            &target,
            Vec2::new(200.0, 150.0),
            &viewport(),
            Position::TopRight,
        );
        assert_eq!(placement.position, Position::TopRight);
        assert_eq!(placement.origin.x, target.right() + HOVERCARD_OFFSET);
        assert_eq!(placement.origin.y, target.bottom() - 150.0);
    }

    #[tokio::test(start_paused = true)]
    async fn show_waits_for_the_delay() {
        let timer = HoverTimer::new();
        timer.target_entered();
        assert_eq!(timer.phase(), HoverPhase::ScheduledShow);
        assert!(!timer.is_visible());
        sleep(SHOW_DELAY + Duration::from_millis(10)).await;
        assert_eq!(timer.phase(), HoverPhase::Showing);
        assert!(timer.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn quick_fly_by_never_shows() {
        let timer = HoverTimer::new();
        timer.target_entered();
        advance(Duration::from_millis(100)).await;
        timer.target_left();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.phase(), HoverPhase::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn crossing_to_the_card_cancels_the_hide() {
        let timer = HoverTimer::new();
        timer.target_entered();
        sleep(SHOW_DELAY + Duration::from_millis(10)).await;
        timer.target_left();
        assert_eq!(timer.phase(), HoverPhase::ScheduledHide);
        assert!(timer.is_visible());
        advance(Duration::from_millis(100)).await;
        timer.card_entered();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.phase(), HoverPhase::Showing);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_hides_after_the_delay() {
        let timer = HoverTimer::new();
        timer.target_entered();
        sleep(SHOW_DELAY + Duration::from_millis(10)).await;
        timer.target_left();
        sleep(HIDE_DELAY + Duration::from_millis(10)).await;
        assert_eq!(timer.phase(), HoverPhase::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn click_dismisses_immediately() {
        let timer = HoverTimer::new();
        timer.target_entered();
        sleep(SHOW_DELAY + Duration::from_millis(10)).await;
        assert!(timer.is_visible());
        timer.target_clicked();
        assert_eq!(timer.phase(), HoverPhase::Hidden);
        // The aborted hide task must not resurrect anything.
        sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.phase(), HoverPhase::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn reentering_during_scheduled_hide_keeps_it_visible() {
        let timer = HoverTimer::new();
        timer.target_entered();
        sleep(SHOW_DELAY + Duration::from_millis(10)).await;
        timer.target_left();
        advance(Duration::from_millis(400)).await;
        timer.target_entered();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.phase(), HoverPhase::Showing);
    }
}
