use egui::{Pos2, PointerButton, TouchPhase};

/// Which device produced a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    Touch(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
    Leave,
}

/// A platform pointer or touch sample in device coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub position: Pos2,
    pub source: PointerSource,
}

impl PointerEvent {
    pub fn mouse(phase: PointerPhase, position: Pos2) -> Self {
        Self {
            phase,
            position,
            source: PointerSource::Mouse,
        }
    }

    pub fn touch(id: u64, phase: PointerPhase, position: Pos2) -> Self {
        Self {
            phase,
            position,
            source: PointerSource::Touch(id),
        }
    }
}

/// What the annotator has to do in response to a routed event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeAction {
    /// Start a trace at a surface-local point
    Begin(Pos2),
    /// Extend the active trace
    Extend { from: Pos2, to: Pos2 },
    /// The stroke ended; replay and export
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RouterState {
    Idle,
    Drawing { source: PointerSource, last: Pos2 },
}

/// Turns pointer events into stroke actions.
///
/// Idle -> Drawing on `Down` (unless disabled); Drawing -> Idle on
/// `Up`, `Cancel` or `Leave` from the same source.
#[derive(Debug, Clone)]
pub struct InputRouter {
    state: RouterState,
    origin: Pos2,
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new(Pos2::ZERO)
    }
}

impl InputRouter {
    pub fn new(origin: Pos2) -> Self {
        Self {
            state: RouterState::Idle,
            origin,
        }
    }

    /// Device coordinates of the surface's top-left corner
    pub fn set_origin(&mut self, origin: Pos2) {
        self.origin = origin;
    }

    pub fn origin(&self) -> Pos2 {
        self.origin
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, RouterState::Drawing { .. })
    }

    /// Drop any stroke in progress without finishing it
    pub fn reset(&mut self) {
        self.state = RouterState::Idle;
    }

    fn to_local(&self, device: Pos2) -> Pos2 {
        (device - self.origin).to_pos2()
    }

    pub fn route(&mut self, event: PointerEvent, disabled: bool) -> Option<StrokeAction> {
        match (self.state, event.phase) {
            (RouterState::Idle, PointerPhase::Down) if !disabled => {
                let point = self.to_local(event.position);
                self.state = RouterState::Drawing {
                    source: event.source,
                    last: point,
                };
                Some(StrokeAction::Begin(point))
            }
            (RouterState::Drawing { source, last }, PointerPhase::Move) if source == event.source => {
                let point = self.to_local(event.position);
                self.state = RouterState::Drawing { source, last: point };
                Some(StrokeAction::Extend { from: last, to: point })
            }
            (
                RouterState::Drawing { source, .. },
                PointerPhase::Up | PointerPhase::Cancel | PointerPhase::Leave,
            ) if source == event.source => {
                self.state = RouterState::Idle;
                Some(StrokeAction::Finish)
            }
            _ => None,
        }
    }
}

/// Collects egui input into [`PointerEvent`]s
#[derive(Debug, Default)]
pub struct InputHandler {
    last_pointer_pos: Option<Pos2>,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one frame's raw events; only the primary button draws
    pub fn process_events(&mut self, events: &[egui::Event]) -> Vec<PointerEvent> {
        let mut out = Vec::new();
        for event in events {
            match event {
                egui::Event::PointerMoved(pos) => {
                    self.last_pointer_pos = Some(*pos);
                    out.push(PointerEvent::mouse(PointerPhase::Move, *pos));
                }
                egui::Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed,
                    ..
                } => {
                    self.last_pointer_pos = Some(*pos);
                    let phase = if *pressed { PointerPhase::Down } else { PointerPhase::Up };
                    out.push(PointerEvent::mouse(phase, *pos));
                }
                egui::Event::PointerGone => {
                    if let Some(pos) = self.last_pointer_pos.take() {
                        out.push(PointerEvent::mouse(PointerPhase::Leave, pos));
                    }
                }
                egui::Event::Touch { id, phase, pos, .. } => {
                    let phase = match phase {
                        TouchPhase::Start => PointerPhase::Down,
                        TouchPhase::Move => PointerPhase::Move,
                        TouchPhase::End => PointerPhase::Up,
                        TouchPhase::Cancel => PointerPhase::Cancel,
                    };
                    out.push(PointerEvent::touch(id.0, phase, *pos));
                }
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_down_move_up_cycle() {
        let mut router = InputRouter::new(Pos2::new(100.0, 50.0));

        let begin = router.route(PointerEvent::mouse(PointerPhase::Down, Pos2::new(110.0, 60.0)), false);
        assert_eq!(begin, Some(StrokeAction::Begin(Pos2::new(10.0, 10.0))));
        assert!(router.is_drawing());

        let extend = router.route(PointerEvent::mouse(PointerPhase::Move, Pos2::new(120.0, 70.0)), false);
        assert_eq!(
            extend,
            Some(StrokeAction::Extend {
                from: Pos2::new(10.0, 10.0),
                to: Pos2::new(20.0, 20.0)
            })
        );

        let finish = router.route(PointerEvent::mouse(PointerPhase::Up, Pos2::new(120.0, 70.0)), false);
        assert_eq!(finish, Some(StrokeAction::Finish));
        assert!(!router.is_drawing());
    }

    #[test]
    fn test_disabled_blocks_down() {
        let mut router = InputRouter::default();
        assert_eq!(router.route(PointerEvent::mouse(PointerPhase::Down, Pos2::ZERO), true), None);
        assert_eq!(router.route(PointerEvent::mouse(PointerPhase::Move, Pos2::new(1.0, 1.0)), true), None);
        assert!(!router.is_drawing());
    }

    #[test]
    fn test_moves_while_idle_are_ignored() {
        let mut router = InputRouter::default();
        assert_eq!(router.route(PointerEvent::mouse(PointerPhase::Move, Pos2::ZERO), false), None);
        assert_eq!(router.route(PointerEvent::mouse(PointerPhase::Up, Pos2::ZERO), false), None);
    }

    #[test]
    fn test_leave_and_cancel_finish_stroke() {
        for phase in [PointerPhase::Leave, PointerPhase::Cancel] {
            let mut router = InputRouter::default();
            router.route(PointerEvent::mouse(PointerPhase::Down, Pos2::ZERO), false);
            assert_eq!(router.route(PointerEvent::mouse(phase, Pos2::ZERO), false), Some(StrokeAction::Finish));
        }
    }

    #[test]
    fn test_other_source_cannot_extend() {
        let mut router = InputRouter::default();
        router.route(PointerEvent::touch(1, PointerPhase::Down, Pos2::ZERO), false);
        assert_eq!(router.route(PointerEvent::touch(2, PointerPhase::Move, Pos2::new(5.0, 5.0)), false), None);
        assert_eq!(router.route(PointerEvent::mouse(PointerPhase::Up, Pos2::ZERO), false), None);
        assert_eq!(
            router.route(PointerEvent::touch(1, PointerPhase::Up, Pos2::ZERO), false),
            Some(StrokeAction::Finish)
        );
    }

    #[test]
    fn test_disabled_does_not_interrupt_active_stroke() {
        let mut router = InputRouter::default();
        router.route(PointerEvent::mouse(PointerPhase::Down, Pos2::ZERO), false);
        assert!(matches!(
            router.route(PointerEvent::mouse(PointerPhase::Move, Pos2::new(3.0, 4.0)), true),
            Some(StrokeAction::Extend { .. })
        ));
    }

    #[test]
    fn test_handler_translates_egui_events() {
        let mut handler = InputHandler::new();
        let events = vec![
            egui::Event::PointerButton {
                pos: Pos2::new(1.0, 2.0),
                button: PointerButton::Primary,
                pressed: true,
                modifiers: egui::Modifiers::default(),
            },
            egui::Event::PointerMoved(Pos2::new(3.0, 4.0)),
            egui::Event::PointerButton {
                pos: Pos2::new(3.0, 4.0),
                button: PointerButton::Secondary,
                pressed: false,
                modifiers: egui::Modifiers::default(),
            },
            egui::Event::PointerGone,
        ];

        let phases: Vec<PointerPhase> = handler.process_events(&events).iter().map(|e| e.phase).collect();
        assert_eq!(phases, vec![PointerPhase::Down, PointerPhase::Move, PointerPhase::Leave]);
    }
}
