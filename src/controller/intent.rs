use crate::hardware::FocusPoint;

/// User intents emitted by the control surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlIntent {
    Exit,
    SwitchCamera,
    PrepareForZoom,
    /// Tap to focus, normalized device coordinates
    FocusAt(FocusPoint),
    TakePhoto,
    BeginVideo,
    EndVideo,
    /// Pinch scale relative to the start of the gesture
    ChangeZoom(f64),
}
