// ABOUTME: Type-specific job payloads for ROI, OCR, Input, System and Calculate jobs
// ABOUTME: Each payload declares its `returns` aliases and reports missing nested sections

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::expression::Expression;
use crate::logging::LogLevel;

/// Alias -> source variable name.
pub type Returns = IndexMap<String, String>;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

// ROI

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoiAction {
    MoveMouse,
    DetectOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiImage {
    pub path: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiWindow {
    pub title: Option<String>,
    pub class_name: Option<String>,
    pub process: Option<String>,
    #[serde(default = "default_true")]
    pub allow_overlay: bool,
    #[serde(default)]
    pub allow_out_of_screen: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoiDebug {
    #[serde(default)]
    pub display_screenshot: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiPayload {
    #[serde(rename = "type")]
    pub action: RoiAction,
    pub image: RoiImage,
    pub window: Option<RoiWindow>,
    pub region: Option<Region>,
    /// Mouse travel time in milliseconds for `MoveMouse`.
    pub duration: Option<u64>,
    pub debug: Option<RoiDebug>,
    #[serde(default)]
    pub returns: Returns,
}

// OCR

/// Placeholder payload; recognition itself is supplied by a registered executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPayload {
    pub region: Option<Region>,
    pub language: Option<String>,
    #[serde(default)]
    pub returns: Returns,
}

// Input

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputAction {
    Mouse,
    Keyboard,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseAction {
    Press,
    Release,
    Click,
    Move,
    Drag,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseInput {
    #[serde(rename = "type")]
    pub action: MouseAction,
    #[serde(default)]
    pub button: MouseButton,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
    #[serde(default)]
    pub duration: u64,
    #[serde(default = "default_true")]
    pub relative: bool,
    #[serde(default)]
    pub returns: Returns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAction {
    Press,
    Release,
    Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardInput {
    #[serde(rename = "type")]
    pub action: KeyAction,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub sep_time: u64,
    #[serde(default)]
    pub returns: Returns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInput {
    pub message: String,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub returns: Returns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPayload {
    #[serde(rename = "type")]
    pub action: InputAction,
    pub mouse: Option<MouseInput>,
    pub keyboard: Option<KeyboardInput>,
    pub text: Option<TextInput>,
    #[serde(default)]
    pub background: bool,
    #[serde(default = "default_true")]
    pub focus: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub process: String,
    #[serde(default = "default_true")]
    pub visible_only: bool,
    #[serde(default)]
    pub exact_match: bool,
}

impl InputPayload {
    /// Name of the sub-section required by `type` when it is absent.
    pub fn missing_section(&self) -> Option<&'static str> {
        match self.action {
            InputAction::Mouse if self.mouse.is_none() => Some("input.mouse"),
            InputAction::Keyboard if self.keyboard.is_none() => Some("input.keyboard"),
            InputAction::Text if self.text.is_none() => Some("input.text"),
            _ => None,
        }
    }

    /// Aliases declared on the active sub-payload.
    pub fn returns(&self) -> Option<&Returns> {
        match self.action {
            InputAction::Mouse => self.mouse.as_ref().map(|m| &m.returns),
            InputAction::Keyboard => self.keyboard.as_ref().map(|k| &k.returns),
            InputAction::Text => self.text.as_ref().map(|t| &t.returns),
        }
    }
}

// System

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemAction {
    Delay,
    Paste,
    Log,
    Command,
}

impl SystemAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemAction::Delay => "Delay",
            SystemAction::Paste => "Paste",
            SystemAction::Log => "Log",
            SystemAction::Command => "Command",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLog {
    pub message: String,
    pub levels: Vec<LogLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_true")]
    pub shell: bool,
    #[serde(default = "default_true")]
    pub wait: bool,
    pub cwd: Option<String>,
    pub env: Option<IndexMap<String, String>>,
    /// A non-zero exit status does not fail the job.
    #[serde(default)]
    pub ignore: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemPayload {
    #[serde(rename = "type")]
    pub action: SystemAction,
    #[serde(default)]
    pub duration: u64,
    pub log: Option<SystemLog>,
    pub command: Option<SystemCommand>,
    #[serde(default)]
    pub returns: Returns,
}

impl SystemPayload {
    pub fn missing_section(&self) -> Option<&'static str> {
        match self.action {
            SystemAction::Log if self.log.is_none() => Some("system.log"),
            SystemAction::Command if self.command.is_none() => Some("system.command"),
            _ => None,
        }
    }
}

// Calculate

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatePayload {
    pub expressions: IndexMap<String, Expression>,
    #[serde(default)]
    pub variables: IndexMap<String, f64>,
    #[serde(default)]
    pub returns: Returns,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_defaults_and_returns() {
        let payload: InputPayload = serde_json::from_value(json!({
            "type": "Mouse",
            "mouse": {"type": "Click", "x": 10, "y": 20, "returns": {"px": "x"}}
        }))
        .unwrap();

        assert!(payload.focus);
        assert!(payload.visible_only);
        assert!(!payload.background);
        let mouse = payload.mouse.as_ref().unwrap();
        assert_eq!(mouse.button, MouseButton::Left);
        assert!(mouse.relative);
        assert_eq!(payload.returns().unwrap()["px"], "x");
        assert_eq!(payload.missing_section(), None);
    }

    #[test]
    fn test_missing_sections() {
        let payload: InputPayload =
            serde_json::from_value(json!({"type": "Keyboard"})).unwrap();
        assert_eq!(payload.missing_section(), Some("input.keyboard"));

        let payload: SystemPayload = serde_json::from_value(json!({"type": "Command"})).unwrap();
        assert_eq!(payload.missing_section(), Some("system.command"));
    }

    #[test]
    fn test_system_command_defaults() {
        let payload: SystemPayload = serde_json::from_value(json!({
            "type": "Command",
            "command": {"command": "echo", "args": ["hi"]}
        }))
        .unwrap();
        let command = payload.command.unwrap();
        assert!(command.shell);
        assert!(command.wait);
        assert!(!command.ignore);
        assert_eq!(command.args, vec!["hi"]);
    }

    #[test]
    fn test_calculate_keeps_expression_order() {
        let payload: CalculatePayload = serde_json::from_value(json!({
            "expressions": {"z": "1 + 1", "a": 3, "m": "z * a"}
        }))
        .unwrap();
        let keys: Vec<_> = payload.expressions.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(payload.expressions["a"], Expression::Number(3.0));
    }
}
