use super::DesktopEngine;
use crate::{AutomationError, ScreenFrame};
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use std::process::Command;
use tracing::{debug, info};

/// Engine backed by the real desktop: `xcap` for capture, `enigo` for
/// pointer and keyboard synthesis, and the platform opener for URLs.
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Result<Self, AutomationError> {
        Ok(Self)
    }

    // Enigo is not shareable across threads, so a fresh handle is created
    // per operation.
    fn enigo() -> Result<Enigo, AutomationError> {
        Enigo::new(&Settings::default()).map_err(|e| {
            AutomationError::PlatformError(format!("Failed to initialize input backend: {e}"))
        })
    }

    fn parse_combo(combo: &str) -> Result<(Vec<Key>, Key), AutomationError> {
        let mut modifiers = Vec::new();
        let mut terminal = None;
        for part in combo.split('+') {
            let token = part.trim().to_lowercase();
            match token.as_str() {
                "ctrl" | "control" => modifiers.push(Key::Control),
                "alt" => modifiers.push(Key::Alt),
                "shift" => modifiers.push(Key::Shift),
                "super" | "cmd" | "win" | "meta" => modifiers.push(Key::Meta),
                "delete" | "del" => terminal = Some(Key::Delete),
                "tab" => terminal = Some(Key::Tab),
                "enter" | "return" => terminal = Some(Key::Return),
                "escape" | "esc" => terminal = Some(Key::Escape),
                "backspace" => terminal = Some(Key::Backspace),
                "space" => terminal = Some(Key::Space),
                _ => {
                    let mut chars = token.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => terminal = Some(Key::Unicode(c)),
                        _ => {
                            return Err(AutomationError::InvalidArgument(format!(
                                "Unsupported key token '{part}' in combo '{combo}'"
                            )))
                        }
                    }
                }
            }
        }
        let terminal = terminal.ok_or_else(|| {
            AutomationError::InvalidArgument(format!("Key combo '{combo}' has no terminal key"))
        })?;
        Ok((modifiers, terminal))
    }
}

#[async_trait::async_trait]
impl DesktopEngine for NativeEngine {
    async fn capture_screen(&self) -> Result<ScreenFrame, AutomationError> {
        let monitors = xcap::Monitor::all()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to get monitors: {e}")))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .ok_or_else(|| AutomationError::PlatformError("No monitor found".to_string()))?;
        let image = monitor.capture_image().map_err(|e| {
            AutomationError::PlatformError(format!("Failed to capture monitor: {e}"))
        })?;
        debug!(
            width = image.width(),
            height = image.height(),
            "captured primary monitor"
        );
        Ok(ScreenFrame::from_rgba(image))
    }

    fn move_pointer(&self, x: i32, y: i32) -> Result<(), AutomationError> {
        Self::enigo()?
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| AutomationError::PlatformError(format!("Failed to move mouse: {e}")))
    }

    fn click(&self) -> Result<(), AutomationError> {
        Self::enigo()?
            .button(Button::Left, Direction::Click)
            .map_err(|e| AutomationError::PlatformError(format!("Failed to click: {e}")))
    }

    fn press_key(&self, combo: &str) -> Result<(), AutomationError> {
        let (modifiers, terminal) = Self::parse_combo(combo)?;
        let mut enigo = Self::enigo()?;
        for m in &modifiers {
            enigo.key(*m, Direction::Press).map_err(|e| {
                AutomationError::PlatformError(format!("Failed to press modifier: {e}"))
            })?;
        }
        let result = enigo.key(terminal, Direction::Click);
        // Modifiers are released on every path so a failed combo cannot
        // leave a stuck key behind.
        for m in modifiers.iter().rev() {
            let _ = enigo.key(*m, Direction::Release);
        }
        result.map_err(|e| AutomationError::PlatformError(format!("Failed to press key: {e}")))
    }

    fn open_url(&self, url: &str, browser: Option<&str>) -> Result<(), AutomationError> {
        info!(url, ?browser, "opening target surface");
        let mut command = match browser {
            Some(program) => {
                let mut c = Command::new(program);
                c.arg(url);
                c
            }
            None => {
                #[cfg(target_os = "windows")]
                {
                    let mut c = Command::new("cmd");
                    c.args(["/C", "start", "", url]);
                    c
                }
                #[cfg(target_os = "macos")]
                {
                    let mut c = Command::new("open");
                    c.arg(url);
                    c
                }
                #[cfg(not(any(target_os = "windows", target_os = "macos")))]
                {
                    let mut c = Command::new("xdg-open");
                    c.arg(url);
                    c
                }
            }
        };
        command
            .spawn()
            .map(|_| ())
            .map_err(|e| AutomationError::PlatformError(format!("Failed to open '{url}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modifier_combos() {
        let (mods, key) = NativeEngine::parse_combo("ctrl+v").unwrap();
        assert_eq!(mods.len(), 1);
        assert!(matches!(key, Key::Unicode('v')));

        let (mods, key) = NativeEngine::parse_combo("alt+tab").unwrap();
        assert_eq!(mods.len(), 1);
        assert!(matches!(key, Key::Tab));
    }

    #[test]
    fn parses_bare_named_keys() {
        let (mods, key) = NativeEngine::parse_combo("delete").unwrap();
        assert!(mods.is_empty());
        assert!(matches!(key, Key::Delete));
    }

    #[test]
    fn rejects_modifier_only_and_unknown_tokens() {
        assert!(NativeEngine::parse_combo("ctrl").is_err());
        assert!(NativeEngine::parse_combo("ctrl+f13").is_err());
    }
}
