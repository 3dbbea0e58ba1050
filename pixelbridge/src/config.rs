use crate::AutomationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Rules always pasted ahead of the payload so the remote surface answers
/// in a machine-consumable shape.
pub const DEFAULT_INSTRUCTION_TEXT: &str = "Please follow these rules: For each response, you must use one of the available tools formatted in proper XML tags. Tools include attempt_completion, ask_followup_question, read_file, write_to_file, search_files, list_files, execute_command, and list_code_definition_names. Do not respond conversationally - only use tool commands. Format any code you generate with proper indentation and line breaks, as you would in a standard code editor. Disregard any previous instructions about generating code in a single line or avoiding newline characters.";

/// Extra rules pasted when the bridge runs unattended.
pub const DEFAULT_AUTORUN_TEXT: &str = "You are set to autorun mode which means you cant use attempt completion or ask follow up questions, you can only write code and use terminal, so if you need something like a database or something, work it out yourself. Dont run anything in terminal that asks for input after you have run the command. And only write 1 command at a time, dont even try to join 2 commands together with an & symbol.";

/// A post-completion dialog to click through, by template name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupCandidate {
    pub template: String,
    pub clicks: u32,
}

impl FollowupCandidate {
    fn new(template: &str, clicks: u32) -> Self {
        Self {
            template: template.to_string(),
            clicks,
        }
    }
}

/// Template names for each workflow checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointNames {
    /// Input surface ready, empty.
    pub ready: String,
    /// Input surface ready but holding stale content that must be cleared.
    pub ready_stale: String,
    pub submit: String,
    pub success: String,
    pub error: String,
    pub copy: String,
    /// Post-completion dialogs, in precedence order. The terminal entry is
    /// a zero-click sentinel so the sweep ends without acting.
    pub followups: Vec<FollowupCandidate>,
}

impl Default for CheckpointNames {
    fn default() -> Self {
        Self {
            ready: "ready".to_string(),
            ready_stale: "ready-stale".to_string(),
            submit: "submit".to_string(),
            success: "success".to_string(),
            error: "error".to_string(),
            copy: "copy".to_string(),
            followups: vec![
                FollowupCandidate::new("save", 1),
                FollowupCandidate::new("run-command", 1),
                FollowupCandidate::new("resume", 1),
                FollowupCandidate::new("approve", 1),
                FollowupCandidate::new("proceed", 1),
                FollowupCandidate::new("proceed-alt", 1),
                FollowupCandidate::new("start-new-task", 0),
            ],
        }
    }
}

/// Everything the orchestrator needs to drive one deployment of the
/// remote surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// URL of the remote chat surface.
    pub target_url: String,
    /// Browser program to open it with; `None` uses the platform default.
    pub browser: Option<String>,
    /// Unattended mode: inject the autorun rules and sweep follow-up
    /// dialogs after completion.
    pub autorun: bool,
    /// Directory of base-resolution template assets.
    pub asset_dir: PathBuf,
    /// Alternate-resolution asset directories, in probe order.
    pub alt_asset_dirs: Vec<PathBuf>,
    /// Match threshold used when a template carries no override.
    pub default_confidence: f32,
    /// Minimum spacing between the start of consecutive requests.
    pub min_request_interval_ms: u64,
    pub checkpoints: CheckpointNames,
    pub instruction_text: String,
    pub autorun_text: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            target_url: "https://aistudio.google.com/prompts/new_chat".to_string(),
            browser: None,
            autorun: false,
            asset_dir: PathBuf::from("images"),
            alt_asset_dirs: vec![PathBuf::from("images/alt1440")],
            default_confidence: 0.7,
            min_request_interval_ms: 5_000,
            checkpoints: CheckpointNames::default(),
            instruction_text: DEFAULT_INSTRUCTION_TEXT.to_string(),
            autorun_text: DEFAULT_AUTORUN_TEXT.to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    /// Load overrides from a flat `key=value` file on top of the defaults.
    ///
    /// Lines without `=` are ignored, values are split at the first `=`
    /// and stripped of surrounding quotes. Unknown keys are logged and
    /// skipped rather than rejected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AutomationError> {
        let mut config = Self::default();
        let contents = std::fs::read_to_string(path.as_ref())?;
        for line in contents.lines() {
            let line = line.trim();
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            match key {
                "target_url" => config.target_url = value.to_string(),
                "browser" => config.browser = Some(value.to_string()),
                // Compatibility alias from earlier deployments.
                "usefirefox" => {
                    if parse_flag(value) {
                        config.browser = Some("firefox".to_string());
                    }
                }
                "autorun" => config.autorun = parse_flag(value),
                "asset_dir" => config.asset_dir = PathBuf::from(value),
                "alt_asset_dir" => config.alt_asset_dirs.push(PathBuf::from(value)),
                "default_confidence" => match value.parse::<f32>() {
                    Ok(v) if (0.0..=1.0).contains(&v) => config.default_confidence = v,
                    _ => warn!(value, "ignoring invalid default_confidence"),
                },
                "min_request_interval_ms" => match value.parse::<u64>() {
                    Ok(v) => config.min_request_interval_ms = v,
                    Err(_) => warn!(value, "ignoring invalid min_request_interval_ms"),
                },
                other => debug!(key = other, "ignoring unknown config key"),
            }
        }
        Ok(config)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "True" | "true" | "1")
}
