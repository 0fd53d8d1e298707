//! `config` subcommand — show the resolved pin assignment and timing.

use ledcycle_lib::LedCycleError;

use super::{ConfigOutput, Result, Settings, kv, kv_width};

pub(super) fn cmd_config(settings: &Settings, json: bool) -> Result<()> {
    let validation = settings.validate();

    if json {
        let output = ConfigOutput {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: settings.clone(),
            valid: validation.is_ok(),
            error: validation.as_ref().err().map(|e| e.to_string()),
        };
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| LedCycleError::Config(format!("JSON output: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    let roles = settings.pin_roles();
    let mut keys: Vec<&str> = vec!["Chip:", "Poll period:", "Output mode:", "Status:"];
    let labels: Vec<String> = roles
        .iter()
        .map(|(name, _)| format!("{}:", capitalize(name)))
        .collect();
    keys.extend(labels.iter().map(String::as_str));
    let w = kv_width(&keys);

    kv("Chip:", &settings.chip, w);
    for (label, (_, pin)) in labels.iter().zip(roles) {
        kv(label, pin, w);
    }
    kv("Poll period:", format_args!("{} ms", settings.poll_period_ms), w);
    kv("Output mode:", settings.output_mode, w);
    match validation {
        Ok(()) => kv("Status:", "ok", w),
        Err(e) => kv("Status:", format_args!("invalid ({e})"), w),
    }
    Ok(())
}

/// "red LED" -> "Red LED", to match the other keys.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_labels_capitalized() {
        assert_eq!(capitalize("switch button"), "Switch button");
        assert_eq!(capitalize("red LED"), "Red LED");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn every_role_label_starts_uppercase() {
        for (name, _) in Settings::default().pin_roles() {
            let label = capitalize(name);
            assert!(label.starts_with(char::is_uppercase), "{label}");
        }
    }
}
