//! Session configuration.

pub const ENV_HIGH_DPI: &str = "QUADBRIDGE_HIGH_DPI";
pub const ENV_SHADER_COMPAT: &str = "QUADBRIDGE_SHADER_COMPAT";
pub const ENV_AUDIO_RATE: &str = "QUADBRIDGE_AUDIO_RATE";

pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 44_100;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Scale the backing store and pointer positions by the device pixel ratio.
    pub high_dpi: bool,
    /// Initial state of the GLSL ES 1.00 → 3.00 source translation.
    pub shader_compat: bool,
    /// Output mixing rate of the audio engine.
    pub audio_sample_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            high_dpi: false,
            shader_compat: false,
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
        }
    }
}

impl SessionConfig {
    pub fn with_high_dpi(mut self, high_dpi: bool) -> Self {
        self.high_dpi = high_dpi;
        self
    }

    pub fn with_shader_compat(mut self, shader_compat: bool) -> Self {
        self.shader_compat = shader_compat;
        self
    }

    pub fn with_audio_sample_rate(mut self, rate: u32) -> Self {
        self.audio_sample_rate = rate;
        self
    }

    /// Defaults overridden by `QUADBRIDGE_*` environment variables.
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(v) = lookup(ENV_HIGH_DPI).and_then(|raw| parse_flag(ENV_HIGH_DPI, &raw)) {
            config.high_dpi = v;
        }
        if let Some(v) =
            lookup(ENV_SHADER_COMPAT).and_then(|raw| parse_flag(ENV_SHADER_COMPAT, &raw))
        {
            config.shader_compat = v;
        }
        if let Some(raw) = lookup(ENV_AUDIO_RATE) {
            match raw.trim().parse::<u32>() {
                Ok(rate) if rate > 0 => config.audio_sample_rate = rate,
                _ => tracing::warn!("ignoring invalid {ENV_AUDIO_RATE}={raw:?}"),
            }
        }
        config
    }
}

fn parse_flag(name: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => {
            tracing::warn!("ignoring invalid {name}={raw:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(SessionConfig::from_lookup(lookup(&[])), SessionConfig::default());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = SessionConfig::from_lookup(lookup(&[
            (ENV_HIGH_DPI, "true"),
            (ENV_SHADER_COMPAT, "1"),
            (ENV_AUDIO_RATE, "48000"),
        ]));
        assert!(config.high_dpi);
        assert!(config.shader_compat);
        assert_eq!(config.audio_sample_rate, 48_000);
    }

    #[test]
    fn garbage_values_are_ignored() {
        let config = SessionConfig::from_lookup(lookup(&[
            (ENV_HIGH_DPI, "maybe"),
            (ENV_AUDIO_RATE, "0"),
        ]));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn builder_methods_chain() {
        let config = SessionConfig::default()
            .with_high_dpi(true)
            .with_audio_sample_rate(22_050);
        assert!(config.high_dpi);
        assert!(!config.shader_compat);
        assert_eq!(config.audio_sample_rate, 22_050);
    }
}
