// In crates/signals/src/factory.rs

use crate::{JsonlInbox, SignalSource};
use anyhow::Result;
use app_config::types::SignalSettings;
use std::sync::Arc;

/// Builds the file-backed sources named in configuration.
///
/// In-process sources such as [`crate::ChannelSignalSource`] are created by
/// the caller and appended to this list.
pub fn sources_from_settings(settings: &SignalSettings) -> Result<Vec<Arc<dyn SignalSource>>> {
    let mut sources: Vec<Arc<dyn SignalSource>> = Vec::new();

    if let Some(path) = &settings.inbox_path {
        if path.trim().is_empty() {
            anyhow::bail!("signals.inbox_path is set but empty");
        }
        tracing::info!(%path, "Signal inbox enabled.");
        sources.push(Arc::new(JsonlInbox::new(path)));
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_is_built_only_when_configured() {
        assert!(sources_from_settings(&SignalSettings::default()).unwrap().is_empty());

        let settings = SignalSettings { inbox_path: Some("data/inbox.jsonl".into()) };
        let sources = sources_from_settings(&settings).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "JsonlInbox");

        let settings = SignalSettings { inbox_path: Some("  ".into()) };
        assert!(sources_from_settings(&settings).is_err());
    }
}
