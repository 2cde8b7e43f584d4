use super::*;
use crate::core::config::defaults::DEFAULT_SERVER_URL;
use tempfile::TempDir;

fn with_context<T>(f: impl FnOnce(&SetContext<'_>, &ConfigOrchestrator) -> T) -> T {
    let dir = TempDir::new().expect("temp dir");
    let orchestrator = ConfigOrchestrator::new(dir.path().join("config.toml"));
    let config = orchestrator.load().expect("load");
    let ctx = SetContext {
        config: &config,
        orchestrator: &orchestrator,
    };
    f(&ctx, &orchestrator)
}

fn args(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[test]
fn registry_lists_every_key_once() {
    let registry = SettingRegistry::new();
    assert_eq!(
        registry.keys_display_order(),
        &[
            "server-url",
            "accept-widgets",
            "stream",
            "markdown",
            "theme",
            "action-text",
            "log-filter"
        ]
    );
    for key in registry.keys_display_order() {
        assert_eq!(registry.get(key).map(|h| h.key()), Some(*key));
    }
    assert!(registry.get("default-model").is_none());
}

#[test]
fn boolean_set_and_unset_round_trip_through_file() {
    with_context(|ctx, orchestrator| {
        let registry = SettingRegistry::new();
        let markdown = registry.get("markdown").unwrap();

        let message = markdown.set(&args(&["off"]), ctx).unwrap();
        assert_eq!(message, "✅ Set markdown to: off");
        let saved = orchestrator.load().unwrap();
        assert_eq!(saved.markdown, Some(false));
        assert_eq!(markdown.format(&saved), "  markdown: off");

        markdown.unset(ctx).unwrap();
        let saved = orchestrator.load().unwrap();
        assert_eq!(saved.markdown, None);
        assert_eq!(markdown.format(&saved), "  markdown: (unset, default: on)");
    });
}

#[test]
fn boolean_rejects_garbage() {
    with_context(|ctx, orchestrator| {
        let registry = SettingRegistry::new();
        let err = registry
            .get("stream")
            .unwrap()
            .set(&args(&["maybe"]), ctx)
            .unwrap_err();
        assert!(matches!(err, SettingError::InvalidBoolean(ref input) if input == "maybe"));
        assert_eq!(orchestrator.load().unwrap().stream, None);
    });
}

#[test]
fn missing_value_reports_usage() {
    with_context(|ctx, _| {
        let registry = SettingRegistry::new();
        for key in registry.keys_display_order() {
            let err = registry.get(key).unwrap().set(&[], ctx).unwrap_err();
            assert!(matches!(err, SettingError::MissingArgs { .. }), "{key}");
            assert_eq!(err.exit_code(), 2);
        }
    });
}

#[test]
fn server_url_is_validated_and_normalized() {
    with_context(|ctx, orchestrator| {
        let registry = SettingRegistry::new();
        let handler = registry.get("server-url").unwrap();

        let err = handler.set(&args(&["ftp://example.com"]), ctx).unwrap_err();
        assert!(matches!(err, SettingError::InvalidValue { key: "server-url", .. }));

        handler
            .set(&args(&["https://chat.example.com/"]), ctx)
            .unwrap();
        let saved = orchestrator.load().unwrap();
        assert_eq!(saved.server_url.as_deref(), Some("https://chat.example.com"));

        handler.unset(ctx).unwrap();
        let saved = orchestrator.load().unwrap();
        assert_eq!(saved.server_url(), DEFAULT_SERVER_URL);
    });
}

#[test]
fn theme_accepts_aliases_and_rejects_unknown_names() {
    with_context(|ctx, orchestrator| {
        let registry = SettingRegistry::new();
        let handler = registry.get("theme").unwrap();

        assert_eq!(
            handler.set(&args(&["mono"]), ctx).unwrap(),
            "✅ Set theme to: monochrome"
        );
        assert_eq!(orchestrator.load().unwrap().theme.as_deref(), Some("monochrome"));

        let err = handler.set(&args(&["solarized"]), ctx).unwrap_err();
        assert!(matches!(err, SettingError::UnknownTheme { .. }));
    });
}

#[test]
fn multi_word_action_text_is_joined() {
    with_context(|ctx, orchestrator| {
        let registry = SettingRegistry::new();
        registry
            .get("action-text")
            .unwrap()
            .set(&args(&["Button", "pressed"]), ctx)
            .unwrap();
        assert_eq!(
            orchestrator.load().unwrap().action_text.as_deref(),
            Some("Button pressed")
        );
    });
}

#[test]
fn log_filter_must_parse() {
    with_context(|ctx, orchestrator| {
        let registry = SettingRegistry::new();
        let handler = registry.get("log-filter").unwrap();
        assert!(handler.set(&args(&["a2ui_term=loud"]), ctx).is_err());
        handler.set(&args(&["a2ui_term=debug"]), ctx).unwrap();
        assert_eq!(
            orchestrator.load().unwrap().log_filter.as_deref(),
            Some("a2ui_term=debug")
        );
    });
}
