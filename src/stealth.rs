//! Init script that keeps the automated browser from announcing itself.
//!
//! Installed through `Page.addScriptToEvaluateOnNewDocument`, so it runs before
//! any page script on every navigation of the tab.

use std::sync::Arc;

use headless_chrome::protocol::cdp::Page::AddScriptToEvaluateOnNewDocument;
use headless_chrome::protocol::cdp::Emulation::SetLocaleOverride;
use headless_chrome::Tab;

pub fn get_stealth_script() -> &'static str {
    r#"
        // navigator.webdriver is the first thing bot checks read
        Object.defineProperty(navigator, 'webdriver', {
            get: () => undefined,
        });

        // Headless Chrome ships without window.chrome
        if (!window.chrome) {
            window.chrome = { runtime: {}, app: { isInstalled: false } };
        }

        Object.defineProperty(navigator, 'languages', {
            get: () => ['en-US', 'en'],
        });

        // Notifications report 'denied' headless but 'default' in a real profile
        const originalQuery = window.navigator.permissions && window.navigator.permissions.query;
        if (originalQuery) {
            window.navigator.permissions.query = (parameters) => (
                parameters.name === 'notifications' ?
                Promise.resolve({ state: Notification.permission }) :
                originalQuery(parameters)
            );
        }
    "#
}

pub fn apply_stealth(tab: &Arc<Tab>, locale: &str) -> anyhow::Result<()> {
    tab.call_method(AddScriptToEvaluateOnNewDocument {
        source: get_stealth_script().to_string(),
        world_name: None,
        include_command_line_api: None,
        run_immediately: None,
    })?;

    tab.call_method(SetLocaleOverride {
        locale: Some(locale.to_string()),
    })?;

    Ok(())
}
