/// How to pull one named value out of a message subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExtractor {
    pub name: &'static str,
    pub selector: &'static str,
    pub attribute: Option<&'static str>,
    pub default_value: Option<&'static str>,
}

impl FieldExtractor {
    const fn text(name: &'static str, selector: &'static str) -> Self {
        Self {
            name,
            selector,
            attribute: None,
            default_value: None,
        }
    }
}

/// Declarative description of one supported chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub url_patterns: &'static [&'static str],
    /// Set for platforms that destroy and recreate their chat container.
    pub container_selector: Option<&'static str>,
    pub load_detection_selector: Option<&'static str>,
    pub message_selector: &'static str,
    pub fields: &'static [FieldExtractor],
}

/// Priority order: earlier entries win.
pub static SITE_CONFIGS: &[SiteConfig] = &[
    SiteConfig {
        id: "youtube",
        name: "YouTube Live Chat",
        url_patterns: &[
            "https://www.youtube.com/live_chat",
            "https://studio.youtube.com/live_chat",
        ],
        container_selector: Some("#items"),
        load_detection_selector: None,
        message_selector: "yt-live-chat-text-message-renderer",
        fields: &[
            FieldExtractor::text("name", "#author-name"),
            FieldExtractor::text("body", "#message"),
        ],
    },
    SiteConfig {
        id: "twitch",
        name: "Twitch Chat",
        url_patterns: &["https://www.twitch.tv/", "https://dashboard.twitch.tv/"],
        container_selector: Some(".chat-scrollable-area__message-container"),
        load_detection_selector: Some(r#"[data-a-target="chat-welcome-message"]"#),
        message_selector: ".chat-line__message-container",
        fields: &[
            FieldExtractor::text("name", ".chat-author__display-name"),
            FieldExtractor::text("body", r#"[data-a-target="chat-line-message-body"]"#),
        ],
    },
];

const TEST_PAGE_SCHEME: &str = "chrome-extension:";
const TEST_PAGE_PATH: &str = "/chat-test.html";

/// URL of the local chat test page, which always maps to the first platform.
pub fn is_test_page(url: &str) -> bool {
    url.starts_with(TEST_PAGE_SCHEME) && url.contains(TEST_PAGE_PATH)
}

/// First config with a URL prefix match; `None` means the pipeline stays off.
pub fn find_site_config_by_url(url: &str) -> Option<&'static SiteConfig> {
    find_in(SITE_CONFIGS, url)
}

pub fn find_in<'a>(configs: &'a [SiteConfig], url: &str) -> Option<&'a SiteConfig> {
    if is_test_page(url) {
        return configs.first();
    }
    configs
        .iter()
        .find(|config| config.url_patterns.iter().any(|p| url.starts_with(p)))
}
