use scraper::{Html, Selector};
use serde_json::Value;

const YT_INITIAL_DATA: &str = r#"window["ytInitialData"]"#;
const VIEWER_NAME_POINTER: &str = "/continuationContents/liveChatContinuation/viewerName";

/// Name of the signed-in viewer, used to keep their own messages quiet.
/// Only YouTube exposes it.
pub fn detect_viewer_name(site_id: &str, html: &Html) -> Option<String> {
    match site_id {
        "youtube" => youtube_viewer_name(html),
        _ => None,
    }
}

fn youtube_viewer_name(html: &Html) -> Option<String> {
    let scripts = Selector::parse("script").ok()?;
    let source = html
        .root_element()
        .select(&scripts)
        .map(|script| script.text().collect::<String>())
        .find(|text| text.starts_with(YT_INITIAL_DATA))?;

    let assigned = source[YT_INITIAL_DATA.len()..].trim_start().strip_prefix('=')?.trim_start();
    let data: Value = serde_json::Deserializer::from_str(assigned)
        .into_iter::<Value>()
        .next()?
        .ok()?;

    data.pointer(VIEWER_NAME_POINTER)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(script: &str) -> Html {
        Html::parse_document(&format!(
            "<html><head><script>{script}</script></head><body></body></html>"
        ))
    }

    #[test]
    fn reads_viewer_name_from_initial_data() {
        let html = page(
            r#"window["ytInitialData"] = {"continuationContents":{"liveChatContinuation":{"viewerName":"Me"}}};"#,
        );
        assert_eq!(detect_viewer_name("youtube", &html), Some("Me".to_string()));
    }

    #[test]
    fn missing_or_broken_data_yields_none() {
        assert_eq!(detect_viewer_name("youtube", &page("var x = 1;")), None);
        assert_eq!(
            detect_viewer_name("youtube", &page(r#"window["ytInitialData"] = {broken"#)),
            None
        );
        let html = page(r#"window["ytInitialData"] = {"continuationContents":{}};"#);
        assert_eq!(detect_viewer_name("youtube", &html), None);
        assert_eq!(detect_viewer_name("twitch", &html), None);
    }
}
