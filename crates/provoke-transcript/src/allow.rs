use provoke_core::ProvokeError;
use reqwest::Url;

const CAPTION_HOSTS: &[&str] = &["www.youtube.com", "youtube.com", "m.youtube.com"];

/// Caption URLs must be https, on a YouTube host, and point at the timedtext endpoint.
pub fn is_allowed_caption_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    let host_ok = url
        .host_str()
        .is_some_and(|h| CAPTION_HOSTS.contains(&h));
    url.scheme() == "https" && host_ok && url.path().contains("timedtext")
}

/// Return `raw` with its `fmt` query parameter replaced by `fmt`, or removed when `None`.
pub fn with_format(raw: &str, fmt: Option<&str>) -> Result<String, ProvokeError> {
    let mut url = Url::parse(raw).map_err(|_| ProvokeError::BlockedSource {
        url: raw.to_string(),
    })?;
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if let Some(fmt) = fmt {
        pairs.push(("fmt".to_string(), fmt.to_string()));
    }
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    Ok(url.to_string())
}

/// The `v` parameter of a watch-page URL.
pub fn video_id_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_youtube_timedtext() {
        assert!(is_allowed_caption_url(
            "https://www.youtube.com/api/timedtext?v=abc&lang=en"
        ));
        assert!(is_allowed_caption_url("https://m.youtube.com/api/timedtext?v=abc"));
    }

    #[test]
    fn blocks_other_hosts_and_paths() {
        for url in [
            "https://evil.example/api/timedtext?v=abc",
            "https://www.youtube.com.evil.example/api/timedtext",
            "https://www.youtube.com/watch?v=abc",
            "http://www.youtube.com/api/timedtext?v=abc",
            "not a url",
        ] {
            assert!(!is_allowed_caption_url(url), "{url}");
        }
    }

    #[test]
    fn with_format_replaces_fmt() {
        let out = with_format("https://www.youtube.com/api/timedtext?v=a&fmt=srv3", Some("json3"))
            .unwrap();
        assert_eq!(out, "https://www.youtube.com/api/timedtext?v=a&fmt=json3");
    }

    #[test]
    fn with_format_none_removes_fmt() {
        let out = with_format("https://www.youtube.com/api/timedtext?fmt=vtt", None).unwrap();
        assert_eq!(out, "https://www.youtube.com/api/timedtext");
    }

    #[test]
    fn video_id_from_watch_url() {
        assert_eq!(
            video_id_from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=3s").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(video_id_from_url("https://www.youtube.com/"), None);
    }
}
