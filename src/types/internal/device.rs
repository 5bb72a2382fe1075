/// Best-effort device/platform/browser classification from a user-agent
/// string. User-agent sniffing is inherently heuristic; anything the
/// heuristics cannot place renders as "Unknown" rather than failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device: String,
    pub platform: String,
    pub browser: String,
}

impl DeviceInfo {
    pub fn unknown() -> Self {
        Self {
            device: "Unknown".to_string(),
            platform: "Unknown".to_string(),
            browser: "Unknown".to_string(),
        }
    }
}

/// Parse a user-agent string into display fields. Pure and side-effect
/// free; not a correctness-critical path.
pub fn parse_user_agent(user_agent: &str) -> DeviceInfo {
    if user_agent.trim().is_empty() {
        return DeviceInfo::unknown();
    }

    let ua = user_agent.to_lowercase();

    let platform = if ua.contains("windows") {
        "Windows"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ios") {
        "iOS"
    } else if ua.contains("mac os") || ua.contains("macintosh") {
        "macOS"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Unknown"
    };

    let device = if ua.contains("iphone") {
        "iPhone"
    } else if ua.contains("ipad") {
        "iPad"
    } else if ua.contains("android") && ua.contains("mobile") {
        "Phone"
    } else if ua.contains("android") {
        "Tablet"
    } else if matches!(platform, "Windows" | "macOS" | "Linux") {
        "Desktop"
    } else {
        "Unknown"
    };

    // Order matters: Chrome UAs contain "safari", Edge UAs contain "chrome"
    let browser = if ua.contains("edg/") || ua.contains("edge") {
        "Edge"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("chrome") || ua.contains("crios") {
        "Chrome"
    } else if ua.contains("firefox") || ua.contains("fxios") {
        "Firefox"
    } else if ua.contains("safari") {
        "Safari"
    } else {
        "Unknown"
    };

    DeviceInfo {
        device: device.to_string(),
        platform: platform.to_string(),
        browser: browser.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_user_agent_is_unknown() {
        assert_eq!(parse_user_agent(""), DeviceInfo::unknown());
        assert_eq!(parse_user_agent("   "), DeviceInfo::unknown());
    }

    #[test]
    fn test_chrome_on_windows() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
        let info = parse_user_agent(ua);
        assert_eq!(info.platform, "Windows");
        assert_eq!(info.device, "Desktop");
        assert_eq!(info.browser, "Chrome");
    }

    #[test]
    fn test_safari_on_iphone() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
                  AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
        let info = parse_user_agent(ua);
        assert_eq!(info.platform, "iOS");
        assert_eq!(info.device, "iPhone");
        assert_eq!(info.browser, "Safari");
    }

    #[test]
    fn test_edge_is_not_misread_as_chrome() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
        assert_eq!(parse_user_agent(ua).browser, "Edge");
    }

    #[test]
    fn test_android_phone() {
        let ua = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
        let info = parse_user_agent(ua);
        assert_eq!(info.platform, "Android");
        assert_eq!(info.device, "Phone");
    }

    #[test]
    fn test_gibberish_renders_unknown_fields() {
        let info = parse_user_agent("definitely-not-a-real-agent/1.0");
        assert_eq!(info.platform, "Unknown");
        assert_eq!(info.device, "Unknown");
        assert_eq!(info.browser, "Unknown");
    }
}
