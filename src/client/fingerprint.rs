//! 浏览器 / 设备 / 屏幕尺寸识别（纯 User-Agent 规则）

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::storage::{BrowserFamily, DeviceClass, VisitorEvent};

static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini")
        .expect("valid mobile pattern")
});

static TABLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)iPad|tablet").expect("valid tablet pattern"));

/// 浏览器视口（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// 子串匹配，按 Firefox → Opera → IE → Edge → Chrome → Safari 的顺序取第一个
///
/// 顺序有意义：Chromium 系 Edge/Opera 的 UA 同时含 `Chrome` 与 `Safari`。
pub fn detect_browser(user_agent: &str) -> BrowserFamily {
    if user_agent.contains("Firefox") {
        BrowserFamily::Firefox
    } else if user_agent.contains("Opera") || user_agent.contains("OPR") {
        BrowserFamily::Opera
    } else if user_agent.contains("Trident") {
        BrowserFamily::InternetExplorer
    } else if user_agent.contains("Edge") {
        BrowserFamily::Edge
    } else if user_agent.contains("Chrome") {
        BrowserFamily::Chrome
    } else if user_agent.contains("Safari") {
        BrowserFamily::Safari
    } else {
        BrowserFamily::Unknown
    }
}

/// 移动端 token 命中时再看是否平板，否则桌面
///
/// `viewport_width` 不参与判定。
pub fn detect_device(user_agent: &str, _viewport_width: u32) -> DeviceClass {
    if MOBILE_RE.is_match(user_agent) {
        if TABLET_RE.is_match(user_agent) {
            DeviceClass::Tablet
        } else {
            DeviceClass::Mobile
        }
    } else {
        DeviceClass::Desktop
    }
}

/// `"WxH"`
pub fn screen_size(width: u32, height: u32) -> String {
    format!("{}x{}", width, height)
}

/// 一次采集的指纹
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub browser: BrowserFamily,
    pub device: DeviceClass,
    pub screen_size: String,
}

impl Fingerprint {
    pub fn collect(user_agent: &str, viewport: Viewport) -> Self {
        Self {
            browser: detect_browser(user_agent),
            device: detect_device(user_agent, viewport.width),
            screen_size: screen_size(viewport.width, viewport.height),
        }
    }

    /// 组装访客上报事件
    pub fn to_visitor_event(&self, visitor_id: &str, timestamp: i64) -> VisitorEvent {
        VisitorEvent {
            id: visitor_id.to_string(),
            timestamp,
            browser: self.browser.to_string(),
            device: self.device,
            screen_size: self.screen_size.clone(),
        }
    }
}
