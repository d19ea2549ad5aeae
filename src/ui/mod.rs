//! sidetabs desktop UI layer.
//!
//! Uses `wry` for cross-platform WebView rendering and `tao` for windows:
//! - Windows: WebView2
//! - Linux: WebKitGTK
//! - macOS: WKWebView
//!
//! The tab strip is an HTML page inside the host window; each tab's content
//! is a separate webview. The strip talks to the core over wry IPC.

pub mod shell;
pub mod wry_surface;
