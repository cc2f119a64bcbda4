//! Transient toasts. Each one is appended out-of-band to the `#toasts` region
//! and removes itself after [`TOAST_LIFETIME`]; there is no dismiss control.

use std::time::Duration;

use hypertext::prelude::*;

pub const TOAST_LIFETIME: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

impl NoticeKind {
    pub fn css_class(self) -> &'static str {
        match self {
            NoticeKind::Success => "toast success",
            NoticeKind::Error => "toast error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: NoticeKind::Success }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: NoticeKind::Error }
    }
}

/// Render notices as an out-of-band fragment that appends to `#toasts`.
/// Every toast carries its own timer, so several can be visible at once.
pub fn render_notices(notices: &[Notice]) -> String {
    if notices.is_empty() {
        return String::new();
    }

    let toasts: Vec<String> = notices.iter().map(render_toast).collect();
    format!(
        r##"<div hx-swap-oob="beforeend:#toasts">{}</div>"##,
        toasts.join("")
    )
}

fn render_toast(notice: &Notice) -> String {
    let message = maud! { (notice.message) }.render().into_inner();
    format!(
        r#"<div class="{}" hx-on::load="setTimeout(() => this.remove(), {})">{}</div>"#,
        notice.kind.css_class(),
        TOAST_LIFETIME.as_millis(),
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_notices_renders_nothing() {
        assert_eq!(render_notices(&[]), "");
    }

    #[test]
    fn test_toast_carries_kind_and_timer() {
        let html = render_notices(&[Notice::error("Failed to delete task!")]);
        assert!(html.contains("hx-swap-oob=\"beforeend:#toasts\""));
        assert!(html.contains("class=\"toast error\""));
        assert!(html.contains("Failed to delete task!"));
        assert!(html.contains("3000"));
    }

    #[test]
    fn test_notices_stack_independently() {
        let html = render_notices(&[
            Notice::success("Task added successfully!"),
            Notice::success("Task added successfully!"),
            Notice::error("Unable to load tasks!"),
        ]);
        assert_eq!(html.matches("Task added successfully!").count(), 2);
        assert_eq!(html.matches("this.remove()").count(), 3);
        assert_eq!(html.matches("class=\"toast success\"").count(), 2);
    }

    #[test]
    fn test_message_is_escaped() {
        let html = render_notices(&[Notice::success("<script>")]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
