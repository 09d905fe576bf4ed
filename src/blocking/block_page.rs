//! Block page shown in place of a blocked navigation

use serde::{Deserialize, Serialize};

use crate::state::format_clock;

/// Dynamic fields of the block page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPage {
    pub host: String,
    pub remaining_seconds: u64,
}

impl BlockPage {
    pub fn new(host: impl Into<String>, remaining_seconds: u64) -> Self {
        Self { host: host.into(), remaining_seconds }
    }

    pub fn render(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Blocked: {host}</title>
</head>
<body>
<main class="blocked">
<h1>Stay focused</h1>
<p><strong class="host">{host}</strong> is blocked during the work phase.</p>
<p>Time left: <span class="remaining">{remaining}</span></p>
</main>
</body>
</html>
"#,
            host = escape_html(&self.host),
            remaining = format_clock(self.remaining_seconds),
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
