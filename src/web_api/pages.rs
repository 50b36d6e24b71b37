//! HTML pages
//!
//! Small inline-rendered pages: the live view with the guardian number, and
//! the guardian setup form.

/// Escape text for safe HTML interpolation
fn escape(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            c => c.to_string(),
        })
        .collect()
}

/// Index page: live annotated stream plus the configured guardian number
pub fn index(guardian_number: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Fallwatch</title>
  <style>
    body {{ font-family: sans-serif; margin: 2rem; background: #111; color: #eee; }}
    img {{ border: 1px solid #444; max-width: 100%; }}
    a {{ color: #8cf; }}
  </style>
</head>
<body>
  <h1>Fallwatch</h1>
  <p>Guardian number: <strong>{number}</strong>
     <a href="/set_guardian">(change)</a></p>
  <img src="/video_feed" alt="Live camera feed">
</body>
</html>
"#,
        number = escape(guardian_number)
    )
}

/// Guardian setup form, optionally with a validation error message
pub fn set_guardian(error: Option<&str>) -> String {
    let error_html = match error {
        Some(msg) => format!(r#"<p class="error">{}</p>"#, escape(msg)),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Fallwatch - Set Guardian</title>
  <style>
    body {{ font-family: sans-serif; margin: 2rem; background: #111; color: #eee; }}
    .error {{ color: #f66; }}
    input {{ padding: 0.4rem; }}
  </style>
</head>
<body>
  <h1>Set Guardian Number</h1>
  {error_html}
  <form method="post" action="/set_guardian">
    <input type="tel" name="number" placeholder="+821012345678" required>
    <button type="submit">Save</button>
  </form>
</body>
</html>
"#
    )
}
