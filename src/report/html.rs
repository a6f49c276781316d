//! HTML summary page

use chrono::Local;
use std::path::Path;
use tera::{Context, Tera};

use super::case::{CaseRecord, RunSummary};
use crate::errors::Result;

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ suite }} report</title>
<style>
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; vertical-align: top; }
.passed { color: #2e7d32; }
.failed { color: #c62828; }
.broken { color: #ef6c00; }
.skipped { color: #757575; }
</style>
</head>
<body>
<h1>{{ suite }}</h1>
<p>Generated {{ generated }}</p>
<p>Total {{ summary.total }}, passed {{ summary.passed }}, failed {{ summary.failed }}, broken {{ summary.broken }}, skipped {{ summary.skipped }}</p>
{% if properties %}
<h2>Environment</h2>
<table>
{% for entry in properties %}<tr><th>{{ entry.0 }}</th><td>{{ entry.1 }}</td></tr>
{% endfor %}</table>
{% endif %}
<h2>Cases</h2>
<table>
<tr><th>Case</th><th>Status</th><th>Duration (ms)</th><th>Details</th></tr>
{% for case in cases %}<tr>
<td>{{ case.id }}</td>
<td class="{{ case.outcome.status }}">{{ case.outcome.status }}</td>
<td>{{ case.duration }}</td>
<td>{% if case.outcome.message %}<pre>{{ case.outcome.message }}</pre>{% endif %}{% if case.screenshot %}<a href="{{ case.screenshot }}">screenshot</a>{% endif %}</td>
</tr>
{% endfor %}</table>
</body>
</html>
"#;

pub fn render_index(
    suite: &str,
    cases: &[CaseRecord],
    properties: &[(String, String)],
) -> Result<String> {
    let mut context = Context::new();
    context.insert("suite", suite);
    context.insert("generated", &Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
    context.insert("summary", &RunSummary::from_cases(cases));
    context.insert("cases", cases);
    context.insert("properties", properties);

    Ok(Tera::one_off(INDEX_TEMPLATE, &context, true)?)
}

/// Render and write `index.html`
pub fn write_index(
    suite: &str,
    cases: &[CaseRecord],
    properties: &[(String, String)],
    path: &Path,
) -> Result<()> {
    let html = render_index(suite, cases, properties)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::case::CaseOutcome;
    use std::time::Duration;

    #[test]
    fn test_render_escapes_and_lists_cases() {
        let cases = vec![
            CaseRecord {
                id: "test_ok".to_string(),
                duration: Duration::from_millis(12),
                outcome: CaseOutcome::Passed,
                screenshot: None,
            },
            CaseRecord {
                id: "test_bad".to_string(),
                duration: Duration::from_millis(40),
                outcome: CaseOutcome::Failed {
                    message: "expected <b>".to_string(),
                },
                screenshot: Some("screenshots/test_bad_1.png".to_string()),
            },
        ];
        let properties = vec![("env".to_string(), "test".to_string())];

        let html = render_index("Smoke", &cases, &properties).unwrap();
        assert!(html.contains("<h1>Smoke</h1>"));
        assert!(html.contains("test_ok"));
        assert!(html.contains("class=\"failed\""));
        assert!(html.contains("expected &lt;b&gt;"));
        assert!(html.contains("screenshots"));
        assert!(html.contains("Total 2, passed 1, failed 1"));
    }
}
