use super::Diagnostic;

pub fn to_value(d: &Diagnostic) -> serde_json::Value {
    let labels: Vec<serde_json::Value> = d
        .labels
        .iter()
        .map(|l| {
            serde_json::json!({
                "file": l.location.file.display().to_string(),
                "line": l.location.line,
                "col": l.location.col,
                "start": l.location.span.start,
                "end": l.location.span.end,
                "message": l.message,
            })
        })
        .collect();

    let mut obj = serde_json::json!({
        "severity": "error",
        "message": d.message,
        "labels": labels,
        "notes": d.notes,
    });

    if let Some(code) = d.code {
        obj["code"] = serde_json::Value::String(code.to_string());
    }

    if let Some(s) = &d.suggestion {
        obj["suggestion"] = serde_json::Value::String(s.clone());
    }

    obj
}

pub fn render(d: &Diagnostic) -> String {
    serde_json::to_string(&to_value(d))
        .unwrap_or_else(|_| r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string())
}
