//! HTML for the single-page UI, rendered on the server from a [`ReportView`].

use crate::report::ReportView;
use crate::session::{NotificationTone, Phase};

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            background: linear-gradient(135deg, #3a7d44 0%, #9dc08b 100%);
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            padding: 20px;
        }

        .container {
            background: white;
            border-radius: 20px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            max-width: 800px;
            width: 100%;
            padding: 40px;
        }

        h1 { color: #2f5d34; margin-bottom: 10px; font-size: 2em; }
        .subtitle { color: #666; margin-bottom: 30px; font-size: 0.9em; }

        .upload-area {
            border: 3px dashed #3a7d44;
            border-radius: 15px;
            padding: 40px 20px;
            text-align: center;
            cursor: pointer;
            transition: all 0.3s;
            background: #f5faf3;
        }
        .upload-area.dragover { background: #e3f1de; transform: scale(1.02); }
        .upload-icon { font-size: 4em; margin-bottom: 20px; }
        .upload-text { color: #3a7d44; font-size: 1.2em; font-weight: 600; margin-bottom: 10px; }
        .upload-hint { color: #999; font-size: 0.9em; }
        input[type="file"] { display: none; }

        .preview-image {
            max-width: 100%;
            max-height: 400px;
            border-radius: 10px;
            margin: 20px 0;
            box-shadow: 0 4px 15px rgba(0,0,0,0.1);
        }

        .actions { text-align: center; margin-top: 10px; }
        button {
            background: #3a7d44;
            color: white;
            border: none;
            border-radius: 10px;
            padding: 12px 28px;
            font-size: 1em;
            font-weight: 600;
            cursor: pointer;
        }
        button:disabled { background: #9bb79f; cursor: wait; }

        .result { background: #f5faf3; border-radius: 10px; padding: 20px; margin-top: 20px; }
        .result-label {
            color: #3a7d44;
            font-weight: 600;
            margin-bottom: 10px;
            font-size: 0.9em;
            text-transform: uppercase;
            letter-spacing: 1px;
        }
        .result-line { color: #333; font-size: 1.05em; line-height: 1.6; white-space: pre-wrap; }

        .toast {
            display: flex;
            justify-content: space-between;
            align-items: flex-start;
            gap: 10px;
            padding: 15px;
            border-radius: 10px;
            margin-bottom: 20px;
        }
        .toast.error { background: #fee; border: 2px solid #fcc; color: #c33; }
        .toast.info { background: #eef7ec; border: 2px solid #cde5c7; color: #2f5d34; }
        .toast button { background: transparent; color: inherit; padding: 0 4px; font-size: 1.2em; }
"#;

const SCRIPT: &str = r#"
        const uploadArea = document.getElementById('uploadArea');
        const fileInput = document.getElementById('fileInput');
        const selectForm = document.getElementById('selectForm');
        const analyzeForm = document.getElementById('analyzeForm');

        uploadArea.addEventListener('click', () => fileInput.click());
        fileInput.addEventListener('change', () => {
            if (fileInput.files.length) selectForm.submit();
        });

        uploadArea.addEventListener('dragover', (e) => {
            e.preventDefault();
            uploadArea.classList.add('dragover');
        });
        uploadArea.addEventListener('dragleave', () => uploadArea.classList.remove('dragover'));
        uploadArea.addEventListener('drop', async (e) => {
            e.preventDefault();
            uploadArea.classList.remove('dragover');
            const file = e.dataTransfer.files[0];
            if (!file) return;
            const formData = new FormData();
            formData.append('origin', 'drop');
            formData.append('image', file);
            await fetch('/select', { method: 'POST', body: formData });
            window.location.reload();
        });

        if (analyzeForm) {
            analyzeForm.addEventListener('submit', () => {
                const button = analyzeForm.querySelector('button');
                button.disabled = true;
                button.textContent = 'Analyzing Plant...';
            });
        }
"#;

pub fn render_page(view: &ReportView) -> String {
    let mut body = String::new();

    if let Some(note) = &view.notification {
        let tone = match note.tone {
            NotificationTone::Info => "info",
            NotificationTone::Error => "error",
        };
        body.push_str(&format!(
            r#"<div class="toast {tone}"><div><strong>{}</strong><br>{}</div><form method="post" action="/dismiss"><button type="submit" aria-label="Dismiss">&times;</button></form></div>"#,
            escape_html(&note.title),
            escape_html(&note.message),
        ));
    }

    let upload_text = if view.phase == Phase::Idle {
        "Upload Plant Image"
    } else {
        "Select Different Image"
    };
    body.push_str(&format!(
        r#"<form id="selectForm" method="post" action="/select" enctype="multipart/form-data">
            <input type="hidden" name="origin" value="picker">
            <div class="upload-area" id="uploadArea">
                <div class="upload-icon">🌿</div>
                <div class="upload-text">{upload_text}</div>
                <div class="upload-hint">Drag and drop, or click to choose • JPG, PNG, WEBP</div>
                <input type="file" id="fileInput" name="image" accept="image/*">
            </div>
        </form>"#
    ));

    if let Some(preview) = &view.preview {
        body.push_str(&format!(
            r#"<img class="preview-image" src="{}" alt="{}">"#,
            escape_html(preview),
            escape_html(view.file_name.as_deref().unwrap_or("Selected plant")),
        ));
    }

    if view.show_analyze {
        let disabled = if view.analyze_enabled { "" } else { " disabled" };
        body.push_str(&format!(
            r#"<form id="analyzeForm" class="actions" method="post" action="/analyze"><button type="submit"{disabled}>{}</button></form>"#,
            view.analyze_label
        ));
    }

    if !view.report_lines.is_empty() {
        body.push_str(r#"<div class="result"><div class="result-label">🩺 Plant Health Report</div>"#);
        for line in &view.report_lines {
            body.push_str(&format!(r#"<div class="result-line">{}</div>"#, escape_html(line)));
        }
        body.push_str("</div>");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Plant Disease Detection</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <h1>🌱 Plant Disease Detection</h1>
        <p class="subtitle">Upload an image of your plant and get an instant diagnosis.</p>
        {body}
    </div>
    <script>{SCRIPT}</script>
</body>
</html>"#
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
