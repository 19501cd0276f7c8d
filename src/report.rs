//! Report renderer: a pure projection of [`UiState`] into what the page shows.

use crate::analysis::{Diagnosis, DiagnosisFormat};
use crate::session::{Notification, Phase, UiState};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportView {
    pub phase: Phase,
    pub preview: Option<String>,
    pub file_name: Option<String>,
    /// Whether the analyze action is offered and clickable.
    pub show_analyze: bool,
    pub analyze_enabled: bool,
    pub analyze_label: &'static str,
    pub report_lines: Vec<String>,
    pub notification: Option<Notification>,
}

pub fn render(state: &UiState) -> ReportView {
    let phase = state.phase();
    let image = state.selected_image();

    let report_lines = match (phase, state.report()) {
        (Phase::Complete, Some(diagnosis)) => diagnosis_lines(diagnosis),
        _ => Vec::new(),
    };

    ReportView {
        phase,
        preview: image.map(|i| i.preview.clone()),
        file_name: image.map(|i| i.file_name.clone()),
        show_analyze: matches!(phase, Phase::ImageSelected | Phase::Analyzing),
        analyze_enabled: phase == Phase::ImageSelected,
        analyze_label: if phase == Phase::Analyzing {
            "Analyzing Plant..."
        } else {
            "Analyze Image"
        },
        report_lines,
        notification: state.notification().cloned(),
    }
}

pub fn diagnosis_lines(diagnosis: &Diagnosis) -> Vec<String> {
    let mut lines = match diagnosis.format {
        DiagnosisFormat::Label => vec![format!("Disease: {}", diagnosis.diagnosis_text)],
        DiagnosisFormat::Narrative => diagnosis
            .diagnosis_text
            .lines()
            .map(str::to_string)
            .collect(),
    };
    if let Some(confidence) = diagnosis.confidence.and_then(format_confidence) {
        lines.push(format!("Confidence: {}", confidence));
    }
    lines
}

/// Formats a [0, 1] fraction as a percentage with two decimals. Values
/// outside that range are not shown.
pub fn format_confidence(fraction: f64) -> Option<String> {
    if !(0.0..=1.0).contains(&fraction) {
        return None;
    }
    Some(format!("{:.2}%", fraction * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisResult;
    use crate::error::ErrorKind;
    use crate::intake::{ImageSource, UploadedFile};

    fn selected() -> UiState {
        let mut state = UiState::new();
        state
            .select(ImageSource::FilePicker(UploadedFile {
                file_name: "leaf.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                bytes: b"\xff\xd8\xffleaf".to_vec(),
            }))
            .unwrap();
        state
    }

    #[test]
    fn confidence_is_a_two_decimal_percentage() {
        assert_eq!(format_confidence(0.8734).as_deref(), Some("87.34%"));
        assert_eq!(format_confidence(0.92).as_deref(), Some("92.00%"));
        assert_eq!(format_confidence(1.0).as_deref(), Some("100.00%"));
        assert_eq!(format_confidence(0.0).as_deref(), Some("0.00%"));
        assert_eq!(format_confidence(1.5), None);
        assert_eq!(format_confidence(f64::NAN), None);
    }

    #[test]
    fn idle_view_has_nothing_to_show() {
        let view = render(&UiState::new());
        assert_eq!(view.phase, Phase::Idle);
        assert!(view.preview.is_none());
        assert!(!view.show_analyze);
        assert!(view.report_lines.is_empty());
    }

    #[test]
    fn analyzing_disables_the_button() {
        let mut state = selected();
        let view = render(&state);
        assert!(view.show_analyze && view.analyze_enabled);
        assert!(view.preview.unwrap().starts_with("data:image/jpeg;base64,"));

        state.begin_analysis().unwrap();
        let view = render(&state);
        assert_eq!(view.phase, Phase::Analyzing);
        assert!(view.show_analyze);
        assert!(!view.analyze_enabled);
        assert_eq!(view.analyze_label, "Analyzing Plant...");
    }

    #[test]
    fn complete_label_report() {
        let mut state = selected();
        state.begin_analysis().unwrap();
        state.complete_analysis(AnalysisResult::Success(Diagnosis {
            diagnosis_text: "Leaf Blight".to_string(),
            confidence: Some(0.92),
            format: DiagnosisFormat::Label,
        }));

        let view = render(&state);
        assert_eq!(view.phase, Phase::Complete);
        assert!(!view.show_analyze);
        assert_eq!(view.report_lines, vec!["Disease: Leaf Blight", "Confidence: 92.00%"]);
    }

    #[test]
    fn narrative_report_keeps_its_lines() {
        let lines = diagnosis_lines(&Diagnosis {
            diagnosis_text: "1. Disease Name: Powdery Mildew\n2. Confidence Level: High".to_string(),
            confidence: None,
            format: DiagnosisFormat::Narrative,
        });
        assert_eq!(
            lines,
            vec!["1. Disease Name: Powdery Mildew", "2. Confidence Level: High"]
        );
    }

    #[test]
    fn failure_is_a_notification_not_a_report() {
        let mut state = selected();
        state.begin_analysis().unwrap();
        state.complete_analysis(AnalysisResult::failure(ErrorKind::Network, "down"));

        let view = render(&state);
        assert_eq!(view.phase, Phase::ImageSelected);
        assert!(view.report_lines.is_empty());
        assert_eq!(view.notification.unwrap().message, "down");
    }
}
