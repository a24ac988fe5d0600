use charts_lsp::diagnostic::{Diagnostic, DiagnosticCode, Severity};
use charts_lsp::section::SectionKind;
use charts_lsp::service::LanguageService;

fn validate(text: &str) -> Vec<Diagnostic> {
    LanguageService::builtin()
        .expect("builtin service")
        .validate_text(text)
}

fn codes(diagnostics: &[Diagnostic]) -> Vec<DiagnosticCode> {
    diagnostics.iter().filter_map(|d| d.code).collect()
}

#[test]
fn test_complete_portal_has_no_diagnostics() {
    let text = "[configuration]\n[group]\n[widget]\n  type = chart\n  [series]\n    entity = srv1\n    metric = cpu_busy";
    assert_eq!(validate(text), vec![]);
}

#[test]
fn test_widget_without_enclosing_sections() {
    let diagnostics = validate("[widget]\n  type = chart");
    let structural: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.code.is_some_and(|c| c.is_structural()))
        .collect();
    assert_eq!(structural.len(), 1);
    assert_eq!(structural[0].code, Some(DiagnosticCode::SectionDepth));
    assert_eq!(structural[0].severity, Severity::Error);
    assert_eq!(structural[0].range.start.line, 0);
    assert_eq!(
        structural[0].message,
        "[widget] is opened at depth 0, expected depth 2"
    );
}

#[test]
fn test_series_missing_metric() {
    let diagnostics = validate("[widget]\n  type = chart\n  [series]\n    entity = srv1");
    let missing: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.code.is_some_and(|c| c.is_missing_requirement()))
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].code, Some(DiagnosticCode::MissingSetting));
    assert_eq!(missing[0].message, "metric is required");
    assert_eq!(missing[0].range.start.line, 2);
}

#[test]
fn test_mutually_exclusive_pair_reported_once() {
    let text = "[configuration]\n[group]\n[widget]\n  type = chart\n  [series]\n    entity = srv1\n    metric = cpu_busy\n    color = red\n    color-range = blue, red\n";
    let diagnostics = validate(text);
    assert_eq!(codes(&diagnostics), vec![DiagnosticCode::MutualExclusion]);
    assert_eq!(diagnostics[0].range.start.line, 8);
}

#[test]
fn test_colors_and_color_range_reported_once() {
    let text = "[configuration]\n[group]\n[widget]\n  type = chart\n  [series]\n    entity = srv1\n    metric = cpu_busy\n    colors = red\n    color-range = blue, red\n";
    let diagnostics = validate(text);
    let exclusions: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.code == Some(DiagnosticCode::MutualExclusion))
        .collect();
    assert_eq!(exclusions.len(), 1, "{:?}", diagnostics);
    assert_eq!(exclusions[0].range.start.line, 8);
    assert_eq!(
        exclusions[0].message,
        "color-range can not be specified simultaneously with colors"
    );
}

#[test]
fn test_graph_link_series_tag_is_well_formed() {
    let text = "[configuration]\n[group]\n[widget]\n  type = graph\n  [link]\n  [series]\n    entity = srv1\n    metric = cpu_busy\n    [tag]\n      name = disk\n      value = sda\n";
    assert_eq!(validate(text), vec![]);

    let text = "[configuration]\n[group]\n[widget]\n  type = graph\n  [link]\n  [series]\n    entity = srv1\n    metric = cpu_busy\n    [tags]\n      mount = /\n";
    assert_eq!(validate(text), vec![]);
}

#[test]
fn test_series_under_widget_without_group_has_no_depth_error() {
    let text = "[configuration]\n[widget]\n  type = chart\n  [series]\n    entity = srv1\n    metric = cpu_busy\n";
    let diagnostics = validate(text);
    assert!(
        diagnostics
            .iter()
            .all(|d| d.code != Some(DiagnosticCode::SectionDepth)),
        "{:?}",
        diagnostics
    );
}

#[test]
fn test_each_missing_alias_group_is_reported() {
    let service = LanguageService::builtin().unwrap();
    let rule = service
        .hierarchy()
        .requirements_for(SectionKind::Series, None);
    assert!(!rule.settings.is_empty());

    for (skipped, group) in rule.settings.iter().enumerate() {
        let mut text = String::from("[configuration]\n[group]\n[widget]\n  type = chart\n  [series]\n");
        for (index, other) in rule.settings.iter().enumerate() {
            if index != skipped {
                text.push_str(&format!("    {} = x\n", other[0]));
            }
        }

        let diagnostics = service.validate_text(&text);
        let expected = service
            .catalog()
            .lookup(&group[0])
            .map(|s| format!("{} is required", s.display_name))
            .unwrap();
        assert!(
            diagnostics
                .iter()
                .any(|d| d.code == Some(DiagnosticCode::MissingSetting) && d.message == expected),
            "{:?} for {}",
            diagnostics,
            text
        );
    }
}

#[test]
fn test_diagnostics_are_in_document_order() {
    let text = "title = x\n[configuration]\n[group]\n[widget]\n  type = chart\n  [series]\n    entity = a\n  bogus-key = 1\n  endif\n";
    let diagnostics = validate(text);
    assert!(!diagnostics.is_empty());
    let positions: Vec<_> = diagnostics
        .iter()
        .map(|d| (d.range.start.line, d.range.start.character))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
}

#[test]
fn test_arbitrary_text_is_handled() {
    let inputs = [
        "",
        "\n\n\n",
        "[",
        "[]",
        "[ widget ]\n= value\n",
        "key =",
        "[configuration]\r\n[group]\r\n",
        "for\nfor\nfor\n",
        "script = 1\nendscript\n",
        "/* never closed\n[widget]",
        "[tags]\n[keys]\n[tags]\n",
        "ünïcödé = 値\n[séries]\n",
    ];
    let service = LanguageService::builtin().unwrap();
    for text in inputs {
        for diagnostic in service.validate_text(text) {
            assert!(!diagnostic.message.is_empty());
            assert!(diagnostic.range.start <= diagnostic.range.end);
        }
    }
}
