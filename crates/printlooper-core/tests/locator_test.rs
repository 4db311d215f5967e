use printlooper_core::{
    Boundary, BoundaryMatcher, DetectionSource, EndSequenceLocator, FallbackPolicy,
    SourceDocument,
};
use std::sync::Arc;

const TEST_PRINT: &str = include_str!("fixtures/test_print.gcode");

fn lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

#[test]
fn test_fixture_boundary_at_hotend_off() {
    let doc = SourceDocument::parse("test_print.gcode", TEST_PRINT);
    let detection = EndSequenceLocator::new().detect(doc.lines());

    assert_eq!(detection.boundary, Boundary::new(25));
    assert_eq!(
        detection.source,
        DetectionSource::Matcher("shutdown_command".to_string())
    );
    assert!(doc.lines()[25].starts_with("M104 S0"));
    assert_eq!(doc.lines()[24], "G1 E8.8 F2700 ; retract");
}

#[test]
fn test_no_markers_keeps_whole_body() {
    let input = lines("G28\nG1 X10 Y10\nG1 X20 Y20 E1");
    let locator = EndSequenceLocator::new();

    let boundary = locator.locate(&input);
    assert_eq!(boundary, Boundary::end_of(&input));
    // Detection is stable across repeated calls
    assert_eq!(locator.locate(&input), boundary);
    assert_eq!(
        locator.detect(&input).source,
        DetectionSource::Fallback(FallbackPolicy::WholeBody)
    );
}

#[test]
fn test_duplicate_comment_markers_bottom_most_wins() {
    let input = lines("; END GCODE\nG1 X1\nG1 X2\n; END GCODE\nM84");
    assert_eq!(EndSequenceLocator::new().locate(&input), Boundary::new(3));
}

#[test]
fn test_prusa_settings_dump_not_a_marker() {
    let text = "G1 X1 E1\n\
                G1 X2 E2\n\
                M104 S0 ; turn off temperature\n\
                M140 S0 ; turn off heatbed\n\
                M107 ; turn off fan\n\
                G1 Z10\n\
                M84 ; disable motors\n\
                \n\
                ; prusaslicer_config = begin\n\
                ; layer_height = 0.2\n\
                ; end_gcode = M104 S0 ; turn off temperature\\nM140 S0\\nM84\n\
                ; prusaslicer_config = end\n";
    let doc = SourceDocument::parse("prusa.gcode", text);
    let detection = EndSequenceLocator::new().detect(doc.lines());

    assert_eq!(detection.boundary, Boundary::new(2));
    assert_eq!(
        detection.source,
        DetectionSource::Matcher("shutdown_command".to_string())
    );
    assert_eq!(doc.lines()[2], "M104 S0 ; turn off temperature");
}

#[test]
fn test_mid_print_fan_off_stays_in_body() {
    let mut text = String::from("G28\nM106 S0 ; fan off for first layer\n");
    for layer in 0..30 {
        text.push_str(&format!("G1 Z{:.1} X{} E{}\n", 0.2 * layer as f64, layer, layer));
    }
    text.push_str("M107\nM104 S0\nM140 S0\nM84\n");
    let input = lines(&text);

    let boundary = EndSequenceLocator::new().locate(&input);
    assert_eq!(boundary, Boundary::new(32));
    assert_eq!(input[boundary.index()], "M107");
}

#[test]
fn test_klipper_macro_end() {
    let input = lines("G1 X1 E1\nG1 X2 E2\nEND_PRINT\n");
    assert_eq!(EndSequenceLocator::new().locate(&input), Boundary::new(2));
}

#[test]
fn test_orca_machine_end_marker() {
    let input = lines("G1 X1 E1\n; MACHINE_END_GCODE_START\nG1 Z10\nM400\nM104 S0\n");
    assert_eq!(EndSequenceLocator::new().locate(&input), Boundary::new(1));
}

struct FinishMarker;

impl BoundaryMatcher for FinishMarker {
    fn name(&self) -> &str {
        "finish_marker"
    }

    fn description(&self) -> &str {
        "Test marker"
    }

    fn find(&self, lines: &[String]) -> Option<usize> {
        lines.iter().rposition(|l| l == "; FINISH")
    }
}

#[test]
fn test_custom_matcher_runs_in_registration_order() {
    let input = lines("G1 X1\n; FINISH\nG1 X2\nM84");

    let mut locator = EndSequenceLocator::empty();
    locator
        .register(Arc::new(FinishMarker))
        .register(Arc::new(printlooper_core::ShutdownCommandMatcher::new()));
    assert_eq!(locator.locate(&input), Boundary::new(1));

    let mut locator = EndSequenceLocator::new();
    locator.register(Arc::new(FinishMarker));
    assert_eq!(locator.locate(&input), Boundary::new(3));
}
