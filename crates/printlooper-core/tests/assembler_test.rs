use printlooper_core::assembler::{
    loop_header, ALTERNATING_LOOP_HEADER_LINES, FINAL_END_HEADER, FINAL_HEADER_LINES,
    LOOP_HEADER_LINES, PUSH_OFF_FOOTER, PUSH_OFF_FRAME_LINES,
};
use printlooper_core::{
    Boundary, EndSequenceLocator, FallbackPolicy, LocatedSource, LoopAssembler, LoopPlan,
    PrinterProfile, ProfileRegistry, SourceDocument,
};
use std::num::NonZeroU32;

const TEST_PRINT: &str = include_str!("fixtures/test_print.gcode");

fn count(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

fn occurrences(lines: &[String], needle: &str) -> usize {
    lines.iter().filter(|l| l.contains(needle)).count()
}

fn push_off_count(lines: &[String]) -> usize {
    occurrences(lines, "Push-Off Sequence ===") - occurrences(lines, PUSH_OFF_FOOTER)
}

#[test]
fn test_single_file_one_loop_has_no_push_off() {
    let doc = SourceDocument::parse("test_print.gcode", TEST_PRINT);
    let registry = ProfileRegistry::builtin();
    let profile = registry.get("centauri-carbon").unwrap();
    let plan = LoopPlan::locate(&EndSequenceLocator::new(), &doc, None, count(1), profile);

    let out = LoopAssembler::new().assemble(&plan);

    let mut expected = vec![loop_header(1, 1), String::new()];
    expected.extend_from_slice(plan.primary().body());
    expected.push(FINAL_END_HEADER.to_string());
    expected.push(String::new());
    expected.extend_from_slice(plan.primary().end_sequence());

    assert_eq!(out.lines(), expected.as_slice());
    assert_eq!(push_off_count(out.lines()), 0);
    assert_eq!(occurrences(out.lines(), PUSH_OFF_FOOTER), 0);
}

#[test]
fn test_single_file_three_loops() {
    let doc = SourceDocument::parse("test_print.gcode", TEST_PRINT);
    let registry = ProfileRegistry::builtin();
    let profile = registry.get("centauri-carbon").unwrap();
    let plan = LoopPlan::locate(&EndSequenceLocator::new(), &doc, None, count(3), profile);

    let out = LoopAssembler::new().assemble(&plan);
    let lines = out.lines();

    assert_eq!(occurrences(lines, "of 3 ================"), 3);
    assert_eq!(occurrences(lines, PUSH_OFF_FOOTER), 2);
    assert_eq!(occurrences(lines, "; === Centauri Carbon Push-Off Sequence ==="), 2);
    assert_eq!(occurrences(lines, "FINAL END SEQUENCE"), 1);
    assert_eq!(occurrences(lines, "; MAIN PRINT"), 3);

    // End sequence only at the very end
    assert_eq!(occurrences(lines, "M104 S0 ; turn off hotend"), 1);
    assert_eq!(occurrences(lines, "M84 ; disable motors"), 1);
    let end = plan.primary().end_sequence();
    assert_eq!(&lines[lines.len() - end.len()..], end);
    assert_eq!(lines[lines.len() - end.len() - 2], FINAL_END_HEADER);
}

#[test]
fn test_count_invariant_single_file() {
    let doc = SourceDocument::parse("test_print.gcode", TEST_PRINT);
    let profile = PrinterProfile::ender3_v3_se();
    let located = LocatedSource::new(&doc, EndSequenceLocator::new().locate(doc.lines()));
    let b = located.body().len();
    let e = located.end_sequence().len();

    for n in [1u32, 2, 5, 12] {
        let plan = LoopPlan::single(located, count(n), &profile);
        let p = plan.push_off_len();
        let out = LoopAssembler::new().assemble(&plan);
        let n = n as usize;
        assert_eq!(
            out.len(),
            n * b + n * LOOP_HEADER_LINES + (n - 1) * p + e + FINAL_HEADER_LINES
        );
        assert_eq!(out.len(), LoopAssembler::new().expected_len(&plan));
    }
}

#[test]
fn test_alternating_four_loops() {
    let first = SourceDocument::parse("cube.gcode", "G1 X1 E1 ; cube\nM104 S0 ; cube end\nM84\n");
    let second = SourceDocument::parse(
        "cylinder.gcode",
        "G1 X2 E2 ; cylinder\nG1 X3 E3 ; cylinder\nM104 S0 ; cylinder end\nM84\n",
    );
    let registry = ProfileRegistry::builtin();
    let profile = registry.get("ender3-v3-se").unwrap();
    let plan = LoopPlan::locate(
        &EndSequenceLocator::new(),
        &first,
        Some(&second),
        count(4),
        profile,
    );

    let out = LoopAssembler::new().assemble(&plan);
    let lines = out.lines();

    let using: Vec<&str> = lines
        .iter()
        .filter_map(|l| l.strip_prefix("; Using: "))
        .collect();
    assert_eq!(
        using,
        vec!["cube.gcode", "cylinder.gcode", "cube.gcode", "cylinder.gcode"]
    );

    // Each header is immediately followed by its source annotation
    for i in 1..=4u32 {
        let pos = lines.iter().position(|l| *l == loop_header(i, 4)).unwrap();
        let expected = if i % 2 == 1 { "cube.gcode" } else { "cylinder.gcode" };
        assert_eq!(lines[pos + 1], format!("; Using: {}", expected));
        assert_eq!(lines[pos + 2], "");
    }

    // Bodies in order: primary, secondary, primary, secondary
    let bodies: Vec<&str> = lines
        .iter()
        .filter(|l| l.starts_with("G1 X") && l.contains(" E"))
        .map(|l| l.rsplit("; ").next().unwrap())
        .collect();
    assert_eq!(
        bodies,
        vec!["cube", "cylinder", "cylinder", "cube", "cylinder", "cylinder"]
    );

    assert_eq!(occurrences(lines, PUSH_OFF_FOOTER), 3);
    assert_eq!(occurrences(lines, "FINAL END SEQUENCE"), 1);

    // Loop 4 came from the secondary, but the primary's end sequence closes the file
    assert_eq!(occurrences(lines, "M104 S0 ; cube end"), 1);
    assert_eq!(occurrences(lines, "M104 S0 ; cylinder end"), 0);
    assert_eq!(lines[lines.len() - 2], "M104 S0 ; cube end");
    assert_eq!(lines[lines.len() - 1], "M84");

    // 4 headers + bodies (1 + 2 + 1 + 2) + 3 push-off blocks + final header + end
    assert_eq!(profile.push_off.len(), 9);
    let p = PUSH_OFF_FRAME_LINES + 9;
    assert_eq!(
        out.len(),
        4 * ALTERNATING_LOOP_HEADER_LINES + (1 + 2 + 1 + 2) + 3 * p + 2 + FINAL_HEADER_LINES
    );
    assert_eq!(out.len(), 67);
}

#[test]
fn test_alternating_odd_count_still_uses_primary_end() {
    let first = SourceDocument::parse("a.gcode", "A\n; END GCODE\nM84 ; a");
    let second = SourceDocument::parse("b.gcode", "B\n; END GCODE\nM84 ; b");
    let profile = PrinterProfile::centauri_carbon();
    let plan = LoopPlan::locate(
        &EndSequenceLocator::new(),
        &first,
        Some(&second),
        count(3),
        &profile,
    );
    let out = LoopAssembler::new().assemble(&plan);
    assert_eq!(out.lines().last().unwrap(), "M84 ; a");
    assert_eq!(occurrences(out.lines(), "M84 ; b"), 0);
}

#[test]
fn test_marker_free_single_line_with_tail_window() {
    let doc = SourceDocument::parse("line.gcode", "G1 X5 Y5\n");
    let locator = EndSequenceLocator::new().with_fallback(FallbackPolicy::TailWindow(20));
    let boundary = locator.locate(doc.lines());
    assert_eq!(boundary, Boundary::new(0));

    let profile = PrinterProfile::centauri_carbon();
    let plan = LoopPlan::single(LocatedSource::new(&doc, boundary), count(2), &profile);
    assert!(plan.primary().body().is_empty());

    let out = LoopAssembler::new().assemble(&plan);
    let lines = out.lines();

    assert_eq!(lines[0], loop_header(1, 2));
    assert_eq!(lines[1], "");
    assert_eq!(lines[2], "");
    assert_eq!(lines[3], "; === Centauri Carbon Push-Off Sequence ===");
    assert_eq!(occurrences(lines, "LOOP "), 2);
    assert_eq!(occurrences(lines, PUSH_OFF_FOOTER), 1);
    assert_eq!(occurrences(lines, "G1 X5 Y5"), 1);
    assert_eq!(lines.last().unwrap(), "G1 X5 Y5");
    assert_eq!(
        lines.len(),
        2 * LOOP_HEADER_LINES + plan.push_off_len() + FINAL_HEADER_LINES + 1
    );
}

#[test]
fn test_marker_free_default_appends_empty_end() {
    let doc = SourceDocument::parse("line.gcode", "G1 X5 Y5\n");
    let profile = PrinterProfile::centauri_carbon();
    let plan = LoopPlan::locate(&EndSequenceLocator::new(), &doc, None, count(2), &profile);
    let out = LoopAssembler::new().assemble(&plan);

    assert_eq!(occurrences(out.lines(), "G1 X5 Y5"), 2);
    assert_eq!(out.lines().last().unwrap(), "");
    assert_eq!(out.lines()[out.len() - 2], FINAL_END_HEADER);
}

#[test]
fn test_empty_document() {
    let doc = SourceDocument::parse("empty.gcode", "");
    let profile = PrinterProfile::centauri_carbon();
    let plan = LoopPlan::locate(&EndSequenceLocator::new(), &doc, None, count(1), &profile);
    assert_eq!(plan.primary().boundary(), Boundary::new(0));

    let out = LoopAssembler::new().assemble(&plan);
    assert_eq!(out.len(), LOOP_HEADER_LINES + FINAL_HEADER_LINES);
}

#[test]
fn test_inputs_untouched() {
    let doc = SourceDocument::parse("test_print.gcode", TEST_PRINT);
    let before = doc.clone();
    let profile = PrinterProfile::ender3_v3_se();
    let plan = LoopPlan::locate(&EndSequenceLocator::new(), &doc, None, count(4), &profile);
    let _ = LoopAssembler::new().with_banner(true).assemble(&plan);
    assert_eq!(doc, before);
    assert_eq!(profile, PrinterProfile::ender3_v3_se());
}

#[test]
fn test_render_terminates_every_line() {
    let doc = SourceDocument::parse("test_print.gcode", TEST_PRINT);
    let profile = PrinterProfile::centauri_carbon();
    let plan = LoopPlan::locate(&EndSequenceLocator::new(), &doc, None, count(2), &profile);
    let out = LoopAssembler::new().assemble(&plan);
    let text = out.render();

    assert_eq!(text.matches('\n').count(), out.len());
    assert!(text.ends_with("M84 ; disable motors\n"));
}
