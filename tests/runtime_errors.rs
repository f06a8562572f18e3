use test_utils::run_program;

#[test]
fn division_by_zero_is_a_diagnostic() {
    let (stdout, exit, diagnostic) = run_program("println 5 / 0;");
    assert_eq!(stdout, "");
    assert_eq!(exit, 1);
    assert!(diagnostic
        .unwrap()
        .to_string()
        .contains("Division by zero"));
}

#[test]
fn index_out_of_range_is_a_diagnostic() {
    let (_, exit, diagnostic) = run_program("int[] xs = [1]; println xs[3];");
    assert_eq!(exit, 1);
    assert!(diagnostic.unwrap().to_string().contains("out of range"));
}

#[test]
fn bad_parse_int_is_a_diagnostic() {
    let (_, exit, diagnostic) = run_program("println parseInt(\"abc\");");
    assert_eq!(exit, 1);
    assert!(diagnostic.unwrap().to_string().contains("Cannot parse"));
}

#[test]
fn type_errors_exit_one_before_running() {
    let (stdout, exit, diagnostic) = run_program("println 1; int x = \"a\";");
    // The type error preempts execution entirely.
    assert_eq!(stdout, "");
    assert_eq!(exit, 1);
    assert!(diagnostic.unwrap().to_string().contains("Type error"));
}
