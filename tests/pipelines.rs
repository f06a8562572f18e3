#![cfg(unix)]

use test_utils::{check_program, Expected};

#[test]
fn captured_command_output() {
    check_program(
        "string s = `echo hello`; print s;",
        Expected {
            stdout: "hello\n",
            exit: 0,
        },
    );
}

#[test]
fn pipeline_feeds_stages_in_order() {
    check_program(
        "string s = `printf b\\na\\nc\\n | sort | head -n 2`; print s;",
        Expected {
            stdout: "a\nb\n",
            exit: 0,
        },
    );
}

#[test]
fn command_not_found_is_a_diagnostic() {
    let (_, exit, diagnostic) =
        test_utils::run_program("string s = `definitely-not-a-real-command-zzz`;");
    assert_eq!(exit, 1);
    assert!(diagnostic.unwrap().to_string().contains("spawn"));
}

#[test]
fn interpolated_argument_reaches_the_command() {
    check_program(
        "string word = \"shell\"; string s = `echo \"value: $word\"`; print s;",
        Expected {
            stdout: "value: shell\n",
            exit: 0,
        },
    );
}
