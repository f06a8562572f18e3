use test_utils::{check_program, Expected};

const SRC: &str = "println 1 + 2 * 3;";

#[test]
fn interpret_precedence() {
    check_program(
        SRC,
        Expected {
            stdout: "7\n",
            exit: 0,
        },
    );
}
