use test_utils::{check_program, Expected};

const SRC: &str = "int x = 5; x += 3; println x;";

#[test]
fn interpret_compound_assignment() {
    check_program(
        SRC,
        Expected {
            stdout: "8\n",
            exit: 0,
        },
    );
}
