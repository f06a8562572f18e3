use test_utils::{check_program, Expected};

const SRC: &str = "for (int i = 0; i < 3; i++) { println i; }";

#[test]
fn interpret_for_loop() {
    check_program(
        SRC,
        Expected {
            stdout: "0\n1\n2\n",
            exit: 0,
        },
    );
}

#[test]
fn for_init_scope_does_not_leak() {
    // `i` lives in the loop's scope only; using it afterwards is a type
    // error and nothing is printed.
    let (stdout, exit, _) =
        test_utils::run_program("for (int i = 0; i < 3; i++) { int x = i; } println i;");
    assert_eq!(stdout, "");
    assert_eq!(exit, 1);
}
