use test_utils::{check_program, Expected};

const SRC: &str = "assert(1 == 2, \"nope\");";

#[test]
fn failed_assert_prints_message_and_exits_one() {
    check_program(
        SRC,
        Expected {
            stdout: "nope\n",
            exit: 1,
        },
    );
}

#[test]
fn passing_assert_is_silent() {
    check_program(
        "assert(2 == 2, \"nope\"); println \"ok\";",
        Expected {
            stdout: "ok\n",
            exit: 0,
        },
    );
}
