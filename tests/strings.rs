use test_utils::{check_program, Expected};

#[test]
fn interpret_string_concatenation() {
    check_program(
        "string s = \"ab\" + \"cd\"; println s;",
        Expected {
            stdout: "abcd\n",
            exit: 0,
        },
    );
}

#[test]
fn interpret_string_interpolation() {
    check_program(
        "int n = 6; println \"n=${n * 7}\";",
        Expected {
            stdout: "n=42\n",
            exit: 0,
        },
    );
}

#[test]
fn interpret_format_string() {
    check_program(
        "int n = 2; println $\"twice {n} is {n * 2}\";",
        Expected {
            stdout: "twice 2 is 4\n",
            exit: 0,
        },
    );
}
