use test_utils::{check_program, Expected};

const SRC: &str = "(x:int) -> int { return x*x; } f; println f(4);";

#[test]
fn interpret_named_lambda() {
    check_program(
        SRC,
        Expected {
            stdout: "16\n",
            exit: 0,
        },
    );
}

#[test]
fn interpret_higher_order_function() {
    let source = "int[] xs = [1, 2, 3]; \
                  (x: int) -> int { return x * x; } square; \
                  println map(xs, square);";
    check_program(
        source,
        Expected {
            stdout: "[1, 4, 9]\n",
            exit: 0,
        },
    );
}

#[test]
fn interpret_closure() {
    let source = "int offset = 100; \
                  (x: int) -> int { return x + offset; } shift; \
                  println shift(1);";
    check_program(
        source,
        Expected {
            stdout: "101\n",
            exit: 0,
        },
    );
}
