#![no_main]

use libfuzzer_sys::fuzz_target;
use redblack_tree::model::{run_cursor_equivalence, WalkInput};

fuzz_target!(|input: WalkInput| {
    run_cursor_equivalence(input.values, input.ops);
});
