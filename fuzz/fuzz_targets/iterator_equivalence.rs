#![no_main]

use libfuzzer_sys::fuzz_target;
use redblack_tree::model::{run_iterator_equivalence, WalkInput};

fuzz_target!(|input: WalkInput| {
    run_iterator_equivalence(input.values, input.ops);
});
