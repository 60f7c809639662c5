use redblack_tree::{DuplicatePolicy, Error, RedBlackTree};

fn initialize_logging() {
    use simplelog::*;
    // A second logger would fail to install; the demo only needs the first one.
    let _ = TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

fn main() -> Result<(), Error> {
    initialize_logging();

    let mut tree: RedBlackTree<u32, &str> = RedBlackTree::new();

    let items = [
        (2, "two"),
        (0, "zero"),
        (3, "three"),
        (4, "four"),
        (5, "five"),
        (1, "one"),
        (6, "six"),
    ];

    for (key, value) in items {
        tree.try_insert(key, value)?;
        tree.assert_invariants();
        println!("{:?}", tree.keys().collect::<Vec<_>>());
    }

    let mut it = tree.find(&3);
    it.increment(&tree)?;
    println!("after 3: {:?}", it.get(&tree)?);

    let (zero, _) = tree.remove_at(tree.begin())?;
    assert_eq!(zero, 0);
    tree.assert_invariants();

    let mut graph = String::new();
    if tree.dotgraph("demo", &mut graph).is_ok() {
        println!("{graph}");
    }

    let mut bag: RedBlackTree<&str, usize> = RedBlackTree::with_policy(DuplicatePolicy::Allow);
    for (i, word) in "the quick fox jumps over the lazy dog the end".split(' ').enumerate() {
        bag.insert(word, i);
    }
    bag.assert_invariants();
    println!("{bag:?}");

    tree.clear();
    println!("cleared: {}", tree.is_empty());

    Ok(())
}
